use crate::error::{XfResult, XrayFitError};
use crate::sample::Sample;
use crate::scan::{Dataset, Polarization, ScanType};
use std::collections::BTreeMap;

/// Simulated curves on one grid, one per polarization channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulatedCurve {
    pub axis: Vec<f64>,
    pub curves: BTreeMap<Polarization, Vec<f64>>,
}

impl SimulatedCurve {
    pub fn channel(&self, polarization: Polarization) -> XfResult<&[f64]> {
        let curve = self.curves.get(&polarization).ok_or_else(|| {
            XrayFitError::Simulation(format!("no {} channel in simulated curve", polarization))
        })?;
        if curve.len() != self.axis.len() {
            return Err(XrayFitError::Simulation(format!(
                "{} channel has {} points on a {}-point grid",
                polarization,
                curve.len(),
                self.axis.len()
            )));
        }
        Ok(curve)
    }
}

/// The physical model. Implementations must not keep per-call state: the objective calls them from
/// many threads at once, each with its own sample.
pub trait Simulator: Send + Sync {
    /// Reflectivity versus momentum transfer at a fixed photon energy (eV).
    fn reflectivity(&self, sample: &Sample, energy: f64, qz: &[f64]) -> XfResult<SimulatedCurve>;

    /// Reflectivity versus photon energy at a fixed grazing angle (degrees).
    fn energy_scan(
        &self,
        sample: &Sample,
        angle: f64,
        energies: &[f64],
    ) -> XfResult<SimulatedCurve>;
}

#[derive(Debug, Clone)]
struct ReplayEntry {
    scan_type: ScanType,
    fixed: f64,
    axis: Vec<f64>,
    polarization: Polarization,
    values: Vec<f64>,
}

/// Serves the simulated curves stored alongside the measurements.
///
/// The stored curves were produced for one sample state, so structural parameters have no effect;
/// only the scaling factor and background shift, which the objective applies itself, move the score.
#[derive(Debug, Clone, Default)]
pub struct ReplaySimulator {
    entries: Vec<ReplayEntry>,
}

const GRID_TOL: f64 = 1e-9;

impl ReplaySimulator {
    pub fn from_dataset(dataset: &Dataset) -> XfResult<Self> {
        let mut entries = Vec::with_capacity(dataset.records.len());
        for record in &dataset.records {
            let Some(sim) = dataset.simulated.get(&record.name) else {
                continue;
            };
            let fixed = match record.scan_type {
                ScanType::Reflectivity => record.energy()?,
                ScanType::Energy => record.angle()?,
            };
            sim.check_shape(&record.name, record.scan_type)?;
            entries.push(ReplayEntry {
                scan_type: record.scan_type,
                fixed,
                axis: sim.axis(record.scan_type).to_vec(),
                polarization: record.polarization,
                values: sim.reflectivity.clone(),
            });
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, scan_type: ScanType, fixed: f64, axis: &[f64]) -> XfResult<SimulatedCurve> {
        let mut curve = SimulatedCurve {
            axis: axis.to_vec(),
            curves: BTreeMap::new(),
        };
        for e in &self.entries {
            if e.scan_type == scan_type && (e.fixed - fixed).abs() <= GRID_TOL && same_grid(&e.axis, axis) {
                curve.curves.insert(e.polarization, e.values.clone());
            }
        }
        if curve.curves.is_empty() {
            return Err(XrayFitError::Simulation(format!(
                "no stored {} simulation at {} on a {}-point grid",
                scan_type,
                fixed,
                axis.len()
            )));
        }
        Ok(curve)
    }
}

fn same_grid(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() <= GRID_TOL)
}

impl Simulator for ReplaySimulator {
    fn reflectivity(&self, _sample: &Sample, energy: f64, qz: &[f64]) -> XfResult<SimulatedCurve> {
        self.lookup(ScanType::Reflectivity, energy, qz)
    }

    fn energy_scan(
        &self,
        _sample: &Sample,
        angle: f64,
        energies: &[f64],
    ) -> XfResult<SimulatedCurve> {
        self.lookup(ScanType::Energy, angle, energies)
    }
}
