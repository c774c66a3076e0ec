#![allow(dead_code)]

use std::collections::BTreeMap;
use std::f64::consts::LN_10;
use std::sync::atomic::{AtomicUsize, Ordering};
use xrayfit::error::XfResult;
use xrayfit::sample::{ElementSlab, Layer, Sample};
use xrayfit::scan::{Dataset, Polarization, ScanData, ScanRecord, ScanType};
use xrayfit::simulate::{SimulatedCurve, Simulator};

pub const TRUE_THICKNESS: f64 = 20.0;

pub fn slab(symbol: &str, thickness: f64) -> ElementSlab {
    ElementSlab {
        symbol: symbol.to_string(),
        stoichiometry: 1.0,
        molar_mass: 28.0,
        thickness,
        density: 0.08,
        roughness: 2.0,
        linked_roughness: None,
        polymorphs: Vec::new(),
        poly_ratio: Vec::new(),
        mag_density: Vec::new(),
    }
}

/// Substrate plus a Fe-O film. Fe has two polymorphs, both magnetic. The scaling factor of
/// `ln 10` makes the simulated `log10` curve equal to the measured `ln` curve.
pub fn sample(film_thickness: f64) -> Sample {
    let mut fe = slab("Fe", film_thickness);
    fe.molar_mass = 55.845;
    fe.polymorphs = vec!["Fe2+".into(), "Fe3+".into()];
    fe.poly_ratio = vec![0.5, 0.5];
    fe.mag_density = vec![0.1, 0.2];

    let mut o = slab("O", film_thickness);
    o.molar_mass = 15.999;
    o.stoichiometry = 2.0;

    let mut mn = slab("Mn", film_thickness);
    mn.molar_mass = 54.938;
    mn.mag_density = vec![0.05];

    Sample {
        layers: vec![
            Layer {
                elements: vec![slab("Si", 0.0)],
            },
            Layer {
                elements: vec![fe, o],
            },
            Layer {
                elements: vec![mn],
            },
        ],
        scaling_factor: LN_10,
        background_shift: 0.0,
        form_factor_shifts: BTreeMap::new(),
        magnetic_form_factor_shifts: BTreeMap::new(),
    }
}

fn film_thickness(sample: &Sample) -> f64 {
    sample
        .layers
        .get(1)
        .and_then(|l| l.elements.first())
        .map_or(TRUE_THICKNESS, |e| e.thickness)
}

/// Exponential decay whose rate follows the film thickness: `R = exp(-axis * t / 10)`.
#[derive(Default)]
pub struct DecaySimulator {
    pub calls: AtomicUsize,
}

impl DecaySimulator {
    fn curve(&self, sample: &Sample, axis: &[f64], scale: f64) -> SimulatedCurve {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let t = film_thickness(sample);
        let values: Vec<f64> = axis.iter().map(|a| (-a * scale * t / 10.0).exp()).collect();
        SimulatedCurve {
            axis: axis.to_vec(),
            curves: [Polarization::S, Polarization::P, Polarization::LC, Polarization::RC]
                .into_iter()
                .map(|p| (p, values.clone()))
                .collect(),
        }
    }
}

impl Simulator for DecaySimulator {
    fn reflectivity(&self, sample: &Sample, _energy: f64, qz: &[f64]) -> XfResult<SimulatedCurve> {
        Ok(self.curve(sample, qz, 1.0))
    }

    fn energy_scan(&self, sample: &Sample, _angle: f64, energies: &[f64]) -> XfResult<SimulatedCurve> {
        Ok(self.curve(sample, energies, 1e-3))
    }
}

/// Returns the same value at every point.
pub struct ConstSimulator(pub f64);

impl Simulator for ConstSimulator {
    fn reflectivity(&self, _s: &Sample, _e: f64, qz: &[f64]) -> XfResult<SimulatedCurve> {
        Ok(SimulatedCurve {
            axis: qz.to_vec(),
            curves: BTreeMap::from([(Polarization::S, vec![self.0; qz.len()])]),
        })
    }

    fn energy_scan(&self, _s: &Sample, _a: f64, energies: &[f64]) -> XfResult<SimulatedCurve> {
        Ok(SimulatedCurve {
            axis: energies.to_vec(),
            curves: BTreeMap::from([(Polarization::S, vec![self.0; energies.len()])]),
        })
    }
}

pub fn qz_grid() -> Vec<f64> {
    (1..=20).map(|i| i as f64 * 0.02).collect()
}

pub fn energy_grid() -> Vec<f64> {
    (0..16).map(|i| 630.0 + i as f64 * 2.0).collect()
}

pub fn reflectivity_record(scan_number: u32, name: &str, polarization: Polarization) -> ScanRecord {
    ScanRecord {
        scan_number,
        scan_type: ScanType::Reflectivity,
        name: name.to_string(),
        polarization,
        energy: Some(600.0),
        angle: None,
    }
}

pub fn energy_record(scan_number: u32, name: &str) -> ScanRecord {
    ScanRecord {
        scan_number,
        scan_type: ScanType::Energy,
        name: name.to_string(),
        polarization: Polarization::S,
        energy: None,
        angle: Some(10.0),
    }
}

fn reflectivity_data(thickness: f64) -> ScanData {
    let qz = qz_grid();
    ScanData {
        theta: qz.iter().map(|q| q * 10.0).collect(),
        reflectivity: qz.iter().map(|q| (-q * thickness / 10.0).exp()).collect(),
        energy: vec![600.0; qz.len()],
        qz,
    }
}

fn energy_data(thickness: f64) -> ScanData {
    let energy = energy_grid();
    ScanData {
        qz: vec![0.1; energy.len()],
        theta: vec![10.0; energy.len()],
        reflectivity: energy
            .iter()
            .map(|e| (-e * 1e-3 * thickness / 10.0).exp())
            .collect(),
        energy,
    }
}

/// Two reflectivity scans and one energy scan measured on a film of `thickness`; the stored
/// simulations match the measurements.
pub fn dataset(thickness: f64) -> Dataset {
    let records = vec![
        reflectivity_record(1, "35_E600_Th0.0_S", Polarization::S),
        reflectivity_record(2, "36_E600_Th0.0_P", Polarization::P),
        energy_record(3, "40_E630_Th10.0_S"),
    ];
    let mut measured = BTreeMap::new();
    measured.insert(records[0].name.clone(), reflectivity_data(thickness));
    measured.insert(records[1].name.clone(), reflectivity_data(thickness));
    measured.insert(records[2].name.clone(), energy_data(thickness));

    Dataset {
        simulated: measured.clone(),
        records,
        measured,
    }
}
