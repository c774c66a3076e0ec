use super::types::ScanContribution;
use crate::bounds::{Region, RegionSet};
use crate::error::{XfResult, XrayFitError};
use crate::sample::Sample;
use crate::scan::{ScanData, ScanRecord, ScanType};
use crate::simulate::Simulator;

/// Residual of one scan against the simulation of `sample`.
///
/// Reflectivity: measured `ln R`, simulated `log10 R * scaling_factor + background_shift`, summed over
/// each window and weighted. Without windows the whole curve counts once.
/// Energy: `ln R` on both sides over the whole curve; windows are not applied.
pub fn scan_residual(
    record: &ScanRecord,
    measured: &ScanData,
    sample: &Sample,
    regions: Option<&RegionSet>,
    simulator: &dyn Simulator,
) -> XfResult<ScanContribution> {
    measured.check_shape(&record.name, record.scan_type)?;

    let (chi2, points_used) = match record.scan_type {
        ScanType::Reflectivity => {
            let curve = simulator.reflectivity(sample, record.energy()?, &measured.qz)?;
            let raw = curve.channel(record.polarization)?;
            check_length(record, raw.len(), measured.len())?;

            let r_meas: Vec<f64> = measured.reflectivity.iter().map(|r| r.ln()).collect();
            let r_sim: Vec<f64> = raw
                .iter()
                .map(|r| r.log10() * sample.scaling_factor + sample.background_shift)
                .collect();

            match regions {
                Some(set) => {
                    let mut total = 0.0;
                    let mut used = 0;
                    for (region, weight) in set.iter() {
                        let (sum, n) = window_sum(record, &curve.axis, &r_meas, &r_sim, Some(region))?;
                        if n > 0 {
                            total += weight * sum;
                        }
                        used += n;
                    }
                    (total, used)
                }
                None => window_sum(record, &curve.axis, &r_meas, &r_sim, None)?,
            }
        }
        ScanType::Energy => {
            let curve = simulator.energy_scan(sample, record.angle()?, &measured.energy)?;
            let raw = curve.channel(record.polarization)?;
            check_length(record, raw.len(), measured.len())?;

            let r_meas: Vec<f64> = measured.reflectivity.iter().map(|r| r.ln()).collect();
            let r_sim: Vec<f64> = raw.iter().map(|r| r.ln()).collect();
            window_sum(record, &curve.axis, &r_meas, &r_sim, None)?
        }
    };

    Ok(ScanContribution {
        scan_number: record.scan_number,
        name: record.name.clone(),
        scan_type: record.scan_type,
        chi2,
        points_used,
    })
}

/// `sum (m - s)^2 / |s|` over the points whose axis value lies in `region` (inclusive).
fn window_sum(
    record: &ScanRecord,
    axis: &[f64],
    r_meas: &[f64],
    r_sim: &[f64],
    region: Option<&Region>,
) -> XfResult<(f64, usize)> {
    let mut sum = 0.0;
    let mut n = 0;
    for (i, &a) in axis.iter().enumerate() {
        if let Some(r) = region {
            if !r.contains(a) {
                continue;
            }
        }
        let s = r_sim[i];
        if s == 0.0 {
            return Err(XrayFitError::DegenerateSimulation {
                scan: record.scan_number,
                index: i,
            });
        }
        let d = r_meas[i] - s;
        sum += d * d / s.abs();
        n += 1;
    }
    Ok((sum, n))
}

fn check_length(record: &ScanRecord, simulated: usize, measured: usize) -> XfResult<()> {
    if simulated != measured {
        return Err(XrayFitError::Simulation(format!(
            "scan {} simulated on {} points, measured on {}",
            record.scan_number, simulated, measured
        )));
    }
    Ok(())
}
