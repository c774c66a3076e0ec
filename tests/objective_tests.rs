mod common;

use common::*;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use xrayfit::bounds::{Region, RegionSet, ScanBounds};
use xrayfit::error::{XfResult, XrayFitError};
use xrayfit::objective::{self, Objective};
use xrayfit::params::{Characteristic, ParameterDescriptor};
use xrayfit::sample::Sample;
use xrayfit::scan::{Dataset, Polarization, ScanData, ScanType};
use xrayfit::simulate::{SimulatedCurve, Simulator};

fn thickness() -> ParameterDescriptor {
    ParameterDescriptor::StructuralElement {
        layer: 1,
        element: "Fe".into(),
        characteristic: Characteristic::Thickness,
    }
}

fn full_windows(scans: &[u32]) -> ScanBounds {
    let mut b = ScanBounds::new();
    for &s in scans {
        b.insert(s, RegionSet::full_range(0.0, 1.0));
    }
    b
}

#[test]
fn perfect_fit_scores_zero() {
    let data = dataset(TRUE_THICKNESS);
    let records = data.resolve(&[1, 2, 3]).unwrap();
    let mut s = sample(TRUE_THICKNESS);

    let chi = objective::score(
        &[TRUE_THICKNESS],
        &mut s,
        &records,
        &data,
        &[thickness()],
        None,
        &DecaySimulator::default(),
    )
    .unwrap();
    assert!(chi.abs() < 1e-20, "chi = {}", chi);
}

#[test]
fn score_grows_away_from_the_truth() {
    let data = dataset(TRUE_THICKNESS);
    let records = data.resolve(&[1, 2]).unwrap();
    let sim = DecaySimulator::default();

    let mut last = 0.0;
    for t in [21.0, 23.0, 26.0, 30.0] {
        let mut s = sample(TRUE_THICKNESS);
        let chi = objective::score(&[t], &mut s, &records, &data, &[thickness()], None, &sim).unwrap();
        assert!(chi > last, "chi({}) = {} not above {}", t, chi, last);
        last = chi;
    }
}

#[test]
fn score_mutates_the_given_sample() {
    let data = dataset(TRUE_THICKNESS);
    let records = data.resolve(&[1]).unwrap();
    let mut s = sample(TRUE_THICKNESS);
    objective::score(
        &[25.0],
        &mut s,
        &records,
        &data,
        &[thickness()],
        None,
        &DecaySimulator::default(),
    )
    .unwrap();
    assert_eq!(s.layers[1].elements[0].thickness, 25.0);
}

#[test]
fn window_endpoints_are_inclusive() {
    let data = dataset(TRUE_THICKNESS);
    let records = data.resolve(&[1]).unwrap();
    let qz = qz_grid();

    // A degenerate window sitting exactly on one grid point keeps that point.
    let mut bounds = ScanBounds::new();
    bounds.insert(
        1,
        RegionSet::with_unit_weights(vec![Region::new(qz[4], qz[4]), Region::new(qz[10], qz[12])])
            .unwrap(),
    );

    let mut s = sample(TRUE_THICKNESS);
    let details = objective::score_details(
        &[24.0],
        &mut s,
        &records,
        &data,
        &[thickness()],
        Some(&bounds),
        &DecaySimulator::default(),
    )
    .unwrap();
    assert_eq!(details.scans[0].points_used, 1 + 3);
}

#[test]
fn window_weights_scale_the_residual() {
    let data = dataset(TRUE_THICKNESS);
    let records = data.resolve(&[1]).unwrap();
    let sim = DecaySimulator::default();

    let score_with = |weight: f64| {
        let mut bounds = ScanBounds::new();
        bounds.insert(
            1,
            RegionSet::new(vec![Region::new(0.0, 1.0)], vec![weight]).unwrap(),
        );
        let mut s = sample(TRUE_THICKNESS);
        objective::score(&[25.0], &mut s, &records, &data, &[thickness()], Some(&bounds), &sim)
            .unwrap()
    };

    let one = score_with(1.0);
    let three = score_with(3.0);
    assert!(one > 0.0);
    assert!((three - 3.0 * one).abs() < 1e-9 * three);
}

#[test]
fn windows_do_not_apply_to_energy_scans() {
    let data = dataset(TRUE_THICKNESS);
    let records = data.resolve(&[3]).unwrap();
    let sim = DecaySimulator::default();

    // Window far from the energy axis would exclude every point if it were applied.
    let mut bounds = ScanBounds::new();
    bounds.insert(3, RegionSet::full_range(1.0, 2.0));

    let mut a = sample(TRUE_THICKNESS);
    let mut b = sample(TRUE_THICKNESS);
    let with = objective::score_details(&[25.0], &mut a, &records, &data, &[thickness()], Some(&bounds), &sim)
        .unwrap();
    let without =
        objective::score_details(&[25.0], &mut b, &records, &data, &[thickness()], None, &sim).unwrap();

    assert_eq!(with.scans[0].scan_type, ScanType::Energy);
    assert_eq!(with.scans[0].points_used, energy_grid().len());
    assert_eq!(with.total, without.total);
}

#[test]
fn zero_simulated_value_is_degenerate() {
    let data = dataset(TRUE_THICKNESS);
    let records = data.resolve(&[1]).unwrap();
    // log10(1) * scaling + 0 == 0
    let mut s = sample(TRUE_THICKNESS);
    let err = objective::score(&[], &mut s, &records, &data, &[], None, &ConstSimulator(1.0)).unwrap_err();
    assert!(matches!(err, XrayFitError::DegenerateSimulation { scan: 1, index: 0 }));
}

#[test]
fn missing_measurement_is_reported() {
    let mut data = dataset(TRUE_THICKNESS);
    data.measured.remove("36_E600_Th0.0_P");
    let records = data.resolve(&[2]).unwrap();
    let mut s = sample(TRUE_THICKNESS);
    let err = objective::score(&[], &mut s, &records, &data, &[], None, &DecaySimulator::default())
        .unwrap_err();
    assert!(matches!(err, XrayFitError::MissingScanData(name) if name == "36_E600_Th0.0_P"));
}

#[test]
fn objective_leaves_its_sample_untouched() {
    let data = Arc::new(dataset(TRUE_THICKNESS));
    let records = data.resolve(&[1, 2]).unwrap();
    let obj = Objective::new(
        sample(TRUE_THICKNESS),
        records,
        data,
        vec![thickness()],
        Some(full_windows(&[1, 2])),
        Arc::new(DecaySimulator::default()),
    )
    .unwrap();

    let first = obj.evaluate(&[27.0]).unwrap();
    let second = obj.evaluate(&[27.0]).unwrap();
    assert_eq!(first, second);
    assert_eq!(obj.sample().layers[1].elements[0].thickness, TRUE_THICKNESS);
    assert_eq!(obj.mutated_sample(&[27.0]).unwrap().layers[1].elements[0].thickness, 27.0);
}

#[test]
fn concurrent_evaluations_match_serial_ones() {
    let data = Arc::new(dataset(TRUE_THICKNESS));
    let records = data.resolve(&[1, 2, 3]).unwrap();
    let obj = Objective::new(
        sample(TRUE_THICKNESS),
        records,
        data,
        vec![thickness()],
        None,
        Arc::new(DecaySimulator::default()),
    )
    .unwrap();

    let points: Vec<f64> = (0..64).map(|i| 10.0 + i as f64 * 0.3).collect();
    let serial: Vec<f64> = points.iter().map(|t| obj.evaluate(&[*t]).unwrap()).collect();
    let parallel: Vec<f64> = points
        .par_iter()
        .map(|t| obj.clone().evaluate(&[*t]).unwrap())
        .collect();
    assert_eq!(serial, parallel);
}

#[test]
fn baseline_uses_the_stored_sample() {
    let data = Arc::new(dataset(TRUE_THICKNESS));
    let records = data.resolve(&[1]).unwrap();
    let obj = Objective::new(
        sample(TRUE_THICKNESS),
        records,
        data,
        vec![thickness()],
        None,
        Arc::new(DecaySimulator::default()),
    )
    .unwrap();

    assert!(obj.baseline_details().unwrap().total < 1e-20);
    assert!(obj.details(&[15.0]).unwrap().total > 0.0);
}

fn weak_reflection(qz: f64) -> f64 {
    1e-3 * (-10.0 * qz).exp()
}

/// Simulates `factor` times the measured curve.
struct Scaled(f64);

impl Simulator for Scaled {
    fn reflectivity(&self, _s: &Sample, _e: f64, qz: &[f64]) -> XfResult<SimulatedCurve> {
        let values = qz.iter().map(|&q| self.0 * weak_reflection(q)).collect();
        Ok(SimulatedCurve {
            axis: qz.to_vec(),
            curves: BTreeMap::from([(Polarization::S, values)]),
        })
    }

    fn energy_scan(&self, _s: &Sample, _a: f64, energies: &[f64]) -> XfResult<SimulatedCurve> {
        Ok(SimulatedCurve {
            axis: energies.to_vec(),
            curves: BTreeMap::from([(Polarization::S, vec![self.0; energies.len()])]),
        })
    }
}

#[test]
fn scaled_simulation_scores_by_distance_from_unity() {
    let qz = vec![0.1, 0.2, 0.3, 0.4];
    let record = reflectivity_record(1, "35_E600_Th0.0_S", Polarization::S);
    let data = Dataset {
        records: vec![record.clone()],
        measured: BTreeMap::from([(
            record.name.clone(),
            ScanData {
                theta: qz.iter().map(|q| q * 10.0).collect(),
                reflectivity: qz.iter().map(|&q| weak_reflection(q)).collect(),
                energy: vec![600.0; qz.len()],
                qz,
            },
        )]),
        simulated: BTreeMap::new(),
    };
    let mut windows = ScanBounds::new();
    windows.insert(
        1,
        RegionSet::new(vec![Region::new(0.1, 0.4)], vec![1.0]).unwrap(),
    );

    let chi = |factor: f64| {
        let mut s = sample(TRUE_THICKNESS);
        objective::score(&[], &mut s, &[record.clone()], &data, &[], Some(&windows), &Scaled(factor))
            .unwrap()
    };

    let exact = chi(1.0);
    assert!(exact.abs() < 1e-20, "chi(1) = {}", exact);

    for factors in [[1.1, 1.5, 2.0, 5.0], [0.9, 0.5, 0.2, 0.1]] {
        let mut last = exact;
        for c in factors {
            let value = chi(c);
            assert!(value > last, "chi({}) = {} not above {}", c, value, last);
            last = value;
        }
    }
}
