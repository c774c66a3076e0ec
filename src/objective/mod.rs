pub mod engine;
pub mod types;

pub use self::types::{ScanContribution, ScoreDetails};

use crate::bounds::ScanBounds;
use crate::error::XfResult;
use crate::params::{self, ParameterDescriptor};
use crate::sample::Sample;
use crate::scan::{Dataset, ScanRecord};
use crate::simulate::Simulator;
use std::sync::Arc;

/// Mutates `sample` with `x` and returns the chi-squared of `scans` against it.
pub fn score(
    x: &[f64],
    sample: &mut Sample,
    scans: &[ScanRecord],
    dataset: &Dataset,
    descriptors: &[ParameterDescriptor],
    scan_bounds: Option<&ScanBounds>,
    simulator: &dyn Simulator,
) -> XfResult<f64> {
    Ok(score_details(x, sample, scans, dataset, descriptors, scan_bounds, simulator)?.total)
}

pub fn score_details(
    x: &[f64],
    sample: &mut Sample,
    scans: &[ScanRecord],
    dataset: &Dataset,
    descriptors: &[ParameterDescriptor],
    scan_bounds: Option<&ScanBounds>,
    simulator: &dyn Simulator,
) -> XfResult<ScoreDetails> {
    params::apply(x, descriptors, sample)?;

    let mut details = ScoreDetails::default();
    for record in scans {
        let measured = dataset.measured(&record.name)?;
        let regions = scan_bounds.and_then(|b| b.get(record.scan_number));
        details.push(engine::scan_residual(
            record, measured, sample, regions, simulator,
        )?);
    }
    Ok(details)
}

/// The objective of one fit session. Holds the unmodified sample and clones it for every
/// evaluation, so `evaluate` can run from any number of threads at once.
#[derive(Clone)]
pub struct Objective {
    sample: Sample,
    scans: Vec<ScanRecord>,
    dataset: Arc<Dataset>,
    descriptors: Vec<ParameterDescriptor>,
    scan_bounds: Option<ScanBounds>,
    simulator: Arc<dyn Simulator>,
}

impl Objective {
    pub fn new(
        sample: Sample,
        scans: Vec<ScanRecord>,
        dataset: Arc<Dataset>,
        descriptors: Vec<ParameterDescriptor>,
        scan_bounds: Option<ScanBounds>,
        simulator: Arc<dyn Simulator>,
    ) -> XfResult<Self> {
        for record in &scans {
            dataset
                .measured(&record.name)?
                .check_shape(&record.name, record.scan_type)?;
        }
        Ok(Self {
            sample,
            scans,
            dataset,
            descriptors,
            scan_bounds,
            simulator,
        })
    }

    pub fn dimension(&self) -> usize {
        self.descriptors.len()
    }

    pub fn sample(&self) -> &Sample {
        &self.sample
    }

    pub fn scans(&self) -> &[ScanRecord] {
        &self.scans
    }

    pub fn descriptors(&self) -> &[ParameterDescriptor] {
        &self.descriptors
    }

    pub fn uses_scan_bounds(&self) -> bool {
        self.scan_bounds.is_some()
    }

    pub fn evaluate(&self, x: &[f64]) -> XfResult<f64> {
        Ok(self.details(x)?.total)
    }

    pub fn details(&self, x: &[f64]) -> XfResult<ScoreDetails> {
        let mut sample = self.sample.clone();
        score_details(
            x,
            &mut sample,
            &self.scans,
            &self.dataset,
            &self.descriptors,
            self.scan_bounds.as_ref(),
            self.simulator.as_ref(),
        )
    }

    /// Score of the sample as loaded, before any parameter is applied.
    pub fn baseline_details(&self) -> XfResult<ScoreDetails> {
        let mut sample = self.sample.clone();
        score_details(
            &[],
            &mut sample,
            &self.scans,
            &self.dataset,
            &[],
            self.scan_bounds.as_ref(),
            self.simulator.as_ref(),
        )
    }

    /// The sample after applying `x`, leaving the base state untouched.
    pub fn mutated_sample(&self, x: &[f64]) -> XfResult<Sample> {
        let mut sample = self.sample.clone();
        params::apply(x, &self.descriptors, &mut sample)?;
        Ok(sample)
    }
}
