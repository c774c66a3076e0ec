use super::runner::{OptimizationOptions, OptimizationResult, Optimizer, ProgressCallback};
use crate::error::{XfResult, XrayFitError};
use crate::objective::{Objective, ScoreDetails};
use crate::plan::FitPlan;
use crate::sample::Sample;
use crate::scan::{Dataset, ScanType};
use crate::simulate::Simulator;
use crate::store::{SampleStore, StoreHandle};
use std::sync::Arc;
use tracing::{info, warn};

/// Result of a fit session: the best point plus scan-by-scan scores before and after.
#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub result: OptimizationResult,
    /// Scores of the sample as stored; `None` when it cannot be simulated.
    pub before: Option<ScoreDetails>,
    pub after: ScoreDetails,
    pub sample: Sample,
}

/// Validates `plan`, loads the session data from `store` and runs the configured strategy.
///
/// The store handle is held for the whole search and released on every return path.
pub fn optimize<S, F, CB>(
    store: &S,
    make_simulator: F,
    plan: &FitPlan,
    options: OptimizationOptions,
    seed: Option<u64>,
    callback: CB,
) -> XfResult<FitOutcome>
where
    S: SampleStore,
    F: FnOnce(&Dataset) -> XfResult<Arc<dyn Simulator>>,
    CB: ProgressCallback,
{
    // 1. Reject ill-posed requests before touching the store
    if plan.scans.is_empty() {
        return Err(XrayFitError::EmptyScanSet);
    }
    if plan.parameters.is_empty() {
        return Err(XrayFitError::Validation(
            "no parameters selected for optimization".into(),
        ));
    }
    if plan.bounds.len() != plan.parameters.len() {
        return Err(XrayFitError::MismatchedLengths(format!(
            "{} parameter bounds for {} parameters",
            plan.bounds.len(),
            plan.parameters.len()
        )));
    }
    for b in &plan.bounds {
        b.check()?;
    }

    // 2. Session data
    let handle = store.open()?;
    let sample = handle.load_sample()?;
    let dataset = Arc::new(handle.load_datasets()?);
    let records = dataset.resolve(&plan.scans)?;

    // 3. Fitting windows, for the strategies that use them
    let scan_bounds = if options.strategy.uses_scan_bounds() {
        for r in &records {
            if r.scan_type == ScanType::Reflectivity && !plan.scan_bounds.contains(r.scan_number) {
                return Err(XrayFitError::Validation(format!(
                    "scan {} has no fitting windows",
                    r.scan_number
                )));
            }
        }
        Some(plan.scan_bounds.clone())
    } else {
        if !plan.scan_bounds.is_empty() {
            warn!(
                "{} scores whole curves; the fitting windows of {} scans are ignored",
                options.strategy.kind(),
                plan.scan_bounds.len()
            );
        }
        None
    };

    let simulator = make_simulator(&dataset)?;
    let objective = Arc::new(Objective::new(
        sample,
        records,
        dataset.clone(),
        plan.parameters.clone(),
        scan_bounds,
        simulator,
    )?);

    // 4. Structural errors in the descriptors surface here, not mid-search
    objective.mutated_sample(&plan.midpoint())?;

    let before = match objective.baseline_details() {
        Ok(d) => Some(d),
        Err(e) => {
            warn!("Stored sample could not be scored: {}", e);
            None
        }
    };

    // 5. Search
    let optimizer = Optimizer::new(objective.clone(), plan.bounds.clone(), options)?;
    let result = optimizer.run(seed, callback)?;
    let after = objective.details(&result.x)?;
    let fitted = objective.mutated_sample(&result.x)?;

    info!("Chi: {}", result.chi2);
    info!("Fitting parameters: {:?}", result.x);

    drop(handle);
    Ok(FitOutcome {
        result,
        before,
        after,
        sample: fitted,
    })
}
