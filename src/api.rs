use crate::objective::{Objective, ScoreDetails};
use crate::plan::FitPlan;
use crate::sample::Sample;
use crate::scan::Dataset;
use crate::simulate::ReplaySimulator;
use crate::store::{DirectoryStore, SampleStore, StoreHandle};
use serde::Serialize;
use std::sync::{Arc, Mutex};

/// Session data shared by front ends that keep a store loaded between requests.
#[derive(Default)]
pub struct SessionState {
    pub sample: Mutex<Option<Sample>>,
    pub dataset: Mutex<Option<Arc<Dataset>>>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PlanEvaluation {
    pub x: Vec<f64>,
    pub score: ScoreDetails,
}

/// Service: load a sample store into the session.
pub fn load_session(state: &SessionState, root: &str) -> Result<String, String> {
    let store = DirectoryStore::new(root);
    let handle = store.open().map_err(|e| e.to_string())?;
    let sample = handle.load_sample().map_err(|e| e.to_string())?;
    let dataset = handle.load_datasets().map_err(|e| e.to_string())?;

    let summary = format!(
        "Loaded {} layers and {} scans from {}",
        sample.layers.len(),
        dataset.records.len(),
        root
    );

    let mut s_guard = state.sample.lock().map_err(|e| e.to_string())?;
    *s_guard = Some(sample);

    let mut d_guard = state.dataset.lock().map_err(|e| e.to_string())?;
    *d_guard = Some(Arc::new(dataset));

    Ok(summary)
}

/// Service: score a plan at `x` (bound midpoints when absent) against the stored simulations.
///
/// Fitting windows of the plan are honoured.
pub fn evaluate_plan(
    state: &SessionState,
    plan: &FitPlan,
    x: Option<Vec<f64>>,
) -> Result<PlanEvaluation, String> {
    let sample = state
        .sample
        .lock()
        .map_err(|e| e.to_string())?
        .clone()
        .ok_or("No session loaded. Load a sample store first.")?;
    let dataset = state
        .dataset
        .lock()
        .map_err(|e| e.to_string())?
        .clone()
        .ok_or("No session loaded. Load a sample store first.")?;

    let x = x.unwrap_or_else(|| plan.midpoint());
    let records = dataset.resolve(&plan.scans).map_err(|e| e.to_string())?;
    let simulator = ReplaySimulator::from_dataset(&dataset).map_err(|e| e.to_string())?;

    let objective = Objective::new(
        sample,
        records,
        dataset,
        plan.parameters.clone(),
        Some(plan.scan_bounds.clone()),
        Arc::new(simulator),
    )
    .map_err(|e| e.to_string())?;
    let score = objective.details(&x).map_err(|e| e.to_string())?;

    Ok(PlanEvaluation { x, score })
}
