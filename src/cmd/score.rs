use crate::reports;
use clap::Args;
use xrayfit::api::{self, SessionState};
use xrayfit::error::{XfResult, XrayFitError};
use xrayfit::plan::FitPlan;

#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    #[arg(short, long)]
    pub plan: String,

    /// Parameter values, comma separated. Defaults to the bound midpoints.
    #[arg(short = 'x', long, value_delimiter = ',', allow_hyphen_values = true)]
    pub values: Option<Vec<f64>>,
}

pub fn run(args: ScoreArgs, store_root: &str) -> XfResult<()> {
    let state = SessionState::default();
    let summary = api::load_session(&state, store_root).map_err(XrayFitError::Config)?;
    println!("📂 {}", summary);

    let records = state
        .dataset
        .lock()
        .map_err(|e| XrayFitError::Config(e.to_string()))?
        .as_ref()
        .map(|d| d.records.clone())
        .unwrap_or_default();
    let plan = FitPlan::load_from_file(&args.plan, &records)?;

    let evaluation = api::evaluate_plan(&state, &plan, args.values).map_err(XrayFitError::Simulation)?;
    println!("   x = {:?}", evaluation.x);
    reports::print_score_report("📊 Score", &evaluation.score);
    Ok(())
}
