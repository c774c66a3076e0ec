use super::select::interactive_plan;
use crate::reports;
use clap::Args;
use std::fs;
use std::sync::Arc;
use xrayfit::config::Config;
use xrayfit::error::XfResult;
use xrayfit::optimizer::{optimize, OptimizationOptions, ProgressCallback};
use xrayfit::plan::FitPlan;
use xrayfit::simulate::{ReplaySimulator, Simulator};
use xrayfit::store::{DirectoryStore, SampleStore, StoreHandle};

#[derive(Args, Debug, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub config: Config,

    /// Plan written by `select`; the wizards run when omitted.
    #[arg(short, long)]
    pub plan: Option<String>,

    /// Write the fitted sample as JSON.
    #[arg(long)]
    pub save: Option<String>,

    #[arg(long, default_value_t = false)]
    pub no_preview: bool,
}

struct ConsoleProgress {
    every: usize,
}

impl ProgressCallback for ConsoleProgress {
    fn on_progress(&self, iteration: usize, best: f64, _x: &[f64]) {
        if iteration % self.every == 0 {
            println!("   iter {:>5}   best chi2 {:.6}", iteration, best);
        }
    }
}

pub fn run(args: FitArgs, config: Config, store: &DirectoryStore, debug: bool) -> XfResult<()> {
    // 1. Base sample and scan index
    let (base, records) = {
        let handle = store.open()?;
        (handle.load_sample()?, handle.load_datasets()?.records)
    };

    // 2. Plan
    let plan = match &args.plan {
        Some(path) => {
            println!("📂 Loading plan: {}", path);
            FitPlan::load_from_file(path, &records)?
        }
        None => match interactive_plan(store, args.no_preview)? {
            Some(plan) => plan,
            None => {
                println!("⚠️  Selection abandoned. Nothing to fit.");
                return Ok(());
            }
        },
    };

    // 3. Search
    let options = OptimizationOptions::from(&config);
    println!(
        "\n🚀 Fitting {} parameters against {} scans ({})",
        plan.parameters.len(),
        plan.scans.len(),
        options.strategy.kind()
    );
    let progress = ConsoleProgress {
        every: if debug { 1 } else { 10 },
    };
    let outcome = optimize(
        store,
        |dataset| Ok(Arc::new(ReplaySimulator::from_dataset(dataset)?) as Arc<dyn Simulator>),
        &plan,
        options,
        config.search.seed,
        progress,
    )?;

    // 4. Report
    reports::print_fit_result(&plan, &base, &outcome);
    if let Some(path) = &args.save {
        fs::write(path, serde_json::to_string_pretty(&outcome.sample)?)?;
        println!("💾 Fitted sample written to {}", path);
    }
    Ok(())
}
