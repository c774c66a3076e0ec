use clap::Args;
use std::io::{self, BufReader};
use std::sync::Arc;
use xrayfit::error::XfResult;
use xrayfit::plan::FitPlan;
use xrayfit::store::{DirectoryStore, SampleStore, StoreHandle};
use xrayfit::wizard::{self, NullRenderer, PreviewRenderer, Prompter, TableRenderer};

#[derive(Args, Debug, Clone)]
pub struct SelectArgs {
    /// Where the selected plan is written.
    #[arg(short, long, default_value = "plan.json")]
    pub out: String,

    #[arg(long, default_value_t = false)]
    pub no_preview: bool,
}

/// Runs both selection wizards on the terminal. `None` when the user typed `EXIT`.
pub fn interactive_plan(store: &DirectoryStore, no_preview: bool) -> XfResult<Option<FitPlan>> {
    let (sample, dataset) = {
        let handle = store.open()?;
        (handle.load_sample()?, handle.load_datasets()?)
    };

    println!("\n🧭 Type SHOW to list the table again, RETURN to go back, EXIT to quit.");
    let renderer: Arc<dyn PreviewRenderer> = if no_preview {
        Arc::new(NullRenderer)
    } else {
        Arc::new(TableRenderer)
    };
    let prompter = Prompter::new(BufReader::new(io::stdin()), io::stdout());
    wizard::collect_plan(prompter, Arc::new(dataset), Arc::new(sample), renderer)
}

pub fn run(args: SelectArgs, store: &DirectoryStore) -> XfResult<()> {
    match interactive_plan(store, args.no_preview)? {
        Some(plan) => {
            plan.save_to_file(&args.out)?;
            println!(
                "💾 Plan with {} scans and {} parameters written to {}",
                plan.scans.len(),
                plan.parameters.len(),
                args.out
            );
        }
        None => println!("⚠️  Selection abandoned. Nothing written."),
    }
    Ok(())
}
