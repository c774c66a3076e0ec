use crate::reports;
use clap::Args;
use xrayfit::error::XfResult;
use xrayfit::store::{DirectoryStore, SampleStore, StoreHandle};
use xrayfit::wizard::tables;

#[derive(Args, Debug, Clone)]
pub struct ScansArgs {
    /// Also list point counts and axis ranges.
    #[arg(long, default_value_t = false)]
    pub details: bool,
}

#[derive(Args, Debug, Clone)]
pub struct LayersArgs {}

pub fn run_scans(args: ScansArgs, store: &DirectoryStore) -> XfResult<()> {
    let handle = store.open()?;
    let dataset = handle.load_datasets()?;

    println!("\n🔎 === SCANS === 🔎");
    println!("{}", tables::scan_table(&dataset));

    if args.details {
        let request = xrayfit::wizard::PreviewRequest {
            title: "Scans".into(),
            scans: dataset.records.clone(),
            measured: dataset.measured.clone(),
            simulated: dataset.simulated.clone(),
            sample: None,
        };
        println!("{}", tables::preview_table(&request));
    }
    Ok(())
}

pub fn run_layers(_args: LayersArgs, store: &DirectoryStore) -> XfResult<()> {
    let handle = store.open()?;
    let sample = handle.load_sample()?;
    reports::print_layers(&sample);
    Ok(())
}
