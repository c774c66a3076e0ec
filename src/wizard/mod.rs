//! Interactive selection of scans, fitting windows and fit parameters.

pub mod input;
pub mod parameters;
pub mod preview;
pub mod prompt;
pub mod scans;
pub mod tables;

pub use self::parameters::select_parameters;
pub use self::preview::{
    CancelToken, NullRenderer, PreviewRenderer, PreviewRequest, PreviewTask, TableRenderer,
};
pub use self::prompt::{Prompter, Reply};
pub use self::scans::select_scans;

use crate::error::{XfResult, XrayFitError};
use crate::plan::FitPlan;
use crate::sample::Sample;
use crate::scan::Dataset;
use std::io::{BufRead, Write};
use std::sync::{mpsc, Arc};
use std::thread;
use tracing::info;

/// Runs both wizards on a worker thread while the dataset overview stays on display.
/// A preview of the chosen scans and the sample layers is shown during parameter selection.
///
/// The worker hands back exactly one result; `None` when the user abandoned either wizard.
pub fn collect_plan<R, W>(
    prompter: Prompter<R, W>,
    dataset: Arc<Dataset>,
    sample: Arc<Sample>,
    renderer: Arc<dyn PreviewRenderer>,
) -> XfResult<Option<FitPlan>>
where
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel::<XfResult<Option<FitPlan>>>(1);
    let overview = PreviewTask::start(renderer.clone(), PreviewRequest::overview(&dataset))?;

    let worker = thread::Builder::new()
        .name("wizard".into())
        .spawn(move || {
            let mut prompter = prompter;
            let result = run_wizards(&mut prompter, &dataset, &sample, renderer);
            // Receiver only disappears if the caller is already gone.
            let _ = tx.send(result);
        })?;

    let received = rx.recv();
    overview.cancel();
    if worker.join().is_err() {
        return Err(XrayFitError::Validation("selection wizard panicked".into()));
    }
    received.map_err(|_| XrayFitError::Validation("selection wizard ended without a result".into()))?
}

fn run_wizards<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    dataset: &Dataset,
    sample: &Sample,
    renderer: Arc<dyn PreviewRenderer>,
) -> XfResult<Option<FitPlan>> {
    let scans = select_scans(prompter, dataset, renderer.clone())?;
    if scans.is_empty() {
        info!("Scan selection abandoned");
        return Ok(None);
    }

    // Chosen curves and the layer table stay up while parameters are picked
    let selected = PreviewTask::start(
        renderer,
        PreviewRequest::for_selection(dataset, &scans, sample),
    )?;
    let parameters = select_parameters(prompter, sample);
    selected.cancel();
    let Some(parameters) = parameters? else {
        info!("Parameter selection abandoned");
        return Ok(None);
    };
    info!(
        "Selected {} scans and {} parameters",
        scans.scans.len(),
        parameters.len()
    );
    Ok(Some(FitPlan::new(scans, parameters)))
}
