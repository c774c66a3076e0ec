use super::input::{parse_regions, parse_scan_number, parse_weights};
use super::preview::{PreviewRenderer, PreviewRequest, PreviewTask};
use super::prompt::{Prompter, Reply};
use super::tables::scan_table;
use crate::bounds::{check_domain, Region, RegionSet};
use crate::error::{XfResult, XrayFitError};
use crate::plan::ScanSelection;
use crate::scan::{Dataset, ScanRecord};
use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
enum State {
    ScanMenu,
    ScanPick,
    BoundaryPick { scan: u32 },
    WeightPick { scan: u32, regions: Vec<Region> },
}

enum Step {
    Go(State),
    Finish,
    Abandon,
}

const SCAN_MENU: [&str; 2] = ["Select Scan", "Finish"];
const PICK_MENU: [&str; 4] = ["Use Scan", "Choose Different Scan", "Return", "Finish"];
const BOUNDARY_MENU: [&str; 4] = [
    "Select Scan Boundaries",
    "Use Default Boundaries",
    "Return",
    "Finish",
];
const WEIGHT_MENU: [&str; 4] = ["Select Boundary Weights", "Use Default Weights", "Return", "Finish"];

struct ScanWizard<'a, R, W> {
    prompter: &'a mut Prompter<R, W>,
    dataset: &'a Dataset,
    renderer: Arc<dyn PreviewRenderer>,
    selection: ScanSelection,
    preview: Option<PreviewTask>,
}

/// Interactive scan selection. `EXIT` at any prompt abandons the wizard with an empty selection.
pub fn select_scans<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    dataset: &Dataset,
    renderer: Arc<dyn PreviewRenderer>,
) -> XfResult<ScanSelection> {
    prompter.set_show(scan_table(dataset).to_string());
    prompter.say("SCAN SELECTION")?;
    prompter.say(&scan_table(dataset).to_string())?;

    let mut wizard = ScanWizard {
        prompter,
        dataset,
        renderer,
        selection: ScanSelection::default(),
        preview: None,
    };

    let mut state = State::ScanMenu;
    let finished = loop {
        debug!("Scan wizard state: {:?}", state);
        let step = match state {
            State::ScanMenu => wizard.scan_menu()?,
            State::ScanPick => wizard.scan_pick()?,
            State::BoundaryPick { scan } => wizard.boundary_pick(scan)?,
            State::WeightPick { scan, regions } => wizard.weight_pick(scan, regions)?,
        };
        match step {
            Step::Go(next) => state = next,
            Step::Finish => break true,
            Step::Abandon => break false,
        }
    };

    wizard.close_preview();
    if finished {
        Ok(wizard.selection)
    } else {
        Ok(ScanSelection::default())
    }
}

impl<'a, R: BufRead, W: Write> ScanWizard<'a, R, W> {
    fn open_preview(&mut self, record: &ScanRecord) -> XfResult<()> {
        self.close_preview();
        let request = PreviewRequest::for_scan(self.dataset, record);
        self.preview = Some(PreviewTask::start(self.renderer.clone(), request)?);
        Ok(())
    }

    fn close_preview(&mut self) {
        if let Some(task) = self.preview.take() {
            task.cancel();
        }
    }

    fn record(&self, scan: u32) -> XfResult<&'a ScanRecord> {
        self.dataset.record(scan)
    }

    /// Whole measured axis of a scan with weight 1.
    fn default_regions(&self, scan: u32) -> XfResult<RegionSet> {
        let record = self.record(scan)?;
        let data = self.dataset.measured(&record.name)?;
        let (first, last) = data
            .axis_range(record.scan_type)
            .ok_or_else(|| XrayFitError::MissingScanData(record.name.clone()))?;
        Ok(RegionSet::full_range(first, last))
    }

    fn commit(&mut self, scan: u32, regions: RegionSet) -> XfResult<()> {
        self.close_preview();
        self.prompter.say(&format!(
            "Scan {} added with {} fitting window(s).",
            scan,
            regions.len()
        ))?;
        self.selection.commit(scan, regions);
        Ok(())
    }

    fn scan_menu(&mut self) -> XfResult<Step> {
        Ok(match self.prompter.menu("\nScan menu:", &SCAN_MENU)? {
            Reply::Value(0) => Step::Go(State::ScanPick),
            Reply::Value(_) => Step::Finish,
            Reply::Return => Step::Go(State::ScanMenu),
            Reply::Exit => Step::Abandon,
        })
    }

    fn scan_pick(&mut self) -> XfResult<Step> {
        let known = self.dataset.scan_numbers();
        let taken = self.selection.scans.clone();
        let scan = match self.prompter.ask("Choose scan number: ", |s| {
            parse_scan_number(s, &known, &taken)
        })? {
            Reply::Value(n) => n,
            Reply::Return => return Ok(Step::Go(State::ScanMenu)),
            Reply::Exit => return Ok(Step::Abandon),
        };

        let record = self.record(scan)?;
        // A scan without measured data cannot be fitted.
        if let Err(e) = self.dataset.measured(&record.name) {
            self.prompter.say(&format!("  {}", e))?;
            return Ok(Step::Go(State::ScanPick));
        }
        self.open_preview(record)?;

        let step = match self.prompter.menu("\nScan options:", &PICK_MENU)? {
            Reply::Value(0) => return Ok(Step::Go(State::BoundaryPick { scan })),
            Reply::Value(1) => Step::Go(State::ScanPick),
            Reply::Value(2) | Reply::Return => Step::Go(State::ScanMenu),
            Reply::Value(_) => Step::Finish,
            Reply::Exit => Step::Abandon,
        };
        self.close_preview();
        Ok(step)
    }

    fn boundary_pick(&mut self, scan: u32) -> XfResult<Step> {
        let record = self.record(scan)?;
        loop {
            match self.prompter.menu("\nBoundary options:", &BOUNDARY_MENU)? {
                Reply::Value(0) => {
                    let default = self.default_regions(scan)?;
                    let hint = default
                        .regions()
                        .first()
                        .map(|r| format!(" [data spans ({},{})]", r.lower, r.upper))
                        .unwrap_or_default();
                    let prompt = format!("Enter boundaries as (lower,upper) pairs{}: ", hint);
                    let reply = self.prompter.ask(&prompt, |s| {
                        let regions = parse_regions(s)?;
                        for r in &regions {
                            check_domain(record, r.lower, r.upper)?;
                        }
                        Ok(regions)
                    })?;
                    match reply {
                        Reply::Value(regions) => {
                            return Ok(Step::Go(State::WeightPick { scan, regions }))
                        }
                        Reply::Return => continue,
                        Reply::Exit => return Ok(Step::Abandon),
                    }
                }
                Reply::Value(1) => {
                    let regions = self.default_regions(scan)?;
                    self.commit(scan, regions)?;
                    return Ok(Step::Go(State::ScanMenu));
                }
                Reply::Value(2) | Reply::Return => {
                    self.close_preview();
                    return Ok(Step::Go(State::ScanPick));
                }
                Reply::Value(_) => {
                    let regions = self.default_regions(scan)?;
                    self.commit(scan, regions)?;
                    return Ok(Step::Finish);
                }
                Reply::Exit => return Ok(Step::Abandon),
            }
        }
    }

    fn weight_pick(&mut self, scan: u32, regions: Vec<Region>) -> XfResult<Step> {
        loop {
            match self.prompter.menu("\nWeight options:", &WEIGHT_MENU)? {
                Reply::Value(0) => {
                    let n = regions.len();
                    let prompt = format!("Enter {} weight(s): ", n);
                    match self.prompter.ask(&prompt, |s| parse_weights(s, n))? {
                        Reply::Value(weights) => {
                            let set = RegionSet::new(regions, weights)?;
                            self.commit(scan, set)?;
                            return Ok(Step::Go(State::ScanMenu));
                        }
                        Reply::Return => continue,
                        Reply::Exit => return Ok(Step::Abandon),
                    }
                }
                Reply::Value(1) => {
                    self.commit(scan, RegionSet::with_unit_weights(regions)?)?;
                    return Ok(Step::Go(State::ScanMenu));
                }
                Reply::Value(2) | Reply::Return => {
                    return Ok(Step::Go(State::BoundaryPick { scan }));
                }
                Reply::Value(_) => {
                    self.commit(scan, RegionSet::with_unit_weights(regions)?)?;
                    return Ok(Step::Finish);
                }
                Reply::Exit => return Ok(Step::Abandon),
            }
        }
    }
}
