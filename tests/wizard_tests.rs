mod common;

use common::*;
use std::io::{self, BufRead, Cursor, Read};
use std::thread;
use std::time::{Duration, Instant};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use xrayfit::bounds::{ParameterBound, Region, RegionSet};
use xrayfit::params::{Characteristic, FormFactorMode, ParameterDescriptor};
use xrayfit::wizard::{
    collect_plan, select_parameters, select_scans, CancelToken, NullRenderer, PreviewRenderer,
    PreviewRequest, Prompter,
};

type Scripted = Prompter<Cursor<String>, Vec<u8>>;

fn scripted(lines: &[&str]) -> Scripted {
    let mut input = lines.join("\n");
    input.push('\n');
    Prompter::new(Cursor::new(input), Vec::new())
}

fn output(p: Scripted) -> String {
    String::from_utf8(p.into_output()).unwrap()
}

fn bound(lower: f64, upper: f64) -> ParameterBound {
    ParameterBound::new(lower, upper).unwrap()
}

/// Keeps track of how many previews are on screen.
#[derive(Default)]
struct Counting {
    started: AtomicUsize,
    live: AtomicUsize,
    layers_started: AtomicUsize,
    layers_live: AtomicUsize,
}

impl PreviewRenderer for Counting {
    fn render(&self, request: &PreviewRequest, token: &CancelToken) {
        let with_layers = request.sample.is_some();
        self.started.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        if with_layers {
            self.layers_started.fetch_add(1, Ordering::SeqCst);
            self.layers_live.fetch_add(1, Ordering::SeqCst);
        }
        token.wait();
        if with_layers {
            self.layers_live.fetch_sub(1, Ordering::SeqCst);
        }
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

// --- scans ---

#[test]
fn scans_with_custom_windows_and_defaults() {
    let data = dataset(TRUE_THICKNESS);
    let mut p = scripted(&[
        "1",
        "1",
        "1",
        "1",
        "(0.02,0.1) (0.12, 0.3)",
        "1",
        "1 2",
        "select scan",
        "3",
        "use scan",
        "use default boundaries",
        "finish",
    ]);
    let selection = select_scans(&mut p, &data, Arc::new(NullRenderer)).unwrap();

    assert_eq!(selection.scans, vec![1, 3]);
    let first = selection.scan_bounds.get(1).unwrap();
    assert_eq!(first.regions(), &[Region::new(0.02, 0.1), Region::new(0.12, 0.3)]);
    assert_eq!(first.weights(), &[1.0, 2.0]);

    let grid = energy_grid();
    assert_eq!(
        selection.scan_bounds.get(3).unwrap(),
        &RegionSet::full_range(grid[0], grid[grid.len() - 1])
    );
    assert!(output(p).contains("Scan 3 added with 1 fitting window(s)."));
}

#[test]
fn invalid_answers_are_reported_and_asked_again() {
    let data = dataset(TRUE_THICKNESS);
    let mut p = scripted(&[
        "1",
        "9",
        "abc",
        "1",
        "1",
        "1",
        "(0.3,0.2)",
        "(-0.1,0.2)",
        "(0.0,0.2)",
        "finish",
    ]);
    let selection = select_scans(&mut p, &data, Arc::new(NullRenderer)).unwrap();

    assert_eq!(selection.scans, vec![1]);
    let set = selection.scan_bounds.get(1).unwrap();
    assert_eq!(set.regions(), &[Region::new(0.0, 0.2)]);
    assert_eq!(set.weights(), &[1.0]);

    let out = output(p);
    assert!(out.contains("Scan 9 does not exist"));
    assert!(out.contains("Invalid selection 'abc'"));
    assert!(out.contains("ascending"));
    assert!(out.contains("outside"));
}

#[test]
fn a_scan_cannot_be_picked_twice() {
    let data = dataset(TRUE_THICKNESS);
    let mut p = scripted(&["1", "2", "1", "2", "1", "2", "3", "1", "2", "2"]);
    let selection = select_scans(&mut p, &data, Arc::new(NullRenderer)).unwrap();
    assert_eq!(selection.scans, vec![2, 3]);
    assert!(output(p).contains("Scan 2 has already been selected"));
}

#[test]
fn finishing_from_the_scan_options_discards_the_pick() {
    let data = dataset(TRUE_THICKNESS);
    let mut p = scripted(&["1", "2", "finish"]);
    let selection = select_scans(&mut p, &data, Arc::new(NullRenderer)).unwrap();
    assert!(selection.is_empty());
}

#[test]
fn finishing_from_the_boundary_options_keeps_the_whole_scan() {
    let data = dataset(TRUE_THICKNESS);
    let mut p = scripted(&["1", "2", "1", "finish"]);
    let selection = select_scans(&mut p, &data, Arc::new(NullRenderer)).unwrap();

    let grid = qz_grid();
    assert_eq!(selection.scans, vec![2]);
    assert_eq!(
        selection.scan_bounds.get(2).unwrap(),
        &RegionSet::full_range(grid[0], grid[grid.len() - 1])
    );
}

#[test]
fn return_walks_back_one_state() {
    let data = dataset(TRUE_THICKNESS);
    let mut p = scripted(&[
        "1", "1", "return", // scan options back to the scan menu
        "1", "1", "1", "return", // boundary options back to the scan prompt
        "2", "1", "2", "2",
    ]);
    let selection = select_scans(&mut p, &data, Arc::new(NullRenderer)).unwrap();
    assert_eq!(selection.scans, vec![2]);
}

#[test]
fn exit_abandons_everything() {
    let data = dataset(TRUE_THICKNESS);
    let mut p = scripted(&["1", "1", "1", "2", "1", "2", "1", "exit"]);
    let selection = select_scans(&mut p, &data, Arc::new(NullRenderer)).unwrap();
    assert!(selection.is_empty());
    assert!(selection.scan_bounds.is_empty());
}

#[test]
fn show_reprints_the_scan_table() {
    let data = dataset(TRUE_THICKNESS);
    let mut p = scripted(&["show", "finish"]);
    select_scans(&mut p, &data, Arc::new(NullRenderer)).unwrap();
    let out = output(p);
    assert_eq!(out.matches("36_E600_Th0.0_P").count(), 2);
}

#[test]
fn previews_are_closed_when_leaving_a_scan() {
    let data = dataset(TRUE_THICKNESS);
    let counting = Arc::new(Counting::default());
    let mut p = scripted(&[
        "1", "1", "choose different scan", "2", "1", "2", "1", "3", "return", "finish",
    ]);
    let renderer: Arc<dyn PreviewRenderer> = counting.clone();
    let selection = select_scans(&mut p, &data, renderer).unwrap();

    assert_eq!(selection.scans, vec![2]);
    assert_eq!(counting.live.load(Ordering::SeqCst), 0);
    assert!(counting.started.load(Ordering::SeqCst) <= 3);
}

// --- parameters ---

#[test]
fn globals_compound_and_magnetic_parameters() {
    let s = sample(TRUE_THICKNESS);
    let mut p = scripted(&[
        "scaling factor",
        "2.0",
        "2.6",
        "scattering factor shift",
        "Fe",
        "magnetic",
        "-0.5",
        "0.5",
        "continue to layers",
        "1",
        "structural",
        "compound",
        "thickness",
        "15",
        "25",
        "y",
        "density",
        "3",
        "6",
        "n",
        "y",
        "2",
        "magnetic",
        "Mn",
        "0",
        "0.2",
        "n",
        "n",
    ]);
    let selection = select_parameters(&mut p, &s).unwrap().unwrap();

    assert_eq!(
        selection.descriptors,
        vec![
            ParameterDescriptor::ScalingFactor,
            ParameterDescriptor::ScatteringFactorShift {
                element: "Fe".into(),
                mode: FormFactorMode::Magnetic,
            },
            ParameterDescriptor::StructuralCompound {
                layer: 1,
                characteristic: Characteristic::Thickness,
            },
            ParameterDescriptor::StructuralCompound {
                layer: 1,
                characteristic: Characteristic::Density,
            },
            ParameterDescriptor::Magnetic {
                layer: 2,
                element: "Mn".into(),
                polymorph: None,
            },
        ]
    );
    assert_eq!(
        selection.bounds,
        vec![
            bound(2.0, 2.6),
            bound(-0.5, 0.5),
            bound(15.0, 25.0),
            bound(3.0, 6.0),
            bound(0.0, 0.2),
        ]
    );
}

#[test]
fn polymorph_ratios_are_bounded_to_the_unit_interval() {
    let s = sample(TRUE_THICKNESS);
    let mut p = scripted(&[
        "continue to layers",
        "1",
        "polymorphous",
        "Fe",
        "Fe3+",
        "1.5",
        "0.8",
        "0.2",
        "0.2",
        "0.8",
        "n",
        "n",
    ]);
    let selection = select_parameters(&mut p, &s).unwrap().unwrap();

    assert_eq!(
        selection.descriptors,
        vec![ParameterDescriptor::Polymorphous {
            layer: 1,
            element: "Fe".into(),
            polymorph: "Fe3+".into(),
        }]
    );
    assert_eq!(selection.bounds, vec![bound(0.2, 0.8)]);
    let out = output(p);
    assert!(out.contains("outside [0, 1]"));
    assert!(out.contains("must not exceed"));
}

#[test]
fn magnetic_polymorphs_are_offered_separately() {
    let s = sample(TRUE_THICKNESS);
    let mut p = scripted(&[
        "continue to layers",
        "1",
        "magnetic",
        "Fe",
        "Fe2+",
        "0",
        "0.3",
        "y",
        "Fe3+",
        "0.1",
        "0.4",
        "n",
        "n",
        "n",
    ]);
    let selection = select_parameters(&mut p, &s).unwrap().unwrap();
    let polymorphs: Vec<Option<String>> = selection
        .descriptors
        .iter()
        .map(|d| match d {
            ParameterDescriptor::Magnetic { polymorph, .. } => polymorph.clone(),
            other => panic!("unexpected {:?}", other),
        })
        .collect();
    assert_eq!(polymorphs, vec![Some("Fe2+".into()), Some("Fe3+".into())]);
}

#[test]
fn return_at_the_property_menu_asks_for_the_layer_again() {
    let s = sample(TRUE_THICKNESS);
    let mut p = scripted(&[
        "continue to layers",
        "1",
        "return",
        "0",
        "structural",
        "element",
        "Si",
        "roughness",
        "0",
        "5",
        "n",
        "n",
        "n",
    ]);
    let selection = select_parameters(&mut p, &s).unwrap().unwrap();
    assert_eq!(
        selection.descriptors,
        vec![ParameterDescriptor::StructuralElement {
            layer: 0,
            element: "Si".into(),
            characteristic: Characteristic::Roughness,
        }]
    );
}

#[test]
fn selected_globals_leave_the_menu() {
    let s = sample(TRUE_THICKNESS);
    let mut p = scripted(&[
        "background shift",
        "-0.1",
        "0.1",
        "background shift",
        "exit",
    ]);
    assert!(select_parameters(&mut p, &s).unwrap().is_none());
    assert!(output(p).contains("Invalid selection 'background shift'"));
}

#[test]
fn exit_or_end_of_input_abandons_parameters() {
    let s = sample(TRUE_THICKNESS);
    let mut p = scripted(&["continue to layers", "1", "exit"]);
    assert!(select_parameters(&mut p, &s).unwrap().is_none());

    let mut p = Prompter::new(Cursor::new(String::new()), Vec::new());
    assert!(select_parameters(&mut p, &s).unwrap().is_none());
}

// --- both wizards ---

const SCAN_SCRIPT: [&str; 5] = ["1", "1", "1", "use default boundaries", "finish"];

fn plan_script(tail: &[&str]) -> Prompter<Cursor<String>, io::Sink> {
    let mut lines = SCAN_SCRIPT.to_vec();
    lines.extend_from_slice(tail);
    let mut input = lines.join("\n");
    input.push('\n');
    Prompter::new(Cursor::new(input), io::sink())
}

#[test]
fn collect_plan_returns_the_combined_plan() {
    let prompter = plan_script(&[
        "scaling factor",
        "2",
        "3",
        "continue to layers",
        "1",
        "structural",
        "element",
        "Fe",
        "thickness",
        "10",
        "30",
        "n",
        "n",
        "n",
    ]);
    let plan = collect_plan(
        prompter,
        Arc::new(dataset(TRUE_THICKNESS)),
        Arc::new(sample(25.0)),
        Arc::new(NullRenderer),
    )
    .unwrap()
    .unwrap();

    assert_eq!(plan.scans, vec![1]);
    assert!(plan.scan_bounds.contains(1));
    assert_eq!(plan.parameters.len(), 2);
    assert_eq!(plan.bounds, vec![bound(2.0, 3.0), bound(10.0, 30.0)]);
}

#[test]
fn collect_plan_is_empty_when_abandoned() {
    let counting = Arc::new(Counting::default());
    let renderer: Arc<dyn PreviewRenderer> = counting.clone();
    let plan = collect_plan(
        plan_script(&["exit"]),
        Arc::new(dataset(TRUE_THICKNESS)),
        Arc::new(sample(25.0)),
        renderer,
    )
    .unwrap();
    assert!(plan.is_none());
    assert_eq!(counting.live.load(Ordering::SeqCst), 0);
}

/// Scripted input that, on the first read past the scan answers, waits for the
/// layer preview and records how many were on screen.
struct ParameterStageInput {
    inner: Cursor<String>,
    scan_bytes: u64,
    waited: bool,
    counting: Arc<Counting>,
    seen_live: Arc<AtomicUsize>,
}

impl Read for ParameterStageInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl BufRead for ParameterStageInput {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if !self.waited && self.inner.position() >= self.scan_bytes {
            self.waited = true;
            let deadline = Instant::now() + Duration::from_secs(5);
            while self.counting.layers_live.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(2));
            }
            self.seen_live
                .store(self.counting.layers_live.load(Ordering::SeqCst), Ordering::SeqCst);
        }
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt)
    }
}

#[test]
fn layer_preview_is_up_while_parameters_are_picked() {
    let counting = Arc::new(Counting::default());
    let seen_live = Arc::new(AtomicUsize::new(0));

    let mut lines = SCAN_SCRIPT.to_vec();
    lines.extend_from_slice(&["scaling factor", "2", "3", "continue to layers", "exit"]);
    let mut script = lines.join("\n");
    script.push('\n');
    let input = ParameterStageInput {
        inner: Cursor::new(script),
        scan_bytes: SCAN_SCRIPT.iter().map(|l| l.len() as u64 + 1).sum(),
        waited: false,
        counting: counting.clone(),
        seen_live: seen_live.clone(),
    };

    let renderer: Arc<dyn PreviewRenderer> = counting.clone();
    let plan = collect_plan(
        Prompter::new(input, io::sink()),
        Arc::new(dataset(TRUE_THICKNESS)),
        Arc::new(sample(25.0)),
        renderer,
    )
    .unwrap();

    assert!(plan.is_none());
    assert_eq!(seen_live.load(Ordering::SeqCst), 1);
    assert_eq!(counting.layers_started.load(Ordering::SeqCst), 1);
    assert_eq!(counting.layers_live.load(Ordering::SeqCst), 0);
    assert_eq!(counting.live.load(Ordering::SeqCst), 0);
}
