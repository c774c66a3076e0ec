mod common;

use common::*;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;
use xrayfit::bounds::{ParameterBound, RegionSet, ScanBounds};
use xrayfit::params::ParameterDescriptor;
use xrayfit::plan::FitPlan;
use xrayfit::sample::Sample;
use xrayfit::store::DirectoryStore;

struct TestContext {
    dir: TempDir,
    plan_path: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        DirectoryStore::new(dir.path())
            .save(&sample(TRUE_THICKNESS), &dataset(TRUE_THICKNESS))
            .unwrap();

        let mut windows = ScanBounds::new();
        windows.insert(1, RegionSet::full_range(0.02, 0.4));
        windows.insert(2, RegionSet::full_range(0.02, 0.4));
        let plan = FitPlan {
            scans: vec![1, 2],
            scan_bounds: windows,
            parameters: vec![ParameterDescriptor::BackgroundShift],
            bounds: vec![ParameterBound::new(-0.5, 0.5).unwrap()],
        };
        let plan_path = dir.path().join("plan.json");
        plan.save_to_file(&plan_path).unwrap();

        Self { dir, plan_path }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_xrayfit"))
            .args(args)
            .arg("--store")
            .arg(self.root())
            .output()
            .expect("Failed to execute binary")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn scans_lists_the_index() {
    let ctx = TestContext::new();
    let output = ctx.run(&["scans", "--details"]);
    assert!(output.status.success());

    let out = stdout(&output);
    for name in ["35_E600_Th0.0_S", "36_E600_Th0.0_P", "40_E630_Th10.0_S"] {
        assert!(out.contains(name), "missing {} in\n{}", name, out);
    }
    assert!(Regex::new(r"Energy").unwrap().is_match(&out));
}

#[test]
fn layers_shows_the_formulas() {
    let ctx = TestContext::new();
    let output = ctx.run(&["layers"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("Fe"));
    assert!(out.contains("Mn"));
}

#[test]
fn score_at_the_midpoint_is_a_perfect_fit() {
    let ctx = TestContext::new();
    let plan = ctx.plan_path.to_str().unwrap();

    let output = ctx.run(&["score", "--plan", plan]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let out = stdout(&output);
    assert!(out.contains("x = [0.0]"), "{}", out);

    let output = ctx.run(&["score", "--plan", plan, "-x", "-0.25"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("x = [-0.25]"));
}

#[test]
fn fit_from_a_plan_writes_the_sample() {
    let ctx = TestContext::new();
    let fitted = ctx.root().join("fitted.json");
    let output = ctx.run(&[
        "fit",
        "--plan",
        ctx.plan_path.to_str().unwrap(),
        "--strategy",
        "shgo",
        "--shgo-samples",
        "8",
        "--shgo-iterations",
        "1",
        "--save",
        fitted.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let out = stdout(&output);
    let finished = Regex::new(r"finished: chi2 = (\d+\.\d+)").unwrap();
    let chi2: f64 = finished
        .captures(&out)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or_else(|| panic!("no result line in\n{}", out));
    assert!(chi2 < 1e-2, "chi2 = {}", chi2);

    let sample: Sample = serde_json::from_str(&std::fs::read_to_string(&fitted).unwrap()).unwrap();
    assert!(sample.background_shift.abs() < 0.05);
}

#[test]
fn search_settings_file_is_merged_with_flags() {
    let ctx = TestContext::new();
    let config = ctx.root().join("search.json");
    std::fs::write(&config, r#"{ "search": { "strategy": "dual_annealing", "anneal_max_iter": 5 } }"#)
        .unwrap();

    let output = ctx.run(&[
        "fit",
        "--plan",
        ctx.plan_path.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
        "--seed",
        "3",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("dual_annealing"));
}

#[test]
fn missing_store_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_xrayfit"))
        .args(["scans", "--store"])
        .arg(dir.path().join("nowhere"))
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("FATAL ERROR"));
}
