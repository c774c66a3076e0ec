use crate::error::XfResult;
use clap::parser::ValueSource;
use clap::{ArgMatches, Args, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use strum_macros::{Display, EnumIter, EnumString};

#[derive(Args, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[command(flatten)]
    #[serde(default)]
    pub search: SearchParams,
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> XfResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum StrategyKind {
    #[value(name = "differential_evolution", alias = "de")]
    #[strum(to_string = "differential_evolution", serialize = "de")]
    DifferentialEvolution,
    #[value(name = "shgo")]
    #[strum(serialize = "shgo")]
    Shgo,
    #[value(name = "dual_annealing", alias = "da")]
    #[strum(to_string = "dual_annealing", serialize = "da")]
    DualAnnealing,
}

/// Mutation/crossover scheme of differential evolution.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeVariant {
    #[value(name = "best1bin")]
    Best1Bin,
    #[value(name = "best1exp")]
    Best1Exp,
    #[value(name = "rand1bin")]
    Rand1Bin,
    #[value(name = "rand1exp")]
    Rand1Exp,
    #[value(name = "rand2bin")]
    Rand2Bin,
    #[value(name = "rand2exp")]
    Rand2Exp,
    #[value(name = "best2bin")]
    Best2Bin,
    #[value(name = "best2exp")]
    Best2Exp,
    #[value(name = "currenttobest1bin")]
    CurrentToBest1Bin,
    #[value(name = "currenttobest1exp")]
    CurrentToBest1Exp,
}

/// What a strategy does when a candidate hits a zero simulated value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Display)]
#[serde(rename_all = "snake_case")]
pub enum DegeneratePolicy {
    /// Stop the run and report the error.
    #[value(name = "abort")]
    Abort,
    /// Score the candidate as +inf and keep searching.
    #[value(name = "reject")]
    Reject,
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    #[arg(long, value_enum, default_value_t = StrategyKind::DifferentialEvolution)]
    pub strategy: StrategyKind,

    // === Differential evolution ===
    #[arg(long, value_enum, default_value_t = DeVariant::CurrentToBest1Exp)]
    pub de_variant: DeVariant,
    #[arg(long, default_value_t = 25)]
    pub de_max_iter: usize,
    #[arg(long, default_value_t = 0.1)]
    pub tolerance: f64,
    /// Population size is `popsize * number of parameters`.
    #[arg(long, default_value_t = 15)]
    pub popsize: usize,
    #[arg(long, default_value_t = 0.5)]
    pub mutation_min: f64,
    #[arg(long, default_value_t = 1.0)]
    pub mutation_max: f64,
    #[arg(long, default_value_t = 0.7)]
    pub recombination: f64,

    // === SHGO ===
    #[arg(long, default_value_t = 64)]
    pub shgo_samples: usize,
    #[arg(long, default_value_t = 3)]
    pub shgo_iterations: usize,

    // === Dual annealing ===
    #[arg(long, default_value_t = 300)]
    pub anneal_max_iter: usize,
    #[arg(long, default_value_t = 5230.0)]
    pub initial_temp: f64,
    #[arg(long, default_value_t = 2e-5)]
    pub restart_temp_ratio: f64,
    #[arg(long, default_value_t = 2.62)]
    pub visit: f64,
    #[arg(long, default_value_t = -5.0, allow_hyphen_values = true)]
    pub accept: f64,

    // === Shared ===
    /// Simplex iterations allowed to one local refinement.
    #[arg(long, default_value_t = 200)]
    pub local_iter: usize,
    #[arg(long, value_enum, default_value_t = DegeneratePolicy::Abort)]
    pub on_degenerate: DegeneratePolicy,
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::DifferentialEvolution,
            de_variant: DeVariant::CurrentToBest1Exp,
            de_max_iter: 25,
            tolerance: 0.1,
            popsize: 15,
            mutation_min: 0.5,
            mutation_max: 1.0,
            recombination: 0.7,
            shgo_samples: 64,
            shgo_iterations: 3,
            anneal_max_iter: 300,
            initial_temp: 5230.0,
            restart_temp_ratio: 2e-5,
            visit: 2.62,
            accept: -5.0,
            local_iter: 200,
            on_degenerate: DegeneratePolicy::Abort,
            seed: None,
        }
    }
}

impl SearchParams {
    /// Copies every value the user typed on the command line over the values loaded from file.
    pub fn merge_from_cli(&mut self, cli: &SearchParams, matches: &ArgMatches) {
        macro_rules! update_if_present {
            ($field:ident) => {
                if matches.value_source(stringify!($field)) == Some(ValueSource::CommandLine) {
                    self.$field = cli.$field.clone();
                }
            };
        }

        update_if_present!(strategy);
        update_if_present!(de_variant);
        update_if_present!(de_max_iter);
        update_if_present!(tolerance);
        update_if_present!(popsize);
        update_if_present!(mutation_min);
        update_if_present!(mutation_max);
        update_if_present!(recombination);
        update_if_present!(shgo_samples);
        update_if_present!(shgo_iterations);
        update_if_present!(anneal_max_iter);
        update_if_present!(initial_temp);
        update_if_present!(restart_temp_ratio);
        update_if_present!(visit);
        update_if_present!(accept);
        update_if_present!(local_iter);
        update_if_present!(on_degenerate);
        update_if_present!(seed);
    }
}
