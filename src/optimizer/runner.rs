use super::{anneal, differential, shgo, Strategy};
use crate::bounds::ParameterBound;
use crate::config::{Config, DegeneratePolicy, StrategyKind};
use crate::error::{XfResult, XrayFitError};
use crate::objective::Objective;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct OptimizationOptions {
    pub strategy: Strategy,
    pub popsize: usize,
    pub mutation: (f64, f64),
    pub recombination: f64,
    pub initial_temp: f64,
    pub restart_temp_ratio: f64,
    pub visit: f64,
    pub accept: f64,
    pub local_iter: usize,
    pub on_degenerate: DegeneratePolicy,
}

impl From<&Config> for OptimizationOptions {
    fn from(cfg: &Config) -> Self {
        let s = &cfg.search;
        let strategy = match s.strategy {
            StrategyKind::DifferentialEvolution => Strategy::DifferentialEvolution {
                variant: s.de_variant,
                max_iter: s.de_max_iter,
                tolerance: s.tolerance,
            },
            StrategyKind::Shgo => Strategy::Shgo {
                samples: s.shgo_samples,
                iterations: s.shgo_iterations,
            },
            StrategyKind::DualAnnealing => Strategy::DualAnnealing {
                max_iter: s.anneal_max_iter,
            },
        };
        Self {
            strategy,
            popsize: s.popsize,
            mutation: (s.mutation_min, s.mutation_max),
            recombination: s.recombination,
            initial_temp: s.initial_temp,
            restart_temp_ratio: s.restart_temp_ratio,
            visit: s.visit,
            accept: s.accept,
            local_iter: s.local_iter,
            on_degenerate: s.on_degenerate,
        }
    }
}

impl Default for OptimizationOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

#[derive(Debug, Clone)]
pub struct OptimizationResult {
    pub x: Vec<f64>,
    pub chi2: f64,
    pub evaluations: usize,
    pub iterations: usize,
    pub strategy: StrategyKind,
}

/// Receives the best point after every generation, sampling round or annealing iteration.
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, iteration: usize, best: f64, x: &[f64]);
}

/// Callback that ignores progress.
pub struct Silent;

impl ProgressCallback for Silent {
    fn on_progress(&self, _iteration: usize, _best: f64, _x: &[f64]) {}
}

/// Best point found by one strategy run.
pub(crate) struct Outcome {
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
}

/// Objective wrapper shared by the strategies: applies the degenerate-candidate policy, ranks
/// non-finite scores last and counts evaluations.
pub(crate) struct Evaluator<'a> {
    objective: &'a Objective,
    policy: DegeneratePolicy,
    evaluations: AtomicUsize,
}

impl<'a> Evaluator<'a> {
    pub fn new(objective: &'a Objective, policy: DegeneratePolicy) -> Self {
        Self {
            objective,
            policy,
            evaluations: AtomicUsize::new(0),
        }
    }

    pub fn eval(&self, x: &[f64]) -> XfResult<f64> {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        match self.objective.evaluate(x) {
            Ok(v) if v.is_nan() => Ok(f64::INFINITY),
            Ok(v) => Ok(v),
            Err(XrayFitError::DegenerateSimulation { scan, index })
                if self.policy == DegeneratePolicy::Reject =>
            {
                debug!("Rejecting candidate: zero simulation in scan {} at {}", scan, index);
                Ok(f64::INFINITY)
            }
            Err(e) => Err(e),
        }
    }

    /// Scores a batch in parallel, each evaluation on its own sample clone.
    pub fn eval_batch(&self, xs: &[Vec<f64>]) -> XfResult<Vec<f64>> {
        xs.par_iter().map(|x| self.eval(x)).collect()
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }
}

/// Maps a unit-cube point onto the parameter box.
pub(crate) fn scale(unit: &[f64], bounds: &[ParameterBound]) -> Vec<f64> {
    unit.iter()
        .zip(bounds)
        .map(|(u, b)| b.lower + u * b.width())
        .collect()
}

pub struct Optimizer {
    objective: Arc<Objective>,
    bounds: Vec<ParameterBound>,
    options: OptimizationOptions,
}

impl Optimizer {
    pub fn new(
        objective: Arc<Objective>,
        bounds: Vec<ParameterBound>,
        options: OptimizationOptions,
    ) -> XfResult<Self> {
        if bounds.len() != objective.dimension() {
            return Err(XrayFitError::MismatchedLengths(format!(
                "{} parameter bounds for {} parameters",
                bounds.len(),
                objective.dimension()
            )));
        }
        if bounds.is_empty() {
            return Err(XrayFitError::Validation(
                "no parameters selected for optimization".into(),
            ));
        }
        for b in &bounds {
            b.check()?;
        }
        Ok(Self {
            objective,
            bounds,
            options,
        })
    }

    pub fn options(&self) -> &OptimizationOptions {
        &self.options
    }

    pub fn run<CB: ProgressCallback>(
        &self,
        seed: Option<u64>,
        callback: CB,
    ) -> XfResult<OptimizationResult> {
        let opts = &self.options;
        let evaluator = Evaluator::new(&self.objective, opts.on_degenerate);
        let start = Instant::now();

        info!(
            "Starting {} over {} parameters",
            opts.strategy.kind(),
            self.bounds.len()
        );

        let outcome = match opts.strategy {
            Strategy::DifferentialEvolution {
                variant,
                max_iter,
                tolerance,
            } => differential::run(
                &evaluator,
                &self.bounds,
                differential::DeSettings {
                    variant,
                    max_iter,
                    tolerance,
                    popsize: opts.popsize,
                    mutation: opts.mutation,
                    recombination: opts.recombination,
                },
                seed,
                &callback,
            )?,
            Strategy::Shgo {
                samples,
                iterations,
            } => shgo::run(
                &evaluator,
                &self.bounds,
                samples,
                iterations,
                opts.local_iter,
                &callback,
            )?,
            Strategy::DualAnnealing { max_iter } => anneal::run(
                &evaluator,
                &self.bounds,
                anneal::AnnealSettings {
                    max_iter,
                    initial_temp: opts.initial_temp,
                    restart_temp_ratio: opts.restart_temp_ratio,
                    visit: opts.visit,
                    accept: opts.accept,
                    local_iter: opts.local_iter,
                },
                seed,
                &callback,
            )?,
        };

        info!(
            "{} finished: chi2 {:.6} after {} iterations, {} evaluations ({:.1}s)",
            opts.strategy.kind(),
            outcome.value,
            outcome.iterations,
            evaluator.evaluations(),
            start.elapsed().as_secs_f32()
        );

        Ok(OptimizationResult {
            x: outcome.x,
            chi2: outcome.value,
            evaluations: evaluator.evaluations(),
            iterations: outcome.iterations,
            strategy: opts.strategy.kind(),
        })
    }
}
