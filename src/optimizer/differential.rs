use super::crossover;
use super::runner::{scale, Evaluator, Outcome, ProgressCallback};
use super::sampling::latin_hypercube;
use crate::bounds::ParameterBound;
use crate::config::DeVariant;
use crate::error::XfResult;
use fastrand::Rng;
use tracing::debug;

/// Smallest population that leaves five distinct partners besides the candidate.
const MIN_POPULATION: usize = 6;

pub(crate) struct DeSettings {
    pub variant: DeVariant,
    pub max_iter: usize,
    pub tolerance: f64,
    pub popsize: usize,
    pub mutation: (f64, f64),
    pub recombination: f64,
}

fn argmin(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Population spread small against its mean: `std <= tol * |mean|`.
fn converged(energies: &[f64], tolerance: f64) -> bool {
    let n = energies.len() as f64;
    let mean = energies.iter().sum::<f64>() / n;
    let var = energies.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    std.is_finite() && std <= tolerance * mean.abs()
}

pub(crate) fn run<CB: ProgressCallback>(
    eval: &Evaluator,
    bounds: &[ParameterBound],
    settings: DeSettings,
    seed: Option<u64>,
    callback: &CB,
) -> XfResult<Outcome> {
    let dim = bounds.len();
    let mut rng = if let Some(s) = seed {
        Rng::with_seed(s)
    } else {
        Rng::new()
    };

    // 1. Initial population (unit cube) and its energies
    let np = (settings.popsize * dim).max(MIN_POPULATION);
    let mut population = latin_hypercube(&mut rng, np, dim);
    let scaled: Vec<Vec<f64>> = population.iter().map(|u| scale(u, bounds)).collect();
    let mut energies = eval.eval_batch(&scaled)?;
    let mut best = argmin(&energies);

    debug!(
        "DE population {} ({}), initial best {:.6}",
        np, settings.variant, energies[best]
    );

    let (f_min, f_max) = settings.mutation;
    let mut generation = 0;

    while generation < settings.max_iter {
        if converged(&energies, settings.tolerance) {
            debug!("DE converged after {} generations", generation);
            break;
        }
        generation += 1;

        // Dither: one mutation factor per generation
        let f = if f_max > f_min {
            f_min + rng.f64() * (f_max - f_min)
        } else {
            f_min
        };

        // 2. Trials for the whole population, then score them together
        let trials: Vec<Vec<f64>> = (0..np)
            .map(|i| {
                let partners = crossover::pick_partners(&mut rng, np, i, settings.variant.partners());
                let donor = crossover::mutant(settings.variant, &population, best, i, &partners, f);
                let mut trial = crossover::crossover(
                    settings.variant,
                    &mut rng,
                    &population[i],
                    &donor,
                    settings.recombination,
                );
                crossover::ensure_unit(&mut rng, &mut trial);
                trial
            })
            .collect();
        let scaled: Vec<Vec<f64>> = trials.iter().map(|u| scale(u, bounds)).collect();
        let trial_energies = eval.eval_batch(&scaled)?;

        // 3. Greedy selection
        for (i, (trial, e)) in trials.into_iter().zip(trial_energies).enumerate() {
            if e < energies[i] {
                population[i] = trial;
                energies[i] = e;
            }
        }
        best = argmin(&energies);

        callback.on_progress(generation, energies[best], &scale(&population[best], bounds));
    }

    Ok(Outcome {
        x: scale(&population[best], bounds),
        value: energies[best],
        iterations: generation,
    })
}
