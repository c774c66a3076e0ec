use super::local::nelder_mead;
use super::runner::{scale, Evaluator, Outcome, ProgressCallback};
use super::sampling::halton;
use crate::bounds::ParameterBound;
use crate::error::XfResult;
use rayon::prelude::*;
use tracing::debug;

/// Upper limit on local refinements started per sampling round.
const MAX_REFINEMENTS: usize = 16;

/// Pool indices whose value does not exceed any of their `k` nearest neighbours (unit-cube distance).
fn local_minimizers(points: &[Vec<f64>], values: &[f64], k: usize) -> Vec<usize> {
    let dist2 = |a: &[f64], b: &[f64]| -> f64 { a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum() };

    (0..points.len())
        .filter(|&i| {
            if !values[i].is_finite() {
                return false;
            }
            let mut neighbours: Vec<(f64, usize)> = (0..points.len())
                .filter(|&j| j != i)
                .map(|j| (dist2(&points[i], &points[j]), j))
                .collect();
            neighbours.sort_by(|a, b| a.0.total_cmp(&b.0));
            neighbours
                .iter()
                .take(k)
                .all(|&(_, j)| values[i] <= values[j])
        })
        .collect()
}

/// Space-filling global search: Halton samples each round, local minimizers of the sample pool
/// refined with Nelder-Mead. Fully deterministic.
pub(crate) fn run<CB: ProgressCallback>(
    eval: &Evaluator,
    bounds: &[ParameterBound],
    samples: usize,
    iterations: usize,
    local_iter: usize,
    callback: &CB,
) -> XfResult<Outcome> {
    let dim = bounds.len();
    let samples = samples.max(dim + 1);
    let neighbours = 2 * dim;

    let mut pool: Vec<Vec<f64>> = Vec::new();
    let mut values: Vec<f64> = Vec::new();
    let mut refined: Vec<bool> = Vec::new();
    let mut best_x = scale(&vec![0.5; dim], bounds);
    let mut best_value = f64::INFINITY;
    let mut next_index = 1;
    let rounds = iterations.max(1);

    for round in 1..=rounds {
        // 1. Next block of the sequence
        let unit: Vec<Vec<f64>> = (next_index..next_index + samples)
            .map(|i| halton(i, dim))
            .collect();
        next_index += samples;
        let scaled: Vec<Vec<f64>> = unit.iter().map(|u| scale(u, bounds)).collect();
        let new_values = eval.eval_batch(&scaled)?;

        for (x, v) in scaled.iter().zip(&new_values) {
            if *v < best_value {
                best_value = *v;
                best_x = x.clone();
            }
        }
        pool.extend(unit);
        values.extend(new_values);
        refined.resize(pool.len(), false);

        // 2. Refine the minimizers not yet refined, best first
        let mut starts: Vec<usize> = local_minimizers(&pool, &values, neighbours)
            .into_iter()
            .filter(|&i| !refined[i])
            .collect();
        starts.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        starts.truncate(MAX_REFINEMENTS);

        debug!(
            "SHGO round {}: {} samples, {} minimizers to refine",
            round,
            pool.len(),
            starts.len()
        );

        let results = starts
            .par_iter()
            .map(|&i| {
                nelder_mead(
                    |x| eval.eval(x),
                    &scale(&pool[i], bounds),
                    values[i],
                    bounds,
                    local_iter,
                )
            })
            .collect::<XfResult<Vec<_>>>()?;

        for (&i, res) in starts.iter().zip(results) {
            refined[i] = true;
            if res.value < best_value {
                best_value = res.value;
                best_x = res.x;
            }
        }

        callback.on_progress(round, best_value, &best_x);
    }

    Ok(Outcome {
        x: best_x,
        value: best_value,
        iterations: rounds,
    })
}
