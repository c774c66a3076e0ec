use super::local::nelder_mead;
use super::runner::{Evaluator, Outcome, ProgressCallback};
use crate::bounds::ParameterBound;
use crate::error::XfResult;
use fastrand::Rng;
use std::f64::consts::PI;
use tracing::debug;

pub(crate) struct AnnealSettings {
    pub max_iter: usize,
    pub initial_temp: f64,
    pub restart_temp_ratio: f64,
    /// Tsallis visiting parameter `qv`; shapes the cooling schedule.
    pub visit: f64,
    /// Tsallis acceptance parameter `qa` (negative: stricter than Metropolis).
    pub accept: f64,
    pub local_iter: usize,
}

/// Generalized simulated annealing temperature at iteration `k`.
fn temperature(s: &AnnealSettings, k: usize) -> f64 {
    let t1 = ((s.visit - 1.0) * 2f64.ln()).exp() - 1.0;
    let t2 = ((s.visit - 1.0) * ((k + 2) as f64).ln()).exp() - 1.0;
    s.initial_temp * t1 / t2
}

/// Generalized Metropolis probability of accepting an uphill move of `delta`.
fn acceptance(accept: f64, delta: f64, t_accept: f64) -> f64 {
    let pqv = 1.0 - (1.0 - accept) * delta / t_accept;
    if pqv <= 0.0 {
        0.0
    } else {
        (pqv.ln() / (1.0 - accept)).exp()
    }
}

/// Folds `v` back into the bound interval.
fn wrap(v: f64, b: &ParameterBound) -> f64 {
    let w = b.width();
    if w <= 0.0 || !v.is_finite() {
        return b.lower;
    }
    b.lower + (v - b.lower).rem_euclid(w)
}

fn random_point(rng: &mut Rng, bounds: &[ParameterBound]) -> Vec<f64> {
    bounds
        .iter()
        .map(|b| b.lower + rng.f64() * b.width())
        .collect()
}

/// Heavy-tailed step; the scale shrinks with the temperature relative to the start.
fn cauchy_step(rng: &mut Rng, scale: f64) -> f64 {
    scale * (PI * (rng.f64() - 0.5)).tan()
}

pub(crate) fn run<CB: ProgressCallback>(
    eval: &Evaluator,
    bounds: &[ParameterBound],
    s: AnnealSettings,
    seed: Option<u64>,
    callback: &CB,
) -> XfResult<Outcome> {
    let dim = bounds.len();
    let mut rng = if let Some(seed) = seed {
        Rng::with_seed(seed)
    } else {
        Rng::new()
    };

    let mut current = random_point(&mut rng, bounds);
    let mut e_current = eval.eval(&current)?;
    let mut best = current.clone();
    let mut e_best = e_current;
    let restart_below = s.initial_temp * s.restart_temp_ratio;

    for k in 0..s.max_iter {
        let temp = temperature(&s, k);
        if temp < restart_below {
            debug!("Annealing restart at iteration {}", k);
            current = random_point(&mut rng, bounds);
            e_current = eval.eval(&current)?;
        }
        let t_accept = temp / (k + 1) as f64;
        let step_scale = temp / s.initial_temp;
        let mut improved = false;

        // Markov chain: first sweep moves every coordinate, second sweep one at a time
        for j in 0..2 * dim {
            let mut candidate = current.clone();
            if j < dim {
                for (v, b) in candidate.iter_mut().zip(bounds) {
                    *v = wrap(*v + cauchy_step(&mut rng, step_scale) * b.width(), b);
                }
            } else {
                let d = j - dim;
                candidate[d] = wrap(
                    candidate[d] + cauchy_step(&mut rng, step_scale) * bounds[d].width(),
                    &bounds[d],
                );
            }

            let e = eval.eval(&candidate)?;
            let take = if e < e_current {
                true
            } else {
                rng.f64() <= acceptance(s.accept, e - e_current, t_accept)
            };
            if take {
                current = candidate;
                e_current = e;
                if e < e_best {
                    e_best = e;
                    best = current.clone();
                    improved = true;
                }
            }
        }

        // Polish each new best locally
        if improved && s.local_iter > 0 {
            let res = nelder_mead(|x| eval.eval(x), &best, e_best, bounds, s.local_iter)?;
            if res.value < e_best {
                e_best = res.value;
                best = res.x;
                current = best.clone();
                e_current = e_best;
            }
        }

        callback.on_progress(k + 1, e_best, &best);
    }

    Ok(Outcome {
        x: best,
        value: e_best,
        iterations: s.max_iter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> AnnealSettings {
        AnnealSettings {
            max_iter: 10,
            initial_temp: 5230.0,
            restart_temp_ratio: 2e-5,
            visit: 2.62,
            accept: -5.0,
            local_iter: 0,
        }
    }

    #[test]
    fn schedule_starts_at_initial_temperature_and_cools() {
        let s = settings();
        assert!((temperature(&s, 0) - 5230.0).abs() < 1e-9);
        let mut prev = f64::INFINITY;
        for k in 0..50 {
            let t = temperature(&s, k);
            assert!(t < prev);
            prev = t;
        }
    }

    #[test]
    fn uphill_acceptance_falls_with_delta() {
        let a = acceptance(-5.0, 1.0, 100.0);
        let b = acceptance(-5.0, 10.0, 100.0);
        assert!(a > b && b > 0.0);
        assert_eq!(acceptance(-5.0, 1000.0, 100.0), 0.0);
    }

    #[test]
    fn wrap_stays_inside() {
        let b = ParameterBound { lower: 2.0, upper: 4.0 };
        assert!((wrap(4.5, &b) - 2.5).abs() < 1e-12);
        assert!((wrap(1.5, &b) - 3.5).abs() < 1e-12);
        assert_eq!(wrap(3.0, &b), 3.0);
    }
}
