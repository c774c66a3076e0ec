use crate::bounds::ParameterBound;
use crate::error::{XfResult, XrayFitError};
use argmin::{
    core::{CostFunction, Error, Executor},
    solver::neldermead::NelderMead,
};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug)]
pub struct LocalResult {
    pub x: Vec<f64>,
    pub value: f64,
    pub evaluations: usize,
}

const INITIAL_STEP: f64 = 0.05;
const SD_TOLERANCE: f64 = 1e-8;

fn clamp_into(x: &mut [f64], bounds: &[ParameterBound]) {
    for (v, b) in x.iter_mut().zip(bounds) {
        *v = b.clamp(*v);
    }
}

/// Objective seen by the simplex: every vertex is clamped into the box first.
struct BoundedCost<'a, F> {
    f: F,
    bounds: &'a [ParameterBound],
    evaluations: &'a AtomicUsize,
}

impl<F> CostFunction for BoundedCost<'_, F>
where
    F: Fn(&[f64]) -> XfResult<f64>,
{
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, p: &Self::Param) -> Result<Self::Output, Error> {
        let mut x = p.clone();
        clamp_into(&mut x, self.bounds);
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        Ok((self.f)(&x)?)
    }
}

/// One step along each axis, pointing inwards near the upper bound.
fn initial_simplex(start: &[f64], bounds: &[ParameterBound]) -> Vec<Vec<f64>> {
    let mut vertices = Vec::with_capacity(start.len() + 1);
    vertices.push(start.to_vec());
    for (d, b) in bounds.iter().enumerate() {
        let mut v = start.to_vec();
        let step = INITIAL_STEP * b.width();
        v[d] = if v[d] + step <= b.upper {
            v[d] + step
        } else {
            v[d] - step
        };
        clamp_into(&mut v, bounds);
        vertices.push(v);
    }
    vertices
}

fn into_fit_error(err: Error) -> XrayFitError {
    match err.downcast::<XrayFitError>() {
        Ok(e) => e,
        Err(e) => XrayFitError::LocalSearch(e.to_string()),
    }
}

/// Nelder-Mead polish kept inside `bounds` by clamping every vertex.
/// Runs at most `max_iters` simplex iterations; errors raised by `f` come back unchanged.
pub fn nelder_mead<F>(
    f: F,
    start: &[f64],
    f_start: f64,
    bounds: &[ParameterBound],
    max_iters: usize,
) -> XfResult<LocalResult>
where
    F: Fn(&[f64]) -> XfResult<f64>,
{
    if start.is_empty() || max_iters == 0 {
        return Ok(LocalResult {
            x: start.to_vec(),
            value: f_start,
            evaluations: 0,
        });
    }

    let evaluations = AtomicUsize::new(0);
    let problem = BoundedCost {
        f,
        bounds,
        evaluations: &evaluations,
    };
    let solver: NelderMead<Vec<f64>, f64> = NelderMead::new(initial_simplex(start, bounds))
        .with_sd_tolerance(SD_TOLERANCE)
        .map_err(into_fit_error)?;

    let res = Executor::new(problem, solver)
        .configure(|state| state.max_iters(max_iters as u64))
        .run()
        .map_err(into_fit_error)?;

    let evaluations = evaluations.load(Ordering::Relaxed);
    let (mut x, value) = match res.state.best_param {
        Some(x) if res.state.best_cost < f_start => (x, res.state.best_cost),
        _ => (start.to_vec(), f_start),
    };
    clamp_into(&mut x, bounds);

    Ok(LocalResult {
        x,
        value,
        evaluations,
    })
}
