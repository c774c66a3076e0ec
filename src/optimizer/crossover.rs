use crate::config::DeVariant;
use fastrand::Rng;

impl DeVariant {
    /// Distinct population members (besides the candidate) the mutant is built from.
    pub fn partners(self) -> usize {
        match self {
            DeVariant::Best1Bin | DeVariant::Best1Exp => 2,
            DeVariant::CurrentToBest1Bin | DeVariant::CurrentToBest1Exp => 2,
            DeVariant::Rand1Bin | DeVariant::Rand1Exp => 3,
            DeVariant::Best2Bin | DeVariant::Best2Exp => 4,
            DeVariant::Rand2Bin | DeVariant::Rand2Exp => 5,
        }
    }

    pub fn is_exponential(self) -> bool {
        matches!(
            self,
            DeVariant::Best1Exp
                | DeVariant::Rand1Exp
                | DeVariant::Rand2Exp
                | DeVariant::Best2Exp
                | DeVariant::CurrentToBest1Exp
        )
    }
}

/// `k` distinct indices from `0..n`, none equal to `exclude`.
pub fn pick_partners(rng: &mut Rng, n: usize, exclude: usize, k: usize) -> Vec<usize> {
    let mut pool: Vec<usize> = (0..n).filter(|&i| i != exclude).collect();
    // Partial Fisher-Yates
    for i in 0..k.min(pool.len()) {
        let j = rng.usize(i..pool.len());
        pool.swap(i, j);
    }
    pool.truncate(k);
    pool
}

/// Donor vector for candidate `i` in unit-cube coordinates.
pub fn mutant(
    variant: DeVariant,
    population: &[Vec<f64>],
    best: usize,
    i: usize,
    r: &[usize],
    f: f64,
) -> Vec<f64> {
    let dim = population[i].len();
    let p = |k: usize, d: usize| population[r[k]][d];

    (0..dim)
        .map(|d| match variant {
            DeVariant::Best1Bin | DeVariant::Best1Exp => {
                population[best][d] + f * (p(0, d) - p(1, d))
            }
            DeVariant::Rand1Bin | DeVariant::Rand1Exp => p(0, d) + f * (p(1, d) - p(2, d)),
            DeVariant::CurrentToBest1Bin | DeVariant::CurrentToBest1Exp => {
                let x = population[i][d];
                x + f * (population[best][d] - x + p(0, d) - p(1, d))
            }
            DeVariant::Best2Bin | DeVariant::Best2Exp => {
                population[best][d] + f * (p(0, d) + p(1, d) - p(2, d) - p(3, d))
            }
            DeVariant::Rand2Bin | DeVariant::Rand2Exp => {
                p(0, d) + f * (p(1, d) + p(2, d) - p(3, d) - p(4, d))
            }
        })
        .collect()
}

/// Mixes `donor` into `target`. Binomial: each coordinate independently with probability `cr`, one
/// forced. Exponential: a run of consecutive coordinates from a random start, at least one long.
pub fn crossover(
    variant: DeVariant,
    rng: &mut Rng,
    target: &[f64],
    donor: &[f64],
    cr: f64,
) -> Vec<f64> {
    let dim = target.len();
    let mut trial = target.to_vec();
    let mut fill = rng.usize(0..dim);

    if variant.is_exponential() {
        let mut i = 0;
        while i < dim {
            trial[fill] = donor[fill];
            fill = (fill + 1) % dim;
            i += 1;
            if rng.f64() >= cr {
                break;
            }
        }
    } else {
        for d in 0..dim {
            if d == fill || rng.f64() < cr {
                trial[d] = donor[d];
            }
        }
    }
    trial
}

/// Coordinates pushed out of the unit cube are redrawn uniformly.
pub fn ensure_unit(rng: &mut Rng, trial: &mut [f64]) {
    for v in trial.iter_mut() {
        if !(0.0..=1.0).contains(v) {
            *v = rng.f64();
        }
    }
}
