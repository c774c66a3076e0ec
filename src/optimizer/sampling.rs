use fastrand::Rng;

/// Latin hypercube in the unit cube: each axis is cut into `n` strata and every stratum is hit once.
pub fn latin_hypercube(rng: &mut Rng, n: usize, dim: usize) -> Vec<Vec<f64>> {
    let mut points = vec![vec![0.0; dim]; n];
    let segment = 1.0 / n as f64;

    for d in 0..dim {
        let mut strata: Vec<usize> = (0..n).collect();
        rng.shuffle(&mut strata);
        for (point, &s) in points.iter_mut().zip(&strata) {
            point[d] = (s as f64 + rng.f64()) * segment;
        }
    }
    points
}

/// The `index`-th point of the Halton sequence in `dim` dimensions. Index 0 is skipped by callers
/// since it is the origin.
pub fn halton(index: usize, dim: usize) -> Vec<f64> {
    first_primes(dim)
        .into_iter()
        .map(|base| radical_inverse(index, base))
        .collect()
}

fn radical_inverse(mut index: usize, base: usize) -> f64 {
    let inv = 1.0 / base as f64;
    let mut f = inv;
    let mut out = 0.0;
    while index > 0 {
        out += f * (index % base) as f64;
        index /= base;
        f *= inv;
    }
    out
}

fn first_primes(n: usize) -> Vec<usize> {
    let mut primes = Vec::with_capacity(n);
    let mut candidate = 2;
    while primes.len() < n {
        if primes.iter().all(|p| candidate % p != 0) {
            primes.push(candidate);
        }
        candidate += 1;
    }
    primes
}
