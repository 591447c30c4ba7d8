//! Small numeric primitives shared by every probabilistic step of the
//! filter: CDF construction, categorical sampling, sampling without
//! replacement, and the L2 norm used by effective-sample-size.

use rand::Rng;

use crate::error::EngineError;

/// Converts a non-negative weight vector into a cumulative distribution in
/// place: `out[i] = sum(xs[0..=i]) / sum(xs)`, with the last entry forced to
/// `1.0` to absorb floating point rounding.
///
/// Fails with `DegenerateDistribution` if `xs` is empty or sums to zero.
pub fn normalize_to_cdf(xs: &mut [f64]) -> Result<(), EngineError> {
    if xs.is_empty() {
        return Err(EngineError::DegenerateDistribution);
    }
    let sum: f64 = xs.iter().sum();
    if sum <= 0.0 {
        return Err(EngineError::DegenerateDistribution);
    }
    let mut acc = 0.0;
    for x in xs.iter_mut() {
        acc += *x;
        *x = acc / sum;
    }
    *xs.last_mut().expect("non-empty") = 1.0;
    Ok(())
}

/// Draws a category from a CDF built by [`normalize_to_cdf`]: returns the
/// least `i` with `cdf[i] >= u` for `u` drawn uniformly from `[0, 1)`.
///
/// Fails with `EmptyDistribution` if `cdf` is empty.
pub fn sample_categorical(cdf: &[f64], rng: &mut impl Rng) -> Result<usize, EngineError> {
    if cdf.is_empty() {
        return Err(EngineError::EmptyDistribution);
    }
    if cdf.len() == 1 {
        return Ok(0);
    }
    let u: f64 = rng.gen_range(0.0..1.0);
    Ok(bisection::bisect_left(cdf, &u).min(cdf.len() - 1))
}

/// Returns a uniform random subset of `xs` of size `min(k, xs.len())`,
/// without replacement. Order of the result is unspecified.
pub fn sample_without_replacement<T: Clone>(xs: &[T], k: usize, rng: &mut impl Rng) -> Vec<T> {
    if k >= xs.len() {
        return xs.to_vec();
    }
    rand::seq::index::sample(rng, xs.len(), k)
        .into_iter()
        .map(|i| xs[i].clone())
        .collect()
}

/// Euclidean (L2) norm of a slice.
pub fn l2_norm(xs: &[f64]) -> f64 {
    xs.iter().map(|x| x * x).sum::<f64>().sqrt()
}
