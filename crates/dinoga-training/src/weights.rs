//! Weight vector operations for the genetic algorithm.
//!
//! A policy's genome is a fixed-size weight vector plus two bias scalars. The
//! functions here implement the per-gene building blocks used by
//! [`Policy`](crate::policy::Policy) and the
//! [`PopulationEvolver`](crate::genetic::PopulationEvolver):
//!
//! - **Initialization**: [`random`] draws every weight uniformly from `[-bound, bound]`
//! - **Crossover**: [`uniform_crossover`] picks each gene from one parent by a coin flip
//! - **Mutation**: [`mutate_gene`] / [`mutate`] add uniform noise with a per-gene probability
//! - **Geometry**: [`dot`] for scoring, [`distance`] for elite diversity
//!
//! Weights are never clipped or normalized, so they may drift without bound over
//! long runs.

use std::array;

use rand::Rng;

/// Number of observation features a policy weighs.
pub const FEATURE_COUNT: usize = 5;

/// A policy's weight vector, one weight per feature.
pub type Weights = [f64; FEATURE_COUNT];

/// Generates a weight vector with every weight uniform in `[-bound, bound]`.
pub fn random<R>(rng: &mut R, bound: f64) -> Weights
where
    R: Rng + ?Sized,
{
    array::from_fn(|_| rng.random_range(-bound..=bound))
}

/// Uniform crossover between two parent weight vectors.
///
/// `take_second` is called once per gene, in index order; `false` keeps the gene
/// of `p1`, `true` takes the gene of `p2`. The child is a new array, so it never
/// aliases either parent.
///
/// # Examples
///
/// ```
/// use dinoga_training::weights;
///
/// let mut coins = [false, true, false, true, false].into_iter();
/// let child = weights::uniform_crossover(&[1.0; 5], &[-1.0; 5], || coins.next().unwrap());
/// assert_eq!(child, [1.0, -1.0, 1.0, -1.0, 1.0]);
/// ```
pub fn uniform_crossover<F>(p1: &Weights, p2: &Weights, mut take_second: F) -> Weights
where
    F: FnMut() -> bool,
{
    array::from_fn(|i| if take_second() { p2[i] } else { p1[i] })
}

/// With probability `rate`, adds a uniform draw from `[-scale, scale]` to `gene`.
///
/// # Panics
///
/// Panics if `rate` is outside `[0, 1]` or `scale` is negative.
pub fn mutate_gene<R>(gene: &mut f64, rate: f64, scale: f64, rng: &mut R)
where
    R: Rng + ?Sized,
{
    if rng.random_bool(rate) {
        *gene += rng.random_range(-scale..=scale);
    }
}

/// Applies [`mutate_gene`] to every weight independently.
pub fn mutate<R>(weights: &mut [f64], rate: f64, scale: f64, rng: &mut R)
where
    R: Rng + ?Sized,
{
    for w in weights {
        mutate_gene(w, rate, scale, rng);
    }
}

/// Dot product of two equally sized vectors.
#[must_use]
pub fn dot(a: &Weights, b: &Weights) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Euclidean distance between two weight vectors.
///
/// # Examples
///
/// ```
/// use dinoga_training::weights;
///
/// let d = weights::distance(&[0.0, 3.0, 0.0, 0.0, 0.0], &[4.0, 0.0, 0.0, 0.0, 0.0]);
/// assert_eq!(d, 5.0);
/// ```
#[must_use]
pub fn distance(a: &Weights, b: &Weights) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}
