//! The evolved control policy.
//!
//! A [`Policy`] is a linear scorer over five observation features followed by a
//! fixed, hand-written decision rule. Only the weights and the two biases are
//! evolved; the rule itself never changes.
//!
//! # Features
//!
//! Built from the nearest obstacle:
//!
//! ```text
//! [gap, obstacle width, obstacle height, flyer flag (1.0 / 0.0), speed]
//! ```
//!
//! # Scores
//!
//! ```text
//! jump_prob = sigmoid(w · f + jump_bias)
//! duck_prob = sigmoid((-0.5 w) · f + duck_bias)
//! ```
//!
//! # Decision Rule
//!
//! - **Airborne**: never jump; duck (a fast landing) only when the obstacle is
//!   closer than 120 units, `duck_prob > 0.5`, and no duck was issued yet during
//!   this jump
//! - **Ground obstacle** or **low flyer**: jump when `jump_prob > 0.4`, never duck
//! - **High flyer**: never jump; duck when `duck_prob > max(0.3, 0.7 - gap / 200)`,
//!   so the bar drops as the flyer gets closer

use dinoga_engine::{Action, ObstacleKind, Observation};
use rand::Rng;

use crate::weights::{self, FEATURE_COUNT, Weights};

const GROUNDED_JUMP_THRESHOLD: f64 = 0.4;
const AIRBORNE_DUCK_THRESHOLD: f64 = 0.5;
const AIRBORNE_DUCK_RANGE: f64 = 120.0;
const HIGH_FLYER_DUCK_CEILING: f64 = 0.7;
const HIGH_FLYER_DUCK_FLOOR: f64 = 0.3;
const HIGH_FLYER_DUCK_RAMP: f64 = 200.0;
const DUCK_WEIGHT_FACTOR: f64 = -0.5;

/// Range of the initial weights and biases.
const INITIAL_BOUND: f64 = 1.0;

/// Mutation hyperparameters carried by every policy.
///
/// These are supplied at construction and are never changed by the genetic
/// operators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MutationParams {
    /// Probability that a single gene is perturbed.
    pub rate: f64,
    /// Half-width of the uniform perturbation.
    pub scale: f64,
}

/// A weighted linear jump/duck policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    weights: Weights,
    jump_bias: f64,
    duck_bias: f64,
    mutation: MutationParams,
}

impl Policy {
    #[must_use]
    pub fn new(weights: Weights, jump_bias: f64, duck_bias: f64, mutation: MutationParams) -> Self {
        Self {
            weights,
            jump_bias,
            duck_bias,
            mutation,
        }
    }

    /// Creates a policy with weights and biases uniform in `[-1, 1]`.
    pub fn random<R>(rng: &mut R, mutation: MutationParams) -> Self
    where
        R: Rng + ?Sized,
    {
        let weights = weights::random(rng, INITIAL_BOUND);
        let jump_bias = rng.random_range(-INITIAL_BOUND..=INITIAL_BOUND);
        let duck_bias = rng.random_range(-INITIAL_BOUND..=INITIAL_BOUND);
        Self::new(weights, jump_bias, duck_bias, mutation)
    }

    #[must_use]
    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    #[must_use]
    pub fn jump_bias(&self) -> f64 {
        self.jump_bias
    }

    #[must_use]
    pub fn duck_bias(&self) -> f64 {
        self.duck_bias
    }

    #[must_use]
    pub fn mutation(&self) -> MutationParams {
        self.mutation
    }

    /// Euclidean distance between the weight vectors of two policies.
    ///
    /// Biases do not take part in the distance.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        weights::distance(&self.weights, &other.weights)
    }

    /// Maps an observation to an action.
    ///
    /// Returns [`Action::NONE`] when there is no obstacle, and also when a feature
    /// or a score is not finite (the anomaly is logged and only this step is
    /// affected). The result never has both `jump` and `duck` set.
    #[must_use]
    pub fn decide(&self, observation: &Observation) -> Action {
        let Some(obstacle) = observation.nearest_obstacle() else {
            return Action::NONE;
        };
        let agent = &observation.agent;
        let gap = agent.gap_to(obstacle);
        let features: [f64; FEATURE_COUNT] = [
            gap,
            obstacle.width,
            obstacle.height,
            if obstacle.kind.is_flyer() { 1.0 } else { 0.0 },
            observation.speed,
        ];
        if features.iter().any(|f| !f.is_finite()) {
            tracing::warn!(?features, "non-finite observation feature, skipping decision");
            return Action::NONE;
        }

        let jump_score = weights::dot(&self.weights, &features) + self.jump_bias;
        let duck_weights = self.weights.map(|w| w * DUCK_WEIGHT_FACTOR);
        let duck_score = weights::dot(&duck_weights, &features) + self.duck_bias;
        if !jump_score.is_finite() || !duck_score.is_finite() {
            tracing::warn!(
                jump_score,
                duck_score,
                weights = ?self.weights,
                "non-finite policy score, skipping decision"
            );
            return Action::NONE;
        }
        let jump_prob = sigmoid(jump_score);
        let duck_prob = sigmoid(duck_score);

        if agent.jumping {
            let duck = gap < AIRBORNE_DUCK_RANGE
                && duck_prob > AIRBORNE_DUCK_THRESHOLD
                && !agent.has_ducked_in_jump;
            return Action { jump: false, duck };
        }

        match obstacle.kind {
            ObstacleKind::Ground | ObstacleKind::FlyerLow => Action {
                jump: jump_prob > GROUNDED_JUMP_THRESHOLD,
                duck: false,
            },
            ObstacleKind::FlyerHigh => {
                let threshold = f64::max(
                    HIGH_FLYER_DUCK_FLOOR,
                    HIGH_FLYER_DUCK_CEILING - gap / HIGH_FLYER_DUCK_RAMP,
                );
                Action {
                    jump: false,
                    duck: duck_prob > threshold,
                }
            }
        }
    }

    /// Perturbs each weight and each bias independently with probability
    /// `mutation.rate` by a uniform draw from `[-mutation.scale, mutation.scale]`.
    pub fn mutate<R>(&mut self, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        let MutationParams { rate, scale } = self.mutation;
        weights::mutate(&mut self.weights, rate, scale, rng);
        weights::mutate_gene(&mut self.jump_bias, rate, scale, rng);
        weights::mutate_gene(&mut self.duck_bias, rate, scale, rng);
    }

    /// Uniform crossover: every weight and both biases come from `p1` or `p2` by
    /// an independent fair coin flip.
    ///
    /// The child inherits the mutation parameters of `p1`.
    pub fn crossover<R>(p1: &Self, p2: &Self, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        Self::crossover_with(p1, p2, || rng.random_bool(0.5))
    }

    /// Like [`Self::crossover`], but with caller-supplied coin flips.
    ///
    /// `take_second` is called seven times: once per weight in index order, then
    /// for the jump bias, then for the duck bias. `false` keeps the gene of `p1`.
    pub fn crossover_with<F>(p1: &Self, p2: &Self, mut take_second: F) -> Self
    where
        F: FnMut() -> bool,
    {
        let weights = weights::uniform_crossover(&p1.weights, &p2.weights, &mut take_second);
        let jump_bias = if take_second() {
            p2.jump_bias
        } else {
            p1.jump_bias
        };
        let duck_bias = if take_second() {
            p2.duck_bias
        } else {
            p1.duck_bias
        };
        Self::new(weights, jump_bias, duck_bias, p1.mutation)
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
