//! Data exchanged between an environment and a policy.
//!
//! - [`Observation`] - What the policy sees: the agent, the obstacles ahead, speed and score
//! - [`Obstacle`] / [`ObstacleKind`] - A single obstacle and its closed category
//! - [`AgentState`] - Position, size and flight state of the agent
//! - [`Action`] - Jump and duck intents produced by a policy

pub use self::observation::*;

pub(crate) mod observation;
