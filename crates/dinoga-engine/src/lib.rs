//! Game-side contract for the dino runner.
//!
//! This crate defines what crosses the boundary between a game environment and a
//! control policy, plus a headless simulator that satisfies that contract:
//!
//! - [`core`] - [`Observation`], [`Obstacle`], [`AgentState`] and [`Action`]
//! - [`engine`] - The [`Environment`] trait and the seeded [`SimulatedGame`]
//!
//! Live environments (a browser-hosted game, for instance) live outside this
//! workspace and plug in by implementing [`Environment`].

pub use self::{core::*, engine::*};

pub mod core;
pub mod engine;
