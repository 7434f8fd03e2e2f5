//! Environment contract and the built-in simulator.
//!
//! - [`Environment`] - What the training loop needs from a game: start, observe, act, score
//! - [`SimulatedGame`] - Headless, seeded implementation used for training and demos
//! - [`SimulationParams`] - Tick length and speed limits of the simulator
//!
//! # Episode Flow
//!
//! 1. [`Environment::start`] (or [`Environment::restart`]) begins an episode
//! 2. The caller alternates [`Environment::observe`] and [`Environment::apply`]
//! 3. [`Environment::is_terminal`] turns `true` after a collision
//! 4. [`Environment::score`] is the episode's result

pub use self::{environment::*, simulator::*};

mod environment;
mod simulator;
