use serde::{Deserialize, Serialize};

/// Category of an obstacle, resolved by the environment before it reaches a policy.
///
/// Flyers are split by altitude: a low flyer must be jumped over, a high flyer
/// can be ducked under.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::IsVariant,
)]
pub enum ObstacleKind {
    #[display("ground")]
    Ground,
    #[display("flyer-low")]
    FlyerLow,
    #[display("flyer-high")]
    FlyerHigh,
}

impl ObstacleKind {
    /// Returns `true` for both flyer altitudes.
    #[must_use]
    pub const fn is_flyer(self) -> bool {
        matches!(self, Self::FlyerLow | Self::FlyerHigh)
    }
}

/// An obstacle on screen.
///
/// Coordinates are screen coordinates: `x` grows to the right, `y` grows downwards,
/// and `(x, y)` is the top-left corner of the obstacle's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub kind: ObstacleKind,
}

impl Obstacle {
    /// Right edge of the bounding box.
    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }
}

/// Position, size and flight state of the controlled agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// The agent is airborne.
    pub jumping: bool,
    /// The duck key is currently held.
    pub ducking: bool,
    /// A duck was already issued during the current jump.
    pub has_ducked_in_jump: bool,
}

impl AgentState {
    /// Horizontal distance from the agent's front edge to the leading edge of `obstacle`.
    ///
    /// Negative once the obstacle overlaps or has passed the agent.
    #[must_use]
    pub fn gap_to(&self, obstacle: &Obstacle) -> f64 {
        obstacle.x - (self.x + self.width)
    }
}

/// A snapshot of the game produced by an [`Environment`](crate::Environment).
///
/// Obstacles are ordered nearest-first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub agent: AgentState,
    pub obstacles: Vec<Obstacle>,
    pub speed: f64,
    pub score: f64,
}

impl Observation {
    /// Returns the obstacle closest to the agent, if any.
    #[must_use]
    pub fn nearest_obstacle(&self) -> Option<&Obstacle> {
        self.obstacles.first()
    }
}

/// Jump and duck intents issued by a policy.
///
/// The two flags are independent; a policy is expected to raise at most one of them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    pub jump: bool,
    pub duck: bool,
}

impl Action {
    /// Neither jump nor duck.
    pub const NONE: Self = Self {
        jump: false,
        duck: false,
    };

    #[must_use]
    pub const fn jump() -> Self {
        Self {
            jump: true,
            duck: false,
        }
    }

    #[must_use]
    pub const fn duck() -> Self {
        Self {
            jump: false,
            duck: true,
        }
    }

    #[must_use]
    pub const fn is_none(self) -> bool {
        !self.jump && !self.duck
    }
}
