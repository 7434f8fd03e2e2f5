use rand::{Rng, SeedableRng as _};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::{
    core::{Action, AgentState, Obstacle, ObstacleKind, Observation},
    engine::Environment,
};

const SCREEN_WIDTH: f64 = 800.0;

const AGENT_X: f64 = 50.0;
const AGENT_WIDTH: f64 = 40.0;
const AGENT_HEIGHT: f64 = 50.0;
/// Top of the agent's bounding box while standing on the ground.
const AGENT_GROUND_Y: f64 = 130.0;
/// Ground line (bottom of everything resting on the ground).
const FLOOR_Y: f64 = AGENT_GROUND_Y + AGENT_HEIGHT;

const JUMP_IMPULSE: f64 = 10.0;
const JUMP_HEIGHT_SCALE: f64 = 5.0;
const GRAVITY: f64 = 0.5;
const DUCK_GRAVITY: f64 = 1.0;
const DUCK_HEIGHT_RATIO: f64 = 0.5;

const GROUND_OBSTACLE_PROBABILITY: f64 = 0.7;
const FLYER_HEIGHT: f64 = 30.0;
/// Top of a high flyer: clears a ducking agent, hits a standing one.
const FLYER_HIGH_Y: f64 = 120.0;

const SPEED_STEP: f64 = 0.01;
const SPEED_STEP_SCORE: u64 = 100;

/// Tunables of [`SimulatedGame`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    /// Simulated seconds per decision step.
    pub tick_seconds: f64,
    /// Obstacle speed (distance units per tick) at the start of an episode.
    pub initial_speed: f64,
    /// Upper bound for the speed-up as the score grows.
    pub max_speed: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            tick_seconds: 0.01,
            initial_speed: 6.0,
            max_speed: 13.0,
        }
    }
}

/// Headless, deterministic dino-runner world.
///
/// Each [`apply`](Environment::apply) advances the world by one tick. Obstacles
/// spawn at the right edge of an 800-unit wide screen every 1–3 simulated seconds
/// and move left at the current speed; touching one ends the episode.
///
/// The random stream is not reset between episodes, so successive episodes differ
/// while the whole run stays reproducible for a given seed.
///
/// # Example
///
/// ```
/// use dinoga_engine::{Action, Environment, SimulatedGame, SimulationParams};
///
/// let mut game = SimulatedGame::with_seed(SimulationParams::default(), 42);
/// game.start();
/// while !game.is_terminal() {
///     let observation = game.observe();
///     let jump = observation
///         .nearest_obstacle()
///         .is_some_and(|o| observation.agent.gap_to(o) < 40.0);
///     game.apply(Action { jump, duck: false });
/// #   if game.score() > 50.0 { break; }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SimulatedGame {
    params: SimulationParams,
    rng: Pcg32,
    running: bool,
    game_over: bool,
    score: f64,
    speed: f64,
    elapsed: f64,
    next_spawn_at: f64,
    obstacles: Vec<Obstacle>,
    jump_height: f64,
    ducking: bool,
    has_ducked_in_jump: bool,
}

impl SimulatedGame {
    /// Creates a simulator seeded from the thread-local random source.
    #[must_use]
    pub fn new(params: SimulationParams) -> Self {
        Self::with_seed(params, rand::rng().random())
    }

    /// Like [`Self::new`], but with a specific seed for reproducible episodes.
    #[must_use]
    pub fn with_seed(params: SimulationParams, seed: u64) -> Self {
        Self {
            params,
            rng: Pcg32::seed_from_u64(seed),
            running: false,
            game_over: false,
            score: 0.0,
            speed: params.initial_speed,
            elapsed: 0.0,
            next_spawn_at: 0.0,
            obstacles: vec![],
            jump_height: 0.0,
            ducking: false,
            has_ducked_in_jump: false,
        }
    }

    #[must_use]
    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    #[must_use]
    pub fn is_airborne(&self) -> bool {
        self.jump_height > 0.0
    }

    fn agent(&self) -> AgentState {
        AgentState {
            x: AGENT_X,
            y: AGENT_GROUND_Y - self.jump_height * JUMP_HEIGHT_SCALE,
            width: AGENT_WIDTH,
            height: AGENT_HEIGHT,
            jumping: self.is_airborne(),
            ducking: self.ducking,
            has_ducked_in_jump: self.has_ducked_in_jump,
        }
    }

    fn schedule_next_spawn(&mut self) {
        self.next_spawn_at = self.elapsed + self.rng.random_range(1.0..=3.0);
    }

    fn spawn_obstacle(&mut self) {
        let width = f64::from(self.rng.random_range(20_u8..=40));
        let obstacle = if self.rng.random_bool(GROUND_OBSTACLE_PROBABILITY) {
            let height = f64::from(self.rng.random_range(40_u8..=70));
            Obstacle {
                x: SCREEN_WIDTH,
                y: FLOOR_Y - height,
                width,
                height,
                kind: ObstacleKind::Ground,
            }
        } else if self.rng.random_bool(0.5) {
            Obstacle {
                x: SCREEN_WIDTH,
                y: FLOOR_Y - FLYER_HEIGHT,
                width,
                height: FLYER_HEIGHT,
                kind: ObstacleKind::FlyerLow,
            }
        } else {
            Obstacle {
                x: SCREEN_WIDTH,
                y: FLYER_HIGH_Y,
                width,
                height: FLYER_HEIGHT,
                kind: ObstacleKind::FlyerHigh,
            }
        };
        self.obstacles.push(obstacle);
    }

    fn is_colliding(&self) -> bool {
        let agent = self.agent();
        // ducking keeps the feet on the ground and lowers the head
        let (top, height) = if self.ducking {
            let height = agent.height * DUCK_HEIGHT_RATIO;
            (agent.y + agent.height - height, height)
        } else {
            (agent.y, agent.height)
        };
        self.obstacles.iter().any(|o| {
            agent.x < o.right()
                && agent.x + agent.width > o.x
                && top < o.y + o.height
                && top + height > o.y
        })
    }

    fn step(&mut self) {
        self.elapsed += self.params.tick_seconds;
        self.score += self.speed * self.params.tick_seconds;

        if self.is_airborne() {
            let gravity = if self.ducking { DUCK_GRAVITY } else { GRAVITY };
            self.jump_height = f64::max(self.jump_height - gravity, 0.0);
        }

        if self.elapsed >= self.next_spawn_at {
            self.spawn_obstacle();
            self.schedule_next_spawn();
        }

        for obstacle in &mut self.obstacles {
            obstacle.x -= self.speed;
        }
        self.obstacles.retain(|o| o.x > -o.width);

        if self.is_colliding() {
            self.game_over = true;
            self.running = false;
        }

        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let whole_score = self.score as u64;
        if whole_score > 0 && whole_score % SPEED_STEP_SCORE == 0 {
            self.speed = f64::min(self.speed + SPEED_STEP, self.params.max_speed);
        }
    }
}

impl Environment for SimulatedGame {
    fn start(&mut self) {
        self.running = true;
        self.game_over = false;
        self.score = 0.0;
        self.speed = self.params.initial_speed;
        self.elapsed = 0.0;
        self.obstacles.clear();
        self.jump_height = 0.0;
        self.ducking = false;
        self.has_ducked_in_jump = false;
        self.schedule_next_spawn();
    }

    fn observe(&mut self) -> Observation {
        let agent = self.agent();
        Observation {
            agent,
            // obstacles already behind the agent are no longer relevant
            obstacles: self
                .obstacles
                .iter()
                .filter(|o| o.right() >= agent.x)
                .copied()
                .collect(),
            speed: self.speed,
            score: self.score(),
        }
    }

    fn apply(&mut self, action: Action) {
        if !self.running {
            return;
        }
        if action.jump && !self.is_airborne() {
            self.jump_height = JUMP_IMPULSE;
            self.has_ducked_in_jump = false;
        }
        self.ducking = action.duck;
        if action.duck && self.is_airborne() {
            self.has_ducked_in_jump = true;
        }
        self.step();
    }

    fn is_terminal(&self) -> bool {
        self.game_over
    }

    fn score(&self) -> f64 {
        self.score.floor()
    }

    fn restart(&mut self) {
        self.start();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP_LIMIT: usize = 5_000;

    fn run_idle(game: &mut SimulatedGame) -> usize {
        let mut steps = 0;
        while !game.is_terminal() && steps < STEP_LIMIT {
            game.apply(Action::NONE);
            steps += 1;
        }
        steps
    }

    #[test]
    fn test_idle_agent_eventually_collides() {
        let mut game = SimulatedGame::with_seed(SimulationParams::default(), 7);
        game.start();
        let steps = run_idle(&mut game);
        assert!(game.is_terminal());
        assert!(steps < STEP_LIMIT);
        assert!(game.score() > 0.0);
    }

    #[test]
    fn test_score_is_monotonic_and_restart_resets_it() {
        let mut game = SimulatedGame::with_seed(SimulationParams::default(), 3);
        game.start();
        let mut last = game.score();
        for _ in 0..200 {
            game.apply(Action::NONE);
            assert!(game.score() >= last);
            last = game.score();
        }
        game.restart();
        assert_eq!(game.score(), 0.0);
        assert!(!game.is_terminal());
    }

    #[test]
    fn test_same_seed_same_episode() {
        let mut a = SimulatedGame::with_seed(SimulationParams::default(), 11);
        let mut b = SimulatedGame::with_seed(SimulationParams::default(), 11);
        a.start();
        b.start();
        assert_eq!(run_idle(&mut a), run_idle(&mut b));
        assert_eq!(a.score(), b.score());
    }

    #[test]
    fn test_apply_before_start_is_ignored() {
        let mut game = SimulatedGame::with_seed(SimulationParams::default(), 1);
        game.apply(Action::jump());
        assert!(!game.is_airborne());
        assert_eq!(game.score(), 0.0);
    }

    #[test]
    fn test_jump_and_duck_assist_flags() {
        let mut game = SimulatedGame::with_seed(SimulationParams::default(), 5);
        game.start();
        game.apply(Action::jump());
        let observation = game.observe();
        assert!(observation.agent.jumping);
        assert!(observation.agent.y < AGENT_GROUND_Y);
        assert!(!observation.agent.has_ducked_in_jump);

        game.apply(Action::duck());
        let observation = game.observe();
        assert!(observation.agent.ducking);
        assert!(observation.agent.has_ducked_in_jump);

        // ducking doubles gravity, so the agent lands within a handful of ticks
        for _ in 0..20 {
            game.apply(Action::duck());
        }
        let observation = game.observe();
        assert!(!observation.agent.jumping);
        assert_eq!(observation.agent.y, AGENT_GROUND_Y);

        game.apply(Action::jump());
        assert!(!game.observe().agent.has_ducked_in_jump);
    }

    #[test]
    fn test_obstacles_are_nearest_first() {
        let mut game = SimulatedGame::with_seed(SimulationParams::default(), 9);
        game.start();
        for _ in 0..600 {
            if game.is_terminal() {
                break;
            }
            let jump = game.observe().obstacles.len() > 1;
            game.apply(Action { jump, duck: false });
            let observation = game.observe();
            assert!(
                observation
                    .obstacles
                    .is_sorted_by(|a, b| a.x <= b.x)
            );
        }
    }

    #[test]
    fn test_ducking_passes_under_high_flyer() {
        let mut game = SimulatedGame::with_seed(SimulationParams::default(), 2);
        game.start();
        game.obstacles.push(Obstacle {
            x: AGENT_X,
            y: FLYER_HIGH_Y,
            width: 30.0,
            height: FLYER_HEIGHT,
            kind: ObstacleKind::FlyerHigh,
        });
        game.ducking = true;
        assert!(!game.is_colliding());
        game.ducking = false;
        assert!(game.is_colliding());
    }
}
