//! Fitness evaluation: playing policies against an [`Environment`].
//!
//! A policy's fitness is the mean score of `runs` independent episodes. Each
//! episode is restarted from scratch and capped at `max_steps` decision steps, so
//! a policy that never dies still yields a finite score.
//!
//! # Sustained Duck
//!
//! Duck is level-triggered: once held it stays held until an action releases it.
//! A policy only asks to duck while a high flyer is approaching, so a plain
//! "no duck" on the following step would stand the agent up underneath it. While
//! the agent is ducking and a high flyer is within `(-50, 150)` gap units, a
//! decision without duck keeps the duck held instead (see [`sustain_duck`]).

use dinoga_engine::{Action, Environment, ObstacleKind, Observation};

use crate::{config::TrainingParams, genetic::Population, policy::Policy};

/// Gap range (exclusive) in which a high flyer keeps the duck held.
const SUSTAIN_DUCK_GAP: (f64, f64) = (-50.0, 150.0);

/// Outcome of one played episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionResult {
    pub score: f64,
    /// Decision steps taken.
    pub steps: usize,
    /// `false` if the episode was cut off by the step limit.
    pub terminated: bool,
}

/// Plays episodes and turns them into fitness scores.
#[derive(Debug, Clone)]
pub struct SessionEvaluator {
    runs: usize,
    max_steps: usize,
}

impl SessionEvaluator {
    /// # Panics
    ///
    /// Panics if `runs` is zero.
    #[must_use]
    pub fn new(runs: usize, max_steps: usize) -> Self {
        assert!(runs > 0, "at least one run per policy is required");
        Self { runs, max_steps }
    }

    #[must_use]
    pub fn from_params(params: &TrainingParams) -> Self {
        Self::new(params.runs_per_individual, params.max_steps)
    }

    #[must_use]
    pub fn runs(&self) -> usize {
        self.runs
    }

    #[must_use]
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Restarts `env` and plays one episode with `policy`.
    pub fn play_session<E>(&self, env: &mut E, policy: &Policy) -> SessionResult
    where
        E: Environment + ?Sized,
    {
        env.restart();
        let mut steps = 0;
        while !env.is_terminal() && steps < self.max_steps {
            let observation = env.observe();
            let action = sustain_duck(&observation, policy.decide(&observation));
            env.apply(action);
            steps += 1;
        }
        SessionResult {
            score: env.score(),
            steps,
            terminated: env.is_terminal(),
        }
    }

    /// Plays `runs` episodes and returns the mean score.
    #[expect(clippy::cast_precision_loss)]
    pub fn play_and_evaluate_sessions<E>(&self, env: &mut E, policy: &Policy) -> f64
    where
        E: Environment + ?Sized,
    {
        let mut total = 0.0;
        for _ in 0..self.runs {
            let result = self.play_session(env, policy);
            if !result.terminated {
                tracing::debug!(steps = result.steps, "episode reached the step limit");
            }
            total += result.score;
        }
        total / self.runs as f64
    }

    /// Evaluates every member of `population`, in order.
    pub fn evaluate_population<E>(&self, env: &mut E, population: &Population) -> Vec<f64>
    where
        E: Environment + ?Sized,
    {
        population
            .individuals()
            .iter()
            .map(|policy| self.play_and_evaluate_sessions(env, policy))
            .collect()
    }
}

/// Keeps an active duck held while a high flyer is passing over the agent.
///
/// Returns `action` unchanged unless it releases the duck while the agent is
/// ducking under a nearby high flyer. The jump flag is passed through, so the
/// action applied to the environment may carry both `jump` and `duck`, unlike a
/// [`Policy::decide`] result.
#[must_use]
pub fn sustain_duck(observation: &Observation, action: Action) -> Action {
    if action.duck || !observation.agent.ducking {
        return action;
    }
    let (near, far) = SUSTAIN_DUCK_GAP;
    let flyer_overhead = observation
        .obstacles
        .iter()
        .filter(|o| o.kind == ObstacleKind::FlyerHigh)
        .map(|o| observation.agent.gap_to(o))
        .any(|gap| near < gap && gap < far);
    Action {
        duck: flyer_overhead,
        ..action
    }
}

#[cfg(test)]
mod tests {
    use dinoga_engine::{AgentState, Obstacle, SimulatedGame, SimulationParams};
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;
    use crate::policy::MutationParams;

    const PARAMS: MutationParams = MutationParams {
        rate: 0.1,
        scale: 0.2,
    };

    /// Scores one point per step and ends after a fixed number of steps.
    #[derive(Debug, Default)]
    struct ScriptedGame {
        lifetime: usize,
        steps: usize,
        restarts: usize,
        actions: Vec<Action>,
    }

    impl Environment for ScriptedGame {
        fn start(&mut self) {
            self.steps = 0;
        }

        fn observe(&mut self) -> Observation {
            observation(false, vec![])
        }

        fn apply(&mut self, action: Action) {
            self.actions.push(action);
            self.steps += 1;
        }

        fn is_terminal(&self) -> bool {
            self.steps >= self.lifetime
        }

        #[expect(clippy::cast_precision_loss)]
        fn score(&self) -> f64 {
            self.steps as f64
        }

        fn restart(&mut self) {
            self.restarts += 1;
            self.start();
        }
    }

    fn observation(ducking: bool, obstacles: Vec<Obstacle>) -> Observation {
        Observation {
            agent: AgentState {
                x: 50.0,
                y: 130.0,
                width: 40.0,
                height: 50.0,
                jumping: false,
                ducking,
                has_ducked_in_jump: false,
            },
            obstacles,
            speed: 6.0,
            score: 0.0,
        }
    }

    fn high_flyer_at_gap(gap: f64) -> Obstacle {
        Obstacle {
            x: 90.0 + gap,
            y: 120.0,
            width: 40.0,
            height: 30.0,
            kind: ObstacleKind::FlyerHigh,
        }
    }

    #[test]
    fn test_session_ends_when_terminal() {
        let mut game = ScriptedGame {
            lifetime: 7,
            ..ScriptedGame::default()
        };
        let policy = Policy::random(&mut Pcg32::seed_from_u64(1), PARAMS);
        let result = SessionEvaluator::new(1, 100).play_session(&mut game, &policy);
        assert_eq!(result.score, 7.0);
        assert_eq!(result.steps, 7);
        assert!(result.terminated);
        // no obstacles: every decision is a no-op
        assert!(game.actions.iter().all(|a| a.is_none()));
    }

    #[test]
    fn test_session_capped_by_max_steps() {
        let mut game = ScriptedGame {
            lifetime: usize::MAX,
            ..ScriptedGame::default()
        };
        let policy = Policy::random(&mut Pcg32::seed_from_u64(2), PARAMS);
        let result = SessionEvaluator::new(1, 25).play_session(&mut game, &policy);
        assert_eq!(result.steps, 25);
        assert!(!result.terminated);
    }

    #[test]
    fn test_fitness_is_mean_over_fresh_runs() {
        let mut game = ScriptedGame {
            lifetime: 10,
            ..ScriptedGame::default()
        };
        let policy = Policy::random(&mut Pcg32::seed_from_u64(3), PARAMS);
        let fitness = SessionEvaluator::new(3, 4).play_and_evaluate_sessions(&mut game, &policy);
        assert_eq!(fitness, 4.0);
        assert_eq!(game.restarts, 3);
    }

    #[test]
    fn test_population_scores_align_with_members() {
        let mut rng = Pcg32::seed_from_u64(4);
        let population = Population::random(4, &mut rng, PARAMS);
        let mut game = SimulatedGame::with_seed(SimulationParams::default(), 9);
        let fitness = SessionEvaluator::new(2, 300).evaluate_population(&mut game, &population);
        assert_eq!(fitness.len(), 4);
        assert!(fitness.iter().all(|f| f.is_finite() && *f >= 0.0));
    }

    #[test]
    fn test_duck_sustained_under_high_flyer() {
        let obs = observation(true, vec![high_flyer_at_gap(20.0)]);
        assert_eq!(sustain_duck(&obs, Action::NONE), Action::duck());
    }

    #[test]
    fn test_sustained_duck_keeps_jump_flag() {
        let obs = observation(true, vec![high_flyer_at_gap(20.0)]);
        assert_eq!(
            sustain_duck(&obs, Action::jump()),
            Action {
                jump: true,
                duck: true
            }
        );
    }

    #[test]
    fn test_duck_released_when_flyer_out_of_range() {
        for gap in [-50.0, 150.0, 400.0] {
            let obs = observation(true, vec![high_flyer_at_gap(gap)]);
            assert_eq!(sustain_duck(&obs, Action::NONE), Action::NONE);
        }
    }

    #[test]
    fn test_sustain_ignores_other_obstacles_and_standing_agent() {
        let mut low = high_flyer_at_gap(20.0);
        low.kind = ObstacleKind::FlyerLow;
        let obs = observation(true, vec![low]);
        assert_eq!(sustain_duck(&obs, Action::NONE), Action::NONE);

        let obs = observation(false, vec![high_flyer_at_gap(20.0)]);
        assert_eq!(sustain_duck(&obs, Action::NONE), Action::NONE);
        assert_eq!(sustain_duck(&obs, Action::jump()), Action::jump());
    }
}
