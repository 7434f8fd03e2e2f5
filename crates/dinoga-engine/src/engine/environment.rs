use crate::core::{Action, Observation};

/// A playable dino-runner episode.
///
/// Implementations hide how the game is actually driven (a simulator, a remote
/// browser session, ...) and normalize it to this contract:
///
/// - [`observe`](Self::observe) may be called at any time after [`start`](Self::start)
/// - jump is edge-triggered: `Action { jump: true, .. }` requests one jump
/// - duck is level-triggered: it stays held until an action with `duck: false` is applied
/// - [`score`](Self::score) never decreases while the episode is running
pub trait Environment {
    /// Begins (or resets) an episode.
    fn start(&mut self);

    /// Returns the current game state.
    fn observe(&mut self) -> Observation;

    /// Applies the jump/duck intents of one decision step.
    fn apply(&mut self, action: Action);

    /// Returns `true` once the episode has ended.
    fn is_terminal(&self) -> bool;

    /// Returns the score of the current episode.
    fn score(&self) -> f64;

    /// Ends the current episode, if any, and begins a new one with a zero score.
    fn restart(&mut self);
}

impl<E> Environment for &mut E
where
    E: Environment + ?Sized,
{
    fn start(&mut self) {
        (**self).start();
    }

    fn observe(&mut self) -> Observation {
        (**self).observe()
    }

    fn apply(&mut self, action: Action) {
        (**self).apply(action);
    }

    fn is_terminal(&self) -> bool {
        (**self).is_terminal()
    }

    fn score(&self) -> f64 {
        (**self).score()
    }

    fn restart(&mut self) {
        (**self).restart();
    }
}
