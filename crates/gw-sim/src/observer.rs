//! Step notification.

use gw_core::SimTime;

use crate::agent::AgentState;

/// Snapshot handed to the step observer after each committed turn.
///
/// Carries the post-commit state of every agent (in registry insertion
/// order); the server layer filters it down to each client's owned agents
/// when broadcasting.
pub struct StepEvent {
    /// The just-committed time (the world is now *at* this step).
    pub time: SimTime,

    /// Post-step state of every agent, insertion order.
    pub agents: Vec<AgentState>,
}

/// Callback invoked after each committed turn.
///
/// The simulator fires observers from the thread that closed the turn,
/// *after* releasing the world lock — observers may call back into the
/// simulator freely (e.g. to queue the next action).
pub trait StepObserver: Send + Sync {
    fn on_step(&self, event: &StepEvent);
}

/// A [`StepObserver`] that does nothing.
pub struct NoopObserver;

impl StepObserver for NoopObserver {
    fn on_step(&self, _event: &StepEvent) {}
}

impl<F: Fn(&StepEvent) + Send + Sync> StepObserver for F {
    fn on_step(&self, event: &StepEvent) {
        self(event)
    }
}
