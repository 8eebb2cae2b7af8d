//! `gw-sim` — the authoritative simulator kernel.
//!
//! The world advances in discrete turns.  Within a turn every *active* agent
//! submits exactly one action (move / turn / no-op); once the last active
//! agent has acted **and** every semaphore has been signaled, the submitting
//! thread runs the timestep synchronously: moves are resolved against the
//! collision policy, collected items are tombstoned, expired tombstones are
//! purged, scent diffuses, every agent's observations are rebuilt, time is
//! committed, and the registered step observer is notified.
//!
//! All world state sits behind one coarse [`parking_lot::Mutex`]; the step
//! observer fires after the lock is released, so callbacks may re-enter the
//! simulator freely.
//!
//! # Module map
//!
//! | Module        | Contents                                              |
//! |---------------|-------------------------------------------------------|
//! | [`agent`]     | `AgentState`, requested actions                       |
//! | [`registry`]  | insertion-ordered agent/semaphore registries          |
//! | [`collision`] | per-destination move-conflict resolution              |
//! | [`scent`]     | the per-patch diffusion pass                          |
//! | [`vision`]    | FOV cone + occlusion ray march                        |
//! | [`sim`]       | `Simulator`, the turn barrier, `advance_timestep`     |
//! | [`observer`]  | `StepObserver` / `StepEvent`                          |
//! | [`persist`]   | stream save/load of the whole world                   |

pub mod agent;
pub mod collision;
pub mod error;
pub mod observer;
pub mod persist;
pub mod registry;
pub mod scent;
pub mod sim;
pub mod vision;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use agent::{AgentState, RequestedAction};
pub use error::{SimError, SimResult};
pub use observer::{NoopObserver, StepEvent, StepObserver};
pub use registry::{AgentRegistry, Semaphore, SemaphoreRegistry};
pub use sim::{PatchSnapshot, Simulator};
