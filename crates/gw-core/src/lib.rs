//! `gw-core` — foundational types for the gridworld simulator.
//!
//! This crate is a dependency of every other `gw-*` crate.  It intentionally
//! has no `gw-*` dependencies and minimal external ones (`rand`, `thiserror`,
//! `byteorder`, `serde`).
//!
//! # What lives here
//!
//! | Module       | Contents                                                 |
//! |--------------|----------------------------------------------------------|
//! | [`ids`]      | `AgentId`, `SemaphoreId`, `ClientId`, `ItemTypeId`       |
//! | [`position`] | `Position`, patch↔world conversion, `BoundingBox`        |
//! | [`action`]   | `Direction`, `TurnDirection`, policies                   |
//! | [`time`]     | `SimTime`                                                |
//! | [`rng`]      | `WorldRng` — deterministic Lehmer generator              |
//! | [`status`]   | `Status` — the operation result kind shared with the wire|
//! | [`codec`]    | `Encode`/`Decode` — little-endian stream primitives      |

pub mod action;
pub mod codec;
pub mod ids;
pub mod position;
pub mod rng;
pub mod status;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use action::{ActionPolicy, Direction, MoveConflictPolicy, TurnDirection};
pub use codec::{Decode, Encode};
pub use ids::{AgentId, ClientId, ItemTypeId, SemaphoreId};
pub use position::{BoundingBox, Position};
pub use rng::WorldRng;
pub use status::Status;
pub use time::SimTime;
