//! `gw-server` — many remote clients, one authoritative world.
//!
//! The server listens on TCP, frames messages with `gw-proto`, and lets
//! each connected client own a disjoint set of agents and semaphores.  A
//! listener thread accepts connections and feeds a readiness queue; a
//! fixed pool of workers pulls connections off the queue, reads one frame,
//! dispatches it against the simulator, writes the response, and requeues
//! the connection.  Step events fan out to every connection, serialized
//! behind per-connection send locks.
//!
//! Client identity is persistent: the first handshake allocates a
//! `ClientId`, and a client that loses its socket can reconnect with the
//! same id to reclaim its agents (which stay in the world, orphaned, in
//! the meantime).

pub mod dispatch;
pub mod error;
pub mod permissions;
pub mod record;
pub mod server;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{ServerError, ServerResult};
pub use permissions::Permissions;
pub use record::ClientRecord;
pub use server::{Server, ServerConfig};
