//! `gw-client` — talk to a remote simulator over one TCP connection.
//!
//! The client is synchronous: each request sends one frame and parks the
//! calling thread on a per-opcode wait slot until the background
//! response-listener thread delivers the matching response.  Distinct
//! opcodes may be awaited concurrently from different threads; a second
//! in-flight request on the *same* opcode is refused.
//!
//! Server-initiated frames (step broadcasts, connection loss) are routed to
//! a caller-provided [`ClientHandler`] from the listener thread.  Handlers
//! may call back into the client (for example, to submit the next action
//! from `on_step`) — the client holds no locks while invoking them.

pub mod client;
pub mod error;
pub mod handler;
pub mod waiters;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use client::{Client, ConnectionInfo};
pub use error::{ClientError, ClientResult};
pub use handler::ClientHandler;
