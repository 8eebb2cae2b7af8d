//! Server-initiated event callbacks.

use gw_proto::message::StepBroadcast;

/// Callbacks invoked from the response-listener thread.
///
/// Both default to no-ops so callers override only what they need.  The
/// client holds no locks while calling these, so a handler may re-enter the
/// client (the usual pattern queues the next action from `on_step`).
pub trait ClientHandler: Send + Sync {
    /// The world committed a turn.  Carries the new time and this client's
    /// owned agents' post-step states.
    fn on_step(&self, _broadcast: &StepBroadcast) {}

    /// The connection is gone.  In-flight requests fail with `Lost`; the
    /// client is unusable afterwards except for [`Client::client_id`]
    /// bookkeeping (reconnect by building a fresh client with that id).
    fn on_lost_connection(&self) {}
}

/// A [`ClientHandler`] that ignores everything.
pub struct NoopHandler;

impl ClientHandler for NoopHandler {}
