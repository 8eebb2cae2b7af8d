//! `gw-handle` — the adapter surface language bindings sit on.
//!
//! Bindings cannot hold Rust references, so simulators, servers, and
//! clients are exposed as opaque 64-bit handles backed by a process-local
//! registry.  Handles are allocated monotonically and never reused, which
//! makes revocation safe: operations on a destroyed handle fail with
//! `Status::InvalidAgentId`-style errors instead of touching freed memory.
//!
//! Observation accessors copy into caller-provided buffers, so the foreign
//! runtime owns every byte it sees.

pub mod registry;

#[cfg(test)]
mod tests;

pub use registry::{
    ClientHandle, HandleError, HandleResult, Registry, ServerHandle, SimulatorHandle,
};
