//! The operation result kind shared between the kernel and the wire.
//!
//! Every public simulator operation resolves to a `Status`; the server
//! transmits it verbatim in responses and the client surfaces it to callers.
//! Internal plumbing uses richer per-crate error enums and converts at the
//! boundary.

use std::io::{Read, Write};

use crate::codec::{Decode, Encode, invalid_data};

/// Result kind for simulator operations.  Wire codes are stable.
#[derive(Copy, Clone, PartialEq, Eq, Debug, thiserror::Error)]
#[repr(u8)]
pub enum Status {
    #[error("ok")]
    Ok = 0,

    #[error("out of memory")]
    OutOfMemory = 1,

    /// The agent ID does not exist, or the requester does not own it.
    #[error("invalid agent id")]
    InvalidAgentId = 2,

    /// Missing permission bit, or the action's policy is `Disallowed`.
    #[error("violated permissions")]
    ViolatedPermissions = 3,

    /// Turn barrier: the agent already has a queued action this turn.
    #[error("agent already acted this turn")]
    AgentAlreadyActed = 4,

    /// Reconnection edge case: the agent is already attached elsewhere.
    #[error("agent already exists")]
    AgentAlreadyExists = 5,

    #[error("server failed to parse message")]
    ServerParseMessageError = 6,

    #[error("client failed to parse message")]
    ClientParseMessageError = 7,

    #[error("server out of memory")]
    ServerOutOfMemory = 8,

    #[error("client out of memory")]
    ClientOutOfMemory = 9,

    /// Persistence read/write failure.
    #[error("i/o error")]
    IoError = 10,

    /// Surfaced to client code by the lost-connection callback.
    #[error("lost connection to server")]
    LostConnection = 11,

    /// Configuration failed validation.
    #[error("invalid simulator configuration")]
    InvalidConfiguration = 12,

    /// The semaphore ID does not exist, or the requester does not own it.
    #[error("invalid semaphore id")]
    InvalidSemaphoreId = 13,
}

impl Status {
    #[inline]
    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }

    /// Fold a `Status` into a `Result` for `?`-style call sites.
    #[inline]
    pub fn into_result(self) -> Result<(), Status> {
        if self.is_ok() { Ok(()) } else { Err(self) }
    }

    pub fn from_wire(code: u8) -> Option<Status> {
        use Status::*;
        Some(match code {
            0 => Ok,
            1 => OutOfMemory,
            2 => InvalidAgentId,
            3 => ViolatedPermissions,
            4 => AgentAlreadyActed,
            5 => AgentAlreadyExists,
            6 => ServerParseMessageError,
            7 => ClientParseMessageError,
            8 => ServerOutOfMemory,
            9 => ClientOutOfMemory,
            10 => IoError,
            11 => LostConnection,
            12 => InvalidConfiguration,
            13 => InvalidSemaphoreId,
            _ => return None,
        })
    }
}

impl Encode for Status {
    fn encode<W: Write + ?Sized>(&self, out: &mut W) -> std::io::Result<()> {
        (*self as u8).encode(out)
    }
}

impl Decode for Status {
    fn decode<R: Read + ?Sized>(input: &mut R) -> std::io::Result<Self> {
        let code = u8::decode(input)?;
        Status::from_wire(code).ok_or_else(|| invalid_data("bad status code"))
    }
}
