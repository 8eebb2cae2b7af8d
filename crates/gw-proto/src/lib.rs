//! `gw-proto` — the wire protocol.
//!
//! Every message is framed as `{u64 payload_length, u64 opcode, payload}`,
//! all integers little-endian, floats in IEEE-754 bit order.  A request and
//! its response share the opcode; the server-initiated step broadcast has
//! its own.  Payload shapes are fixed per opcode and hand-framed with the
//! codec primitives from `gw-core` — both ends of a deployment run the same
//! configuration, so dimension-dependent buffers (scent, vision, patch
//! grids) travel raw, without per-message shape headers.

pub mod frame;
pub mod message;
pub mod opcode;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use frame::{MAX_PAYLOAD_BYTES, read_frame, write_frame};
pub use message::{
    AddAgentResponse, AddSemaphoreResponse, GetAgentIdsResponse, GetAgentStatesRequest,
    GetAgentStatesResponse, GetMapRequest, GetMapResponse, GetSemaphoresResponse,
    HandshakeRequest, HandshakeResponse, IsActiveResponse, MoveRequest, ProtoDims,
    SemaphoreRequest, SetActiveRequest, SingleAgentRequest, StatusResponse, StepBroadcast,
    TurnRequest,
};
pub use opcode::Opcode;

/// Protocol version carried in the handshake.  Bump on any wire change.
pub const PROTOCOL_VERSION: u32 = 1;

/// Errors raised while framing or parsing messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    #[error("i/o failure on the wire: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown opcode {0}")]
    BadOpcode(u64),

    #[error("frame payload of {0} bytes exceeds the cap")]
    FrameTooLarge(u64),
}

pub type ProtoResult<T> = Result<T, ProtoError>;
