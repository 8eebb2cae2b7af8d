use gw_core::Status;
use gw_proto::Opcode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wire protocol error: {0}")]
    Proto(#[from] gw_proto::ProtoError),

    /// The server answered with a non-OK status.
    #[error("server refused: {0}")]
    Refused(Status),

    /// The connection died while a request was in flight.
    #[error("lost connection to server")]
    Lost,

    /// Another request on the same opcode is already awaiting its response.
    #[error("a {0:?} request is already in flight")]
    Busy(Opcode),

    #[error("server rejected the handshake: {0}")]
    HandshakeRejected(Status),
}

pub type ClientResult<T> = Result<T, ClientError>;
