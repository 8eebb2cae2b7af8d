use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wire protocol error: {0}")]
    Proto(#[from] gw_proto::ProtoError),

    #[error("simulator error: {0}")]
    Sim(#[from] gw_sim::SimError),

    #[error("server is not running")]
    NotRunning,
}

pub type ServerResult<T> = Result<T, ServerError>;
