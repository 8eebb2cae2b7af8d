use gw_core::rng::ParseRngError;
use gw_energy::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("configuration rejected: {0}")]
    Config(#[from] ConfigError),

    #[error("persistence i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("persisted rng state unreadable: {0}")]
    Rng(#[from] ParseRngError),

    #[error("saved world has {saved} item types but the configuration has {configured}")]
    CatalogueMismatch { saved: usize, configured: usize },

    #[error("saved world kernel tags do not match the configuration: {0}")]
    Kernel(#[from] gw_energy::EnergyError),

    #[error("saved world patch geometry ({saved_n}) does not match the configuration ({configured_n})")]
    GeometryMismatch { saved_n: u32, configured_n: u32 },
}

pub type SimResult<T> = Result<T, SimError>;
