//! `gw-energy` — the item-type catalogue and its MRF energy kernels.
//!
//! Terrain is realized from a Markov Random Field whose log-density combines
//! a per-item-type **intensity** (how common a type is, and where) with
//! pairwise **interactions** (attraction/repulsion between item placements).
//! Both kinds of kernel are closed tagged enumerations with plain `f32`
//! parameters, so a catalogue serializes as tags plus parameter arrays and
//! reconstructs on load.
//!
//! The simulator configuration also lives here: it is mostly the catalogue,
//! plus the scalar knobs the kernel reads (patch size, diffusion constants,
//! action policies).  [`SimulatorConfig::validate`] is the single gate that
//! turns a malformed configuration into `Status::InvalidConfiguration`.

pub mod config;
pub mod intensity;
pub mod interaction;
pub mod item;

mod hashing;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{ConfigError, SimulatorConfig};
pub use intensity::IntensityKernel;
pub use interaction::InteractionKernel;
pub use item::ItemType;

/// Error raised when reconstructing a kernel from its serialized tag and
/// parameter array.
#[derive(Debug, thiserror::Error)]
pub enum EnergyError {
    #[error("{kernel} kernel takes {expected} parameters, got {got}")]
    WrongArity {
        kernel:   &'static str,
        expected: usize,
        got:      usize,
    },

    #[error("unknown kernel tag {0}")]
    UnknownTag(u64),
}

pub type EnergyResult<T> = Result<T, EnergyError>;
