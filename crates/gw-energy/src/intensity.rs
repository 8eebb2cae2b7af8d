//! Intensity kernels — an item type's standalone log-density at a position.

use gw_core::Position;

use crate::hashing::{bucket_frac, bucket_hash};
use crate::{EnergyError, EnergyResult};

/// How strongly an item type wants to appear at a given position,
/// independent of any other item.
///
/// All variants except the hash-modulated one are *stationary* (translation
/// invariant); stationary intensities are evaluated once and cached.
#[derive(Clone, PartialEq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensityKernel {
    /// Log-density 0 everywhere.
    Zero,

    /// The same log-density everywhere.  Negative values make a type rare;
    /// around -2 to -5 is the useful range for sparse worlds.
    Constant { value: f32 },

    /// Concentric pseudo-random rings: the radial distance is hashed in
    /// buckets of `scale` cells and linearly interpolated between adjacent
    /// buckets, producing smooth ring-shaped abundance bands.
    RadialHash {
        shift:  u32,
        scale:  u32,
        offset: f32,
        weight: f32,
    },
}

impl IntensityKernel {
    /// Evaluate the log-density contribution at `pos`.
    pub fn value_at(&self, pos: Position) -> f32 {
        match *self {
            IntensityKernel::Zero => 0.0,
            IntensityKernel::Constant { value } => value,
            IntensityKernel::RadialHash { shift, scale, offset, weight } => {
                let radius = (pos.squared_length() as f64).sqrt() as u32;
                let s = radius.wrapping_add(shift);
                let here = bucket_hash(s, shift, scale);
                let next = bucket_hash(s.wrapping_add(scale), shift, scale);
                let t = bucket_frac(s, scale);
                offset - (here * (1.0 - t) + next * t) * weight
            }
        }
    }

    /// `true` if the value does not depend on position.
    #[inline]
    pub fn is_stationary(&self) -> bool {
        matches!(self, IntensityKernel::Zero | IntensityKernel::Constant { .. })
    }

    // ── Tag/parameter serialization ───────────────────────────────────────

    pub fn tag(&self) -> u64 {
        match self {
            IntensityKernel::Zero => 0,
            IntensityKernel::Constant { .. } => 1,
            IntensityKernel::RadialHash { .. } => 2,
        }
    }

    pub fn args(&self) -> Vec<f32> {
        match *self {
            IntensityKernel::Zero => vec![],
            IntensityKernel::Constant { value } => vec![value],
            IntensityKernel::RadialHash { shift, scale, offset, weight } => {
                vec![shift as f32, scale as f32, offset, weight]
            }
        }
    }

    /// Reconstruct from a serialized `(tag, args)` pair, validating arity.
    pub fn from_tag_args(tag: u64, args: &[f32]) -> EnergyResult<IntensityKernel> {
        let arity = |expected: usize, kernel: &'static str| {
            if args.len() == expected {
                Ok(())
            } else {
                Err(EnergyError::WrongArity { kernel, expected, got: args.len() })
            }
        };
        match tag {
            0 => {
                arity(0, "zero intensity")?;
                Ok(IntensityKernel::Zero)
            }
            1 => {
                arity(1, "constant intensity")?;
                Ok(IntensityKernel::Constant { value: args[0] })
            }
            2 => {
                arity(4, "radial-hash intensity")?;
                Ok(IntensityKernel::RadialHash {
                    shift:  args[0] as u32,
                    scale:  args[1] as u32,
                    offset: args[2],
                    weight: args[3],
                })
            }
            other => Err(EnergyError::UnknownTag(other)),
        }
    }
}
