//! Interaction kernels — the pairwise log-density between two items.

use gw_core::Position;

use crate::hashing::{bucket_frac, bucket_hash};
use crate::{EnergyError, EnergyResult};

/// Pairwise log-density contribution between an item at `pos1` and an item
/// at `pos2`, directional from the first type to the second.
///
/// All variants except `CrossHash` are *stationary* — they depend only on
/// `pos1 − pos2` — and are tabulated over the displacement grid by the
/// sampler's energy cache.  `Zero` is additionally *constant* and skipped
/// outright.
#[derive(Clone, PartialEq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKernel {
    /// No interaction.
    Zero,

    /// Two concentric squared-distance bands: `first_value` inside
    /// `first_cutoff`, `second_value` between the cutoffs, 0 beyond.
    /// A positive near value with a negative far value yields clustering
    /// with inhibition (item piles spaced apart from each other).
    PiecewiseBox {
        first_cutoff:  f32,
        second_cutoff: f32,
        first_value:   f32,
        second_value:  f32,
    },

    /// Chebyshev-distance bands that distinguish axis-aligned from diagonal
    /// displacement, producing cross/plus-shaped structures.
    Cross {
        near_cutoff:   f32,
        far_cutoff:    f32,
        axis_near:     f32,
        axis_far:      f32,
        diagonal_near: f32,
        diagonal_far:  f32,
    },

    /// `Cross` whose cutoffs are modulated by a hash of the first item's
    /// x-coordinate — crosses of pseudo-random size.  Not stationary.
    CrossHash {
        scale:         u32,
        base:          f32,
        amplitude:     f32,
        band_width:    f32,
        axis_near:     f32,
        axis_far:      f32,
        diagonal_near: f32,
        diagonal_far:  f32,
    },
}

/// Shared band selection for the cross-shaped kernels.
#[inline]
fn cross_bands(
    diff: Position,
    near_cutoff: f32,
    far_cutoff: f32,
    values: [f32; 4],
) -> f32 {
    let dist = diff.chebyshev(Position::ORIGIN) as f32;
    let on_axis = diff.x == 0 || diff.y == 0;
    let [axis_near, axis_far, diagonal_near, diagonal_far] = values;
    if dist <= near_cutoff {
        if on_axis { axis_near } else { diagonal_near }
    } else if dist <= far_cutoff {
        if on_axis { axis_far } else { diagonal_far }
    } else {
        0.0
    }
}

impl InteractionKernel {
    /// Evaluate the pairwise log-density contribution.
    ///
    /// Callers are responsible for excluding the self-pair (`pos1 == pos2`);
    /// the sampler's cache stores 0 on the displacement-table diagonal.
    pub fn value_between(&self, pos1: Position, pos2: Position) -> f32 {
        match *self {
            InteractionKernel::Zero => 0.0,

            InteractionKernel::PiecewiseBox {
                first_cutoff,
                second_cutoff,
                first_value,
                second_value,
            } => {
                let sq = (pos1 - pos2).squared_length() as f32;
                if sq < first_cutoff {
                    first_value
                } else if sq < second_cutoff {
                    second_value
                } else {
                    0.0
                }
            }

            InteractionKernel::Cross {
                near_cutoff,
                far_cutoff,
                axis_near,
                axis_far,
                diagonal_near,
                diagonal_far,
            } => cross_bands(
                pos1 - pos2,
                near_cutoff,
                far_cutoff,
                [axis_near, axis_far, diagonal_near, diagonal_far],
            ),

            InteractionKernel::CrossHash {
                scale,
                base,
                amplitude,
                band_width,
                axis_near,
                axis_far,
                diagonal_near,
                diagonal_far,
            } => {
                let x = pos1.x as u32;
                let here = bucket_hash(x, 0, scale);
                let next = bucket_hash(x.wrapping_add(scale), 0, scale);
                let t = bucket_frac(x, scale);
                let near_cutoff = amplitude * (here * (1.0 - t) + next * t) + base;
                let far_cutoff = near_cutoff + band_width;
                cross_bands(
                    pos1 - pos2,
                    near_cutoff,
                    far_cutoff,
                    [axis_near, axis_far, diagonal_near, diagonal_far],
                )
            }
        }
    }

    /// `true` if the value depends only on the displacement `pos1 − pos2`.
    #[inline]
    pub fn is_stationary(&self) -> bool {
        !matches!(self, InteractionKernel::CrossHash { .. })
    }

    /// `true` for the identically-zero kernel, which the sampler skips.
    #[inline]
    pub fn is_zero(&self) -> bool {
        matches!(self, InteractionKernel::Zero)
    }

    // ── Tag/parameter serialization ───────────────────────────────────────

    pub fn tag(&self) -> u64 {
        match self {
            InteractionKernel::Zero => 0,
            InteractionKernel::PiecewiseBox { .. } => 1,
            InteractionKernel::Cross { .. } => 2,
            InteractionKernel::CrossHash { .. } => 3,
        }
    }

    pub fn args(&self) -> Vec<f32> {
        match *self {
            InteractionKernel::Zero => vec![],
            InteractionKernel::PiecewiseBox {
                first_cutoff,
                second_cutoff,
                first_value,
                second_value,
            } => vec![first_cutoff, second_cutoff, first_value, second_value],
            InteractionKernel::Cross {
                near_cutoff,
                far_cutoff,
                axis_near,
                axis_far,
                diagonal_near,
                diagonal_far,
            } => vec![near_cutoff, far_cutoff, axis_near, axis_far, diagonal_near, diagonal_far],
            InteractionKernel::CrossHash {
                scale,
                base,
                amplitude,
                band_width,
                axis_near,
                axis_far,
                diagonal_near,
                diagonal_far,
            } => vec![
                scale as f32,
                base,
                amplitude,
                band_width,
                axis_near,
                axis_far,
                diagonal_near,
                diagonal_far,
            ],
        }
    }

    /// Reconstruct from a serialized `(tag, args)` pair, validating arity.
    pub fn from_tag_args(tag: u64, args: &[f32]) -> EnergyResult<InteractionKernel> {
        let arity = |expected: usize, kernel: &'static str| {
            if args.len() == expected {
                Ok(())
            } else {
                Err(EnergyError::WrongArity { kernel, expected, got: args.len() })
            }
        };
        match tag {
            0 => {
                arity(0, "zero interaction")?;
                Ok(InteractionKernel::Zero)
            }
            1 => {
                arity(4, "piecewise-box interaction")?;
                Ok(InteractionKernel::PiecewiseBox {
                    first_cutoff:  args[0],
                    second_cutoff: args[1],
                    first_value:   args[2],
                    second_value:  args[3],
                })
            }
            2 => {
                arity(6, "cross interaction")?;
                Ok(InteractionKernel::Cross {
                    near_cutoff:   args[0],
                    far_cutoff:    args[1],
                    axis_near:     args[2],
                    axis_far:      args[3],
                    diagonal_near: args[4],
                    diagonal_far:  args[5],
                })
            }
            3 => {
                arity(8, "cross-hash interaction")?;
                Ok(InteractionKernel::CrossHash {
                    scale:         args[0] as u32,
                    base:          args[1],
                    amplitude:     args[2],
                    band_width:    args[3],
                    axis_near:     args[4],
                    axis_far:      args[5],
                    diagonal_near: args[6],
                    diagonal_far:  args[7],
                })
            }
            other => Err(EnergyError::UnknownTag(other)),
        }
    }
}
