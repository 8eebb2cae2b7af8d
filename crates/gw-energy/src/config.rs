//! Simulator configuration and its validation gate.

use gw_core::{ActionPolicy, MoveConflictPolicy, Status};

use crate::ItemType;

/// Everything a world needs to be constructed.
///
/// Typically loaded from a JSON file by the application and validated once;
/// the simulator refuses to start on an invalid configuration.
#[derive(Clone, PartialEq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct SimulatorConfig {
    /// Upper bound on `steps` in a single move request.
    pub max_steps_per_movement: u32,

    /// Dimensionality of scent vectors.
    pub scent_dim: u32,

    /// Dimensionality of color vectors.
    pub color_dim: u32,

    /// Half-side of the vision window: agents see a
    /// `(2·vision_range + 1)²` square.
    pub vision_range: u32,

    /// Per-direction movement policy, indexed by `Direction as usize`.
    pub allowed_movement_directions: [ActionPolicy; 4],

    /// Per-turn rotation policy, indexed by `TurnDirection as usize`.
    pub allowed_rotations: [ActionPolicy; 4],

    /// Whether `do_nothing` is accepted.
    pub no_op_allowed: bool,

    /// Patch side length in cells (`n`).
    pub patch_size: u32,

    /// Gibbs sweep count per materialization event.
    pub mcmc_iterations: u32,

    /// The item-type catalogue.
    pub item_types: Vec<ItemType>,

    /// Color painted where an agent stands, length `color_dim`.
    pub agent_color: Vec<f32>,

    /// How simultaneous moves into one cell are resolved.
    pub collision_policy: MoveConflictPolicy,

    /// Multiplier applied to a cell's scent each timestep.
    pub scent_decay: f32,

    /// Weight of the 4-neighbor scent exchange each timestep.
    pub scent_diffusion: f32,

    /// Timesteps a collected (tombstoned) item keeps fading scent before it
    /// is physically removed.
    pub deleted_item_lifetime: u64,

    /// Total field of view in radians, centered on the facing direction.
    pub agent_field_of_view: f32,

    /// Seed for the world PRNG.  The same configuration and seed always
    /// produce the same world.
    pub random_seed: u64,
}

/// Why a configuration was rejected.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("patch_size must be an even number of cells >= 2, got {0}")]
    BadPatchSize(u32),

    #[error("scent_dim and color_dim must be nonzero")]
    ZeroDimension,

    #[error("item type {index} ({name:?}): {field} has length {got}, expected {expected}")]
    BadVectorLength {
        index:    usize,
        name:     String,
        field:    &'static str,
        got:      usize,
        expected: usize,
    },

    #[error("item type {index} ({name:?}): visual_occlusion {got} outside [0, 1]")]
    BadOcclusion { index: usize, name: String, got: f32 },

    #[error("agent_color has length {got}, expected color_dim {expected}")]
    BadAgentColor { got: usize, expected: usize },

    #[error("agent_field_of_view {0} outside (0, 2π]")]
    BadFieldOfView(f32),

    #[error("scent_decay {0} outside [0, 1]")]
    BadScentDecay(f32),

    #[error("scent_diffusion {got} must satisfy 0 <= 4·diffusion <= 1 for a stable update")]
    BadScentDiffusion { got: f32 },

    #[error("max_steps_per_movement must be nonzero")]
    ZeroMaxSteps,
}

impl From<ConfigError> for Status {
    fn from(_: ConfigError) -> Status {
        Status::InvalidConfiguration
    }
}

impl SimulatorConfig {
    /// Check every cross-field invariant.  Kernel arities are enforced by
    /// construction of the kernel enums; this validates everything else.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.patch_size < 2 || self.patch_size % 2 != 0 {
            return Err(ConfigError::BadPatchSize(self.patch_size));
        }
        if self.scent_dim == 0 || self.color_dim == 0 {
            return Err(ConfigError::ZeroDimension);
        }
        if self.max_steps_per_movement == 0 {
            return Err(ConfigError::ZeroMaxSteps);
        }

        let type_count = self.item_types.len();
        for (index, item) in self.item_types.iter().enumerate() {
            let check = |field: &'static str, got: usize, expected: usize| {
                if got == expected {
                    Ok(())
                } else {
                    Err(ConfigError::BadVectorLength {
                        index,
                        name: item.name.clone(),
                        field,
                        got,
                        expected,
                    })
                }
            };
            check("scent", item.scent.len(), self.scent_dim as usize)?;
            check("color", item.color.len(), self.color_dim as usize)?;
            check("required_item_counts", item.required_item_counts.len(), type_count)?;
            check("required_item_costs", item.required_item_costs.len(), type_count)?;
            check("interactions", item.interactions.len(), type_count)?;

            if !(0.0..=1.0).contains(&item.visual_occlusion) {
                return Err(ConfigError::BadOcclusion {
                    index,
                    name: item.name.clone(),
                    got: item.visual_occlusion,
                });
            }
        }

        if self.agent_color.len() != self.color_dim as usize {
            return Err(ConfigError::BadAgentColor {
                got:      self.agent_color.len(),
                expected: self.color_dim as usize,
            });
        }
        if !(self.agent_field_of_view > 0.0
            && self.agent_field_of_view <= 2.0 * std::f32::consts::PI)
        {
            return Err(ConfigError::BadFieldOfView(self.agent_field_of_view));
        }
        if !(0.0..=1.0).contains(&self.scent_decay) {
            return Err(ConfigError::BadScentDecay(self.scent_decay));
        }
        if !(self.scent_diffusion >= 0.0 && 4.0 * self.scent_diffusion <= 1.0) {
            return Err(ConfigError::BadScentDiffusion { got: self.scent_diffusion });
        }
        Ok(())
    }

    /// Side of the vision window in cells.
    #[inline]
    pub fn vision_side(&self) -> usize {
        (2 * self.vision_range + 1) as usize
    }

    /// Length of one agent's flattened vision buffer.
    #[inline]
    pub fn vision_len(&self) -> usize {
        self.vision_side() * self.vision_side() * self.color_dim as usize
    }

    /// Cells per patch.
    #[inline]
    pub fn cells_per_patch(&self) -> usize {
        (self.patch_size * self.patch_size) as usize
    }
}
