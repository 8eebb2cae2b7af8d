//! Item-type records.

use crate::{IntensityKernel, InteractionKernel};

/// Immutable description of one item type.  The catalogue (a `Vec<ItemType>`
/// in the configuration) is fixed at construction; items refer to their type
/// by index.
#[derive(Clone, PartialEq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct ItemType {
    /// Display name ("banana", "wall", …).
    pub name: String,

    /// Scent emitted per timestep, length `scent_dim`.
    pub scent: Vec<f32>,

    /// Rendered color, length `color_dim`.
    pub color: Vec<f32>,

    /// Minimum `collected_counts` (per type) an agent must hold to collect
    /// an item of this type.  All zeros = freely collectible.
    pub required_item_counts: Vec<u32>,

    /// `collected_counts` deducted (per type) when an item of this type is
    /// collected.
    pub required_item_costs: Vec<u32>,

    /// Agents cannot enter a cell holding a live item of this type.
    pub blocks_movement: bool,

    /// Fraction of light absorbed when a vision ray crosses this item,
    /// in `[0, 1]`.  Only meaningful together with `blocks_movement`-style
    /// obstacles, but any item may occlude.
    pub visual_occlusion: f32,

    /// Standalone placement log-density.
    pub intensity: IntensityKernel,

    /// Pairwise placement log-density toward every item type (indexed by
    /// item-type id; length = catalogue size).
    pub interactions: Vec<InteractionKernel>,
}

impl ItemType {
    /// `true` if this type never needs pairwise energy evaluation.
    pub fn interactions_all_zero(&self) -> bool {
        self.interactions.iter().all(InteractionKernel::is_zero)
    }
}
