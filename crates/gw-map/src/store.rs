//! The patch store — hashed mapping from patch coordinate to patch record.

use rustc_hash::FxHashMap;

use gw_core::{Position, WorldRng};

use crate::patch::Patch;

/// Owns every materialized patch, keyed by patch coordinate.
///
/// Neighbor access is always by coordinate lookup — patches never hold
/// references to each other, so the mesh has no ownership cycles.
pub struct PatchStore {
    patches:   FxHashMap<Position, Patch>,
    n:         u32,
    scent_dim: u32,
    color_dim: u32,
}

impl PatchStore {
    pub fn new(n: u32, scent_dim: u32, color_dim: u32) -> PatchStore {
        PatchStore {
            patches: FxHashMap::default(),
            n,
            scent_dim,
            color_dim,
        }
    }

    /// Patch side length in cells.
    #[inline]
    pub fn n(&self) -> u32 {
        self.n
    }

    #[inline]
    pub fn scent_dim(&self) -> u32 {
        self.scent_dim
    }

    #[inline]
    pub fn color_dim(&self) -> u32 {
        self.color_dim
    }

    /// Pure lookup; never materializes.
    #[inline]
    pub fn get_if_exists(&self, patch_position: Position) -> Option<&Patch> {
        self.patches.get(&patch_position)
    }

    #[inline]
    pub fn get_mut(&mut self, patch_position: Position) -> Option<&mut Patch> {
        self.patches.get_mut(&patch_position)
    }

    #[inline]
    pub fn contains(&self, patch_position: Position) -> bool {
        self.patches.contains_key(&patch_position)
    }

    /// Number of materialized patches.
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Iterate `(coordinate, patch)` in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (Position, &Patch)> {
        self.patches.iter().map(|(&pos, patch)| (pos, patch))
    }

    /// Iterate mutably in unspecified order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Position, &mut Patch)> {
        self.patches.iter_mut().map(|(&pos, patch)| (pos, patch))
    }

    /// Coordinates of all materialized patches, sorted (deterministic order
    /// for persistence).
    pub fn sorted_positions(&self) -> Vec<Position> {
        let mut positions: Vec<Position> = self.patches.keys().copied().collect();
        positions.sort();
        positions
    }

    /// Look up a patch, creating an empty unfixed one if absent.
    ///
    /// A brand-new patch is seeded from a uniformly sampled materialized
    /// 8-neighbor when one exists: the neighbor's items are copied translated
    /// by the inter-patch offset, which gives the sampler a warm start that
    /// blends with the surrounding region instead of growing from empty.
    pub fn get_or_make(&mut self, patch_position: Position, rng: &mut WorldRng) -> &mut Patch {
        if !self.patches.contains_key(&patch_position) {
            let patch = self.make_seeded(patch_position, rng);
            self.patches.insert(patch_position, patch);
        }
        self.patches.get_mut(&patch_position).unwrap()
    }

    /// Insert a fully formed patch (persistence load path).
    pub fn insert(&mut self, patch_position: Position, patch: Patch) {
        self.patches.insert(patch_position, patch);
    }

    fn make_seeded(&self, patch_position: Position, rng: &mut WorldRng) -> Patch {
        let present: Vec<Position> = patch_position
            .neighbors8()
            .into_iter()
            .filter(|&nb| self.patches.contains_key(&nb))
            .collect();

        match rng.choose(&present) {
            None => Patch::empty(self.n, self.scent_dim, self.color_dim),
            Some(&source_pos) => {
                let source = &self.patches[&source_pos];
                let offset = (patch_position - source_pos).patch_origin(self.n);
                Patch::seeded_from(&source.items, offset, self.n, self.scent_dim, self.color_dim)
            }
        }
    }

    // ── Item borrow dance for the sampler ─────────────────────────────────
    //
    // The sampler mutates one patch's items while summing energies over the
    // neighbors' items.  Taking the item vector out of the store for the
    // duration of the patch's proposals gives it exclusive access without
    // aliasing the map.

    /// Remove and return a patch's item vector (leaves an empty vector).
    pub(crate) fn take_items(&mut self, patch_position: Position) -> Vec<crate::Item> {
        std::mem::take(&mut self.patches.get_mut(&patch_position).unwrap().items)
    }

    /// Put an item vector back after [`PatchStore::take_items`].
    pub(crate) fn put_items(&mut self, patch_position: Position, items: Vec<crate::Item>) {
        self.patches.get_mut(&patch_position).unwrap().items = items;
    }
}
