//! Metropolis-within-Gibbs sweeps over unfixed patches.
//!
//! One sweep visits every patch in the working set and attempts, in order:
//! a **move** proposal for each existing item, one **birth** proposal, and
//! one **death** proposal.  Acceptance compares `ln(u)`, `u ∈ (0, 1]`,
//! against the change in MRF log-density; birth and death additionally carry
//! the forward/reverse proposal densities so the chain targets the intended
//! distribution.
//!
//! # Quadrant sub-neighborhoods
//!
//! A proposal at a cell only needs pairwise terms against items within
//! interaction range, and the range is bounded by the energy cache's
//! displacement table.  Following the cell's quadrant within its patch, the
//! scan is restricted to the patch itself plus the three materialized
//! neighbors nearest that quadrant — half the 3×3 ring — which is equivalent
//! to the full ring for in-range kernels and skips the far half.

use gw_core::{ItemTypeId, Position, WorldRng};

use crate::cache::EnergyCache;
use crate::item::Item;
use crate::store::PatchStore;

/// Lightweight copy of a neighbor item used during energy sums.
type NeighborItem = (Position, ItemTypeId);

/// A sampler over a fixed working set of (unfixed) patch coordinates.
///
/// Constructed per materialization event; the working set and the store's
/// set of materialized patches must not change between sweeps.
pub struct GibbsSampler<'a> {
    cache:     &'a EnergyCache,
    positions: &'a [Position],
    n:         u32,
}

/// Snapshot of the items in the patches bordering one quadrant.
struct QuadrantItems {
    bottom_left:  Vec<NeighborItem>,
    top_left:     Vec<NeighborItem>,
    bottom_right: Vec<NeighborItem>,
    top_right:    Vec<NeighborItem>,
}

impl QuadrantItems {
    fn gather(store: &PatchStore, patch_position: Position) -> QuadrantItems {
        let collect = |coords: [Position; 3]| -> Vec<NeighborItem> {
            let mut out = Vec::new();
            for coord in coords {
                if let Some(patch) = store.get_if_exists(coord) {
                    out.extend(patch.items.iter().map(|i| (i.position, i.item_type)));
                }
            }
            out
        };
        let p = patch_position;
        QuadrantItems {
            bottom_left:  collect([p.left(), p.down(), p.down().left()]),
            top_left:     collect([p.left(), p.up(), p.up().left()]),
            bottom_right: collect([p.right(), p.down(), p.down().right()]),
            top_right:    collect([p.right(), p.up(), p.up().right()]),
        }
    }

    /// The neighbor snapshot covering the quadrant of `cell` within the
    /// patch whose bottom-left world cell is `origin`.
    fn for_cell(&self, cell: Position, origin: Position, n: u32) -> &[NeighborItem] {
        let half = (n / 2) as i64;
        let left = cell.x - origin.x < half;
        let bottom = cell.y - origin.y < half;
        match (left, bottom) {
            (true, true)   => &self.bottom_left,
            (true, false)  => &self.top_left,
            (false, true)  => &self.bottom_right,
            (false, false) => &self.top_right,
        }
    }
}

impl<'a> GibbsSampler<'a> {
    pub fn new(cache: &'a EnergyCache, positions: &'a [Position], n: u32) -> GibbsSampler<'a> {
        GibbsSampler { cache, positions, n }
    }

    /// Run one sweep over the working set.
    pub fn sweep(&self, store: &mut PatchStore, rng: &mut WorldRng) {
        for &patch_position in self.positions {
            self.sample_patch(store, patch_position, rng);
        }
    }

    fn sample_patch(&self, store: &mut PatchStore, patch_position: Position, rng: &mut WorldRng) {
        if self.cache.type_count() == 0 {
            return; // nothing can be born into an empty catalogue
        }
        let n = self.n;
        let origin = patch_position.patch_origin(n);

        // Exclusive access to the patch's items for the duration of its
        // proposals; neighbor items are snapshotted by quadrant.
        let mut items = store.take_items(patch_position);
        let quadrants = QuadrantItems::gather(store, patch_position);

        // ── Move proposals, one per existing item ─────────────────────────
        for index in 0..items.len() {
            let item_type = items[index].item_type;
            let old_position = items[index].position;
            let new_position =
                origin + Position::new(rng.below(n) as i64, rng.below(n) as i64);

            let new_neighbors = quadrants.for_cell(new_position, origin, n);
            let Some(gained) =
                self.pair_energy(new_position, item_type, new_neighbors, &items)
            else {
                continue; // destination occupied
            };

            let old_neighbors = quadrants.for_cell(old_position, origin, n);
            let lost = self
                .pair_energy_unchecked(old_position, item_type, old_neighbors, &items);

            let log_acceptance = gained - lost
                + self.cache.intensity(new_position, item_type)
                - self.cache.intensity(old_position, item_type);

            if (rng.unit() as f32).ln() < log_acceptance {
                items[index].position = new_position;
            }
        }

        // ── Birth proposal ────────────────────────────────────────────────
        let type_count = self.cache.type_count() as u32;
        let item_type = ItemTypeId(rng.below(type_count));
        let birth_position =
            origin + Position::new(rng.below(n) as i64, rng.below(n) as i64);

        let cells = (n as f32) * (n as f32);
        let count = items.len() as f32;
        if let Some(gained) = self.pair_energy(
            birth_position,
            item_type,
            quadrants.for_cell(birth_position, origin, n),
            &items,
        ) && cells > count
        {
            let log_acceptance = gained
                + self.cache.intensity(birth_position, item_type)
                // reverse proposal: delete one of (count + 1) items
                + (-(count + 1.0).ln())
                // forward proposal: pick this type and one of the free cells
                - (-(type_count as f32).ln() - (cells - count).ln());

            if (rng.unit() as f32).ln() < log_acceptance {
                items.push(Item::sampled(item_type, birth_position));
            }
        }

        // ── Death proposal ────────────────────────────────────────────────
        if !items.is_empty() {
            let index = rng.below(items.len() as u32) as usize;
            let victim_type = items[index].item_type;
            let victim_position = items[index].position;
            let count = items.len() as f32;

            let lost = self.pair_energy_unchecked(
                victim_position,
                victim_type,
                quadrants.for_cell(victim_position, origin, n),
                &items,
            );

            let log_acceptance = -lost
                - self.cache.intensity(victim_position, victim_type)
                // reverse proposal: pick this type and one of the freed cells
                + (-(type_count as f32).ln() - (cells - count + 1.0).ln())
                // forward proposal: delete one of `count` items
                - (-count.ln());

            if (rng.unit() as f32).ln() < log_acceptance {
                items.swap_remove(index);
            }
        }

        store.put_items(patch_position, items);
    }

    /// Bidirectional pairwise energy of a candidate `(cell, item_type)`
    /// against the quadrant snapshot and the patch's own items.  Returns
    /// `None` if the cell is already occupied by any record.
    fn pair_energy(
        &self,
        cell: Position,
        item_type: ItemTypeId,
        neighbors: &[NeighborItem],
        local: &[Item],
    ) -> Option<f32> {
        let mut total = 0.0f32;
        for &(other_pos, other_type) in neighbors {
            if other_pos == cell {
                return None;
            }
            total += self.cache.interaction(cell, other_pos, item_type, other_type);
            total += self.cache.interaction(other_pos, cell, other_type, item_type);
        }
        for item in local {
            if item.position == cell {
                return None;
            }
            total += self
                .cache
                .interaction(cell, item.position, item_type, item.item_type);
            total += self
                .cache
                .interaction(item.position, cell, item.item_type, item_type);
        }
        Some(total)
    }

    /// Like [`GibbsSampler::pair_energy`], but for a cell that legitimately
    /// holds an item (the self-pair contributes 0 through the cache).
    fn pair_energy_unchecked(
        &self,
        cell: Position,
        item_type: ItemTypeId,
        neighbors: &[NeighborItem],
        local: &[Item],
    ) -> f32 {
        let mut total = 0.0f32;
        for &(other_pos, other_type) in neighbors {
            total += self.cache.interaction(cell, other_pos, item_type, other_type);
            total += self.cache.interaction(other_pos, cell, other_type, item_type);
        }
        for item in local {
            total += self
                .cache
                .interaction(cell, item.position, item_type, item.item_type);
            total += self
                .cache
                .interaction(item.position, cell, item.item_type, item_type);
        }
        total
    }
}
