//! The lazy map generator: get-or-create-and-fix.
//!
//! `WorldMap` ties the patch store, the energy cache, the world PRNG, and
//! the sampler together behind the two entry points everything else uses:
//!
//! - [`WorldMap::fixed_neighborhood`] — materialize and fix the four patches
//!   covering an `n × n` box around a world position (the observation path).
//! - [`WorldMap::fix_region`] — materialize and fix every patch intersecting
//!   a bounding box (the get-map path).
//!
//! Fixing a patch first materializes its full 3×3 ring (seeding new patches
//! from existing neighbors), then runs `mcmc_iterations` Gibbs sweeps over
//! every not-yet-fixed patch in the gathered set, and only then sets the
//! target patches' `fixed` flags.  Because the interaction kernels are
//! bounded to the cache's displacement range, a patch whose whole ring has
//! been visited by the sampler can be frozen without ever biasing later
//! regions — this is what keeps generation order-independent.

use gw_core::{BoundingBox, Position, WorldRng};
use gw_energy::ItemType;

use crate::cache::EnergyCache;
use crate::gibbs::GibbsSampler;
use crate::item::Item;
use crate::patch::Patch;
use crate::store::PatchStore;

/// The four patches covering an `n × n` box centered at a query position,
/// in row-major order, plus which of them contains the query.
#[derive(Copy, Clone, Debug)]
pub struct Neighborhood {
    pub patch_positions: [Position; 4],
    /// Index into `patch_positions` of the patch containing the query.
    pub containing: usize,
}

/// The lazily generated world terrain.
pub struct WorldMap {
    store:           PatchStore,
    cache:           EnergyCache,
    rng:             WorldRng,
    n:               u32,
    mcmc_iterations: u32,
    initial_seed:    u64,
}

impl WorldMap {
    pub fn new(
        n: u32,
        mcmc_iterations: u32,
        catalogue: &[ItemType],
        scent_dim: u32,
        color_dim: u32,
        seed: u64,
    ) -> WorldMap {
        WorldMap {
            store: PatchStore::new(n, scent_dim, color_dim),
            cache: EnergyCache::new(catalogue, n),
            rng: WorldRng::new(seed),
            n,
            mcmc_iterations,
            initial_seed: seed,
        }
    }

    /// Rebuild from persisted parts (the store already holds its patches).
    pub fn from_parts(
        store: PatchStore,
        catalogue: &[ItemType],
        rng: WorldRng,
        n: u32,
        mcmc_iterations: u32,
        initial_seed: u64,
    ) -> WorldMap {
        WorldMap {
            cache: EnergyCache::new(catalogue, n),
            store,
            rng,
            n,
            mcmc_iterations,
            initial_seed,
        }
    }

    #[inline]
    pub fn n(&self) -> u32 {
        self.n
    }

    #[inline]
    pub fn mcmc_iterations(&self) -> u32 {
        self.mcmc_iterations
    }

    #[inline]
    pub fn initial_seed(&self) -> u64 {
        self.initial_seed
    }

    #[inline]
    pub fn store(&self) -> &PatchStore {
        &self.store
    }

    #[inline]
    pub fn store_mut(&mut self) -> &mut PatchStore {
        &mut self.store
    }

    #[inline]
    pub fn cache(&self) -> &EnergyCache {
        &self.cache
    }

    #[inline]
    pub fn catalogue(&self) -> &[ItemType] {
        self.cache.catalogue()
    }

    /// The world-scoped PRNG.  Callers hold the world lock.
    #[inline]
    pub fn rng_mut(&mut self) -> &mut WorldRng {
        &mut self.rng
    }

    /// Canonical textual form of the PRNG state (persistence).
    pub fn rng_string(&self) -> String {
        self.rng.state_string()
    }

    // ── Neighborhood geometry ─────────────────────────────────────────────

    /// The four patch coordinates whose union covers the `n × n` box
    /// centered at `world_position`, in row-major order (bottom-left,
    /// bottom-right, top-left, top-right), and the index of the patch
    /// containing the query.
    ///
    /// The covering set is picked by the query's quadrant within its own
    /// patch: the box always spills toward the nearest corner, so the three
    /// patches on that side complete the cover.
    pub fn neighborhood_positions(&self, world_position: Position) -> Neighborhood {
        let (patch, offset) = world_position.to_patch_with_offset(self.n);
        let half = (self.n / 2) as i64;

        // Bottom-left member of the 2×2 cover, and where the query's own
        // patch lands within the row-major cover.
        let (bottom_left, containing) = match (offset.x < half, offset.y < half) {
            (true, true)   => (patch.left().down(), 3),
            (true, false)  => (patch.left(), 1),
            (false, true)  => (patch.down(), 2),
            (false, false) => (patch, 0),
        };

        Neighborhood {
            patch_positions: [
                bottom_left,
                bottom_left.right(),
                bottom_left.up(),
                bottom_left.up().right(),
            ],
            containing,
        }
    }

    // ── Materialization and fixing ────────────────────────────────────────

    /// Materialize and fix the four patches covering the `n × n` box around
    /// `world_position`.  After this returns, all four patches exist, are
    /// fixed, and are safe to read for observation.
    pub fn fixed_neighborhood(&mut self, world_position: Position) -> Neighborhood {
        let neighborhood = self.neighborhood_positions(world_position);
        for position in neighborhood.patch_positions {
            self.store.get_or_make(position, &mut self.rng);
        }
        self.fix_patches(&neighborhood.patch_positions);
        neighborhood
    }

    /// Materialize and fix every patch intersecting `bbox` (the get-map
    /// path), then hand each one to `visit` in row-major order.
    pub fn fix_region(&mut self, bbox: BoundingBox, mut visit: impl FnMut(Position, &Patch)) {
        let targets: Vec<Position> = bbox.patches(self.n).collect();
        for &position in &targets {
            self.store.get_or_make(position, &mut self.rng);
        }
        self.fix_patches(&targets);
        for position in targets {
            visit(position, self.store.get_if_exists(position).unwrap());
        }
    }

    /// Items intersecting `bbox`, gathered from already-materialized patches
    /// only (no generation).  Live and tombstoned records alike.
    pub fn items_in(&self, bbox: BoundingBox) -> Vec<Item> {
        let mut items = Vec::new();
        for patch_position in bbox.patches(self.n) {
            if let Some(patch) = self.store.get_if_exists(patch_position) {
                items.extend(
                    patch
                        .items
                        .iter()
                        .filter(|item| bbox.contains(item.position))
                        .copied(),
                );
            }
        }
        items
    }

    /// Ensure every given (already materialized) patch is fixed.
    ///
    /// Gathers the 3×3 ring around each unfixed target, materializes the
    /// ring, Gibbs-samples everything unfixed in the gathered set, then
    /// flips the targets to fixed and rasterizes their vision grids.
    fn fix_patches(&mut self, targets: &[Position]) {
        let mut to_sample: Vec<Position> = Vec::with_capacity(targets.len() * 9);
        for &target in targets {
            let patch = self
                .store
                .get_if_exists(target)
                .expect("fix_patches target must be materialized");
            if patch.fixed {
                continue;
            }
            to_sample.push(target);
            to_sample.extend(target.neighbors8());
        }
        to_sample.sort();
        to_sample.dedup();

        // Materialize the ring; drop members that are already committed.
        to_sample.retain(|&position| !self.store.get_or_make(position, &mut self.rng).fixed);

        if !to_sample.is_empty() {
            let sampler = GibbsSampler::new(&self.cache, &to_sample, self.n);
            for _ in 0..self.mcmc_iterations {
                sampler.sweep(&mut self.store, &mut self.rng);
            }
        }

        let color_dim = self.store.color_dim();
        for &target in targets {
            let origin = target.patch_origin(self.n);
            let catalogue = self.cache.catalogue();
            let patch = self.store.get_mut(target).unwrap();
            patch.fixed = true;
            // Items are now settled; refresh the raster.
            patch.rebuild_vision(catalogue, origin, self.n, color_dim);
        }
    }
}
