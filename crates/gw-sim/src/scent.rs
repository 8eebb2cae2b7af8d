//! The per-patch scent diffusion pass.
//!
//! Each timestep, every *touched* fixed patch updates its dense scent grid:
//!
//! ```text
//! s'(c) = decay · s(c)
//!       + diffusion · Σ_{nb ∈ 4-neighborhood} (s(nb) − s(c))
//!       + Σ_{live item at c} item.scent
//!       + Σ_{tombstone at c} item.scent · decay^(now − deletion_time)
//! ```
//!
//! A patch is touched when it holds any item record or any agent; the pass
//! widens that set by one ring of materialized fixed neighbors so scent can
//! leak outward.  All reads go against a frozen snapshot of the previous
//! grids (boundary cells read the abutting cell of the adjacent patch), so
//! the update is simultaneous across the whole frontier — and, with the
//! `parallel` feature, the per-patch computations run on Rayon's pool.

use rustc_hash::{FxHashMap, FxHashSet};

use gw_core::{Position, SimTime};
use gw_energy::{ItemType, SimulatorConfig};
use gw_map::WorldMap;

/// Run one diffusion step over the touched frontier.
pub fn diffuse_step(
    map: &mut WorldMap,
    agent_positions: &[Position],
    config: &SimulatorConfig,
    now: SimTime,
) {
    let n = map.n();

    // ── Collect the touched frontier ──────────────────────────────────────
    let mut base: FxHashSet<Position> = FxHashSet::default();
    for (position, patch) in map.store().iter() {
        if patch.has_item_records() {
            base.insert(position);
        }
    }
    for &agent_position in agent_positions {
        base.insert(agent_position.to_patch(n));
    }

    let mut touched: FxHashSet<Position> = FxHashSet::default();
    for &position in &base {
        for candidate in std::iter::once(position).chain(position.neighbors8()) {
            if let Some(patch) = map.store().get_if_exists(candidate)
                && patch.fixed
            {
                touched.insert(candidate);
            }
        }
    }
    if touched.is_empty() {
        return;
    }

    // ── Snapshot the previous grids ───────────────────────────────────────
    //
    // Reads may reach one patch beyond the touched set (boundary cells of a
    // frontier patch); untouched patches are stationary this step, so their
    // snapshot doubles as their current value.
    let mut snapshot: FxHashMap<Position, Vec<f32>> = FxHashMap::default();
    for &position in &touched {
        for candidate in [
            position,
            position.up(),
            position.down(),
            position.left(),
            position.right(),
        ] {
            if !snapshot.contains_key(&candidate)
                && let Some(patch) = map.store().get_if_exists(candidate)
            {
                snapshot.insert(candidate, patch.scent.clone());
            }
        }
    }

    // Deterministic order keeps runs reproducible regardless of hash state.
    let mut order: Vec<Position> = touched.into_iter().collect();
    order.sort();

    let updates = compute_updates(&order, &snapshot, map, map.catalogue(), config, now);

    for (position, grid) in updates {
        map.store_mut().get_mut(position).unwrap().scent = grid;
    }
}

#[cfg(not(feature = "parallel"))]
fn compute_updates(
    order: &[Position],
    snapshot: &FxHashMap<Position, Vec<f32>>,
    map: &WorldMap,
    catalogue: &[ItemType],
    config: &SimulatorConfig,
    now: SimTime,
) -> Vec<(Position, Vec<f32>)> {
    order
        .iter()
        .map(|&position| {
            (
                position,
                updated_grid(position, snapshot, map, catalogue, config, now),
            )
        })
        .collect()
}

#[cfg(feature = "parallel")]
fn compute_updates(
    order: &[Position],
    snapshot: &FxHashMap<Position, Vec<f32>>,
    map: &WorldMap,
    catalogue: &[ItemType],
    config: &SimulatorConfig,
    now: SimTime,
) -> Vec<(Position, Vec<f32>)> {
    use rayon::prelude::*;

    order
        .par_iter()
        .map(|&position| {
            (
                position,
                updated_grid(position, snapshot, map, catalogue, config, now),
            )
        })
        .collect()
}

/// Compute one patch's next scent grid from the snapshot.
fn updated_grid(
    patch_position: Position,
    snapshot: &FxHashMap<Position, Vec<f32>>,
    map: &WorldMap,
    catalogue: &[ItemType],
    config: &SimulatorConfig,
    now: SimTime,
) -> Vec<f32> {
    let n = map.n() as i64;
    let dim = config.scent_dim as usize;
    let decay = config.scent_decay;
    let diffusion = config.scent_diffusion;
    let origin = patch_position.patch_origin(map.n());

    let own = &snapshot[&patch_position];
    let mut next = vec![0.0f32; own.len()];

    // Scent of a world cell from the snapshot; unmaterialized space is
    // scentless.
    let sample = |world: Position, channel: usize| -> f32 {
        let (patch, offset) = world.to_patch_with_offset(map.n());
        match snapshot.get(&patch) {
            Some(grid) => grid[(offset.y * n + offset.x) as usize * dim + channel],
            None => 0.0,
        }
    };

    for y in 0..n {
        for x in 0..n {
            let world = origin + Position::new(x, y);
            let cell = (y * n + x) as usize * dim;
            for channel in 0..dim {
                let here = own[cell + channel];
                let exchange = sample(world.up(), channel)
                    + sample(world.down(), channel)
                    + sample(world.left(), channel)
                    + sample(world.right(), channel)
                    - 4.0 * here;
                next[cell + channel] = decay * here + diffusion * exchange;
            }
        }
    }

    // ── Item emissions ────────────────────────────────────────────────────
    let patch = map.store().get_if_exists(patch_position).unwrap();
    for item in &patch.items {
        let offset = item.position - origin;
        let cell = (offset.y * n + offset.x) as usize * dim;
        let scent = &catalogue[item.item_type.index()].scent;
        if item.is_alive() {
            for channel in 0..dim {
                next[cell + channel] += scent[channel];
            }
        } else {
            // Tombstones fade geometrically until purged.
            let age = now.since(item.deletion_time);
            if age < config.deleted_item_lifetime {
                let fade = decay.powi(age as i32);
                for channel in 0..dim {
                    next[cell + channel] += scent[channel] * fade;
                }
            }
        }
    }

    next
}
