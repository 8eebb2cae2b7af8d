//! `gw-map` — lazily materialized MRF terrain.
//!
//! The world is an unbounded lattice stored as square patches in a hash map
//! keyed by patch coordinate.  A patch starts *unfixed*: its item layout is
//! provisional and may be revised by Gibbs sampling whenever a nearby region
//! is materialized.  Once an observer needs a patch, the generator
//! materializes the patch's surroundings, runs the sampler over everything
//! unfixed in range, and *fixes* the patch — from then on its items,
//! creation times, and the fixed flag itself are immutable to sampling.
//!
//! # Module map
//!
//! | Module        | Contents                                             |
//! |---------------|------------------------------------------------------|
//! | [`item`]      | `Item` — a placed (possibly tombstoned) item         |
//! | [`patch`]     | `Patch` — items, scent/vision grids, the fixed flag  |
//! | [`store`]     | `PatchStore` — hashed patch map, neighbor seeding    |
//! | [`cache`]     | `EnergyCache` — tabulated stationary kernels         |
//! | [`gibbs`]     | Birth/death/move Metropolis sweeps                   |
//! | [`generator`] | `WorldMap` — the get-or-create-and-fix protocol      |

pub mod cache;
pub mod generator;
pub mod gibbs;
pub mod item;
pub mod patch;
pub mod store;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use cache::EnergyCache;
pub use generator::{Neighborhood, WorldMap};
pub use item::Item;
pub use patch::Patch;
pub use store::PatchStore;
