//! Whole-world stream persistence.
//!
//! Layout, in order: the PRNG state as a decimal text string, patch side
//! `n`, `mcmc_iterations`, the initial seed, every patch (sorted by
//! coordinate), the kernel catalogue as `(tag, args)` pairs, every agent
//! (full state, insertion order), every semaphore (insertion order), the
//! registries' allocation cursors, and the current time.
//!
//! Kernels serialize as tags plus parameter arrays only; everything else
//! about an item type (name, colors, costs) is supplied by the caller's
//! configuration on load.  The PRNG travels as text so the on-disk form
//! does not depend on any generator's internal layout.

use std::io::{Read, Write};

use gw_core::{Decode, Encode, Position, SimTime, WorldRng};
use gw_energy::{IntensityKernel, InteractionKernel, SimulatorConfig};
use gw_map::{PatchStore, WorldMap, patch};

use crate::agent::AgentState;
use crate::registry::{AgentRegistry, Semaphore, SemaphoreRegistry};
use crate::sim::World;
use crate::{SimError, SimResult};

pub(crate) fn write_world<W: Write>(world: &World, out: &mut W) -> SimResult<()> {
    let map = &world.map;

    // PRNG state — canonical decimal text.
    map.rng_string().encode(out)?;
    map.n().encode(out)?;
    map.mcmc_iterations().encode(out)?;
    map.initial_seed().encode(out)?;

    // Patches, sorted for a canonical byte stream.
    let positions = map.store().sorted_positions();
    (positions.len() as u32).encode(out)?;
    for position in positions {
        position.encode(out)?;
        patch::write_patch(map.store().get_if_exists(position).unwrap(), out)?;
    }

    // Kernel catalogue: (intensity tag+args, per-type interaction tag+args).
    (map.catalogue().len() as u32).encode(out)?;
    for item in map.catalogue() {
        item.intensity.tag().encode(out)?;
        item.intensity.args().encode(out)?;
        (item.interactions.len() as u32).encode(out)?;
        for interaction in &item.interactions {
            interaction.tag().encode(out)?;
            interaction.args().encode(out)?;
        }
    }

    // Agents and semaphores, insertion order.
    (world.agents.len() as u32).encode(out)?;
    for agent in world.agents.iter() {
        agent.write_full(out)?;
    }
    (world.semaphores.len() as u32).encode(out)?;
    for semaphore in world.semaphores.iter() {
        semaphore.id.encode(out)?;
        semaphore.signaled.encode(out)?;
    }

    world.agents.next_id().encode(out)?;
    world.semaphores.next_id().encode(out)?;
    world.next_request_seq.encode(out)?;
    world.time.encode(out)?;
    Ok(())
}

pub(crate) fn read_world<R: Read>(input: &mut R, config: SimulatorConfig) -> SimResult<World> {
    config.validate()?;

    let rng_text = String::decode(input)?;
    let rng = WorldRng::from_state_string(&rng_text)?;
    let n = u32::decode(input)?;
    let mcmc_iterations = u32::decode(input)?;
    let initial_seed = u64::decode(input)?;
    if n != config.patch_size {
        return Err(SimError::GeometryMismatch { saved_n: n, configured_n: config.patch_size });
    }

    let mut store = PatchStore::new(n, config.scent_dim, config.color_dim);
    let patch_count = u32::decode(input)?;
    for _ in 0..patch_count {
        let position = Position::decode(input)?;
        let patch = patch::read_patch(input, n, config.scent_dim, config.color_dim)?;
        store.insert(position, patch);
    }

    // Rebuild the catalogue: stream kernels over configuration metadata.
    let saved_types = u32::decode(input)? as usize;
    if saved_types != config.item_types.len() {
        return Err(SimError::CatalogueMismatch {
            saved:      saved_types,
            configured: config.item_types.len(),
        });
    }
    let mut catalogue = config.item_types.clone();
    for item in catalogue.iter_mut() {
        let tag = u64::decode(input)?;
        let args = Vec::<f32>::decode(input)?;
        item.intensity = IntensityKernel::from_tag_args(tag, &args)?;

        let interaction_count = u32::decode(input)? as usize;
        if interaction_count != saved_types {
            return Err(SimError::CatalogueMismatch {
                saved:      interaction_count,
                configured: saved_types,
            });
        }
        let mut interactions = Vec::with_capacity(interaction_count);
        for _ in 0..interaction_count {
            let tag = u64::decode(input)?;
            let args = Vec::<f32>::decode(input)?;
            interactions.push(InteractionKernel::from_tag_args(tag, &args)?);
        }
        item.interactions = interactions;
    }

    let mut agents = AgentRegistry::new();
    let agent_count = u32::decode(input)?;
    for _ in 0..agent_count {
        agents.insert(AgentState::read_full(
            input,
            config.scent_dim,
            config.vision_len(),
        )?);
    }

    let mut semaphores = SemaphoreRegistry::new();
    let semaphore_count = u32::decode(input)?;
    for _ in 0..semaphore_count {
        let id = gw_core::SemaphoreId::decode(input)?;
        let signaled = bool::decode(input)?;
        semaphores.restore(Semaphore { id, signaled });
    }

    agents.set_next_id(u64::decode(input)?);
    semaphores.set_next_id(u64::decode(input)?);
    let next_request_seq = u64::decode(input)?;
    let time = SimTime::decode(input)?;

    let mut map = WorldMap::from_parts(store, &catalogue, rng, n, mcmc_iterations, initial_seed);

    // Vision rasters are not serialized; rebuild them from the item lists.
    let color_dim = config.color_dim;
    let positions = map.store().sorted_positions();
    let rebuilt_catalogue = catalogue.clone();
    for position in positions {
        let origin = position.patch_origin(n);
        let patch = map.store_mut().get_mut(position).unwrap();
        patch.rebuild_vision(&rebuilt_catalogue, origin, n, color_dim);
    }

    let mut config = config;
    config.item_types = catalogue;

    Ok(World {
        config,
        map,
        time,
        agents,
        semaphores,
        next_request_seq,
    })
}
