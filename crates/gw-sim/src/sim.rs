//! The `Simulator` and its turn protocol.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use gw_core::{
    ActionPolicy, AgentId, BoundingBox, Direction, Position, SemaphoreId, SimTime, Status,
    TurnDirection,
};
use gw_energy::SimulatorConfig;
use gw_map::{Item, WorldMap};

use crate::agent::{AgentState, RequestedAction};
use crate::collision::{ProposedMove, resolve_moves};
use crate::observer::{StepEvent, StepObserver};
use crate::registry::{AgentRegistry, Semaphore, SemaphoreRegistry};
use crate::{SimError, SimResult, scent, vision};

// ── World ─────────────────────────────────────────────────────────────────────

/// Everything behind the world lock.
pub(crate) struct World {
    pub(crate) config:     SimulatorConfig,
    pub(crate) map:        WorldMap,
    pub(crate) time:       SimTime,
    pub(crate) agents:     AgentRegistry,
    pub(crate) semaphores: SemaphoreRegistry,
    /// Global submission counter for first-come-first-served ordering.
    pub(crate) next_request_seq: u64,
}

impl World {
    /// All active agents have acted and all semaphores are signaled.
    fn barrier_satisfied(&self) -> bool {
        self.agents
            .iter()
            .all(|agent| !agent.active || !agent.requested.is_none())
            && self.semaphores.all_signaled()
    }

    /// Like [`World::barrier_satisfied`], ignoring one agent's contribution.
    fn barrier_satisfied_excluding(&self, excluded: AgentId) -> bool {
        self.agents
            .iter()
            .all(|agent| agent.id == excluded || !agent.active || !agent.requested.is_none())
            && self.semaphores.all_signaled()
    }

    /// Run the barrier check and, if it passes, the timestep.  Worlds with
    /// neither agents nor semaphores have nothing to pace and never advance.
    fn maybe_advance(&mut self) -> Option<StepEvent> {
        if self.agents.is_empty() && self.semaphores.is_empty() {
            return None;
        }
        if !self.barrier_satisfied() {
            return None;
        }
        Some(self.advance_timestep())
    }

    // ── The timestep ──────────────────────────────────────────────────────

    fn advance_timestep(&mut self) -> StepEvent {
        let committed_time = self.time + 1;

        // ── 1. Move resolution ────────────────────────────────────────────
        //
        // Proposals are gathered in registry insertion order so the
        // `Random` policy's draw sequence is deterministic.
        let mut proposals: Vec<ProposedMove> = Vec::new();
        for id in self.agents.ids().to_vec() {
            let agent = self.agents.get(id).unwrap();
            let RequestedAction::Move { direction, steps } = agent.requested else {
                continue;
            };
            let start = agent.position;
            let seq = agent.request_seq;
            let destination = self.truncate_path(start, direction, steps);
            if destination != start {
                proposals.push(ProposedMove { agent: id, destination, seq });
            }
        }

        let winners = resolve_moves(&proposals, self.config.collision_policy, self.map.rng_mut());
        let mut arrivals: Vec<(AgentId, Position)> = Vec::with_capacity(winners.len());
        for (id, destination) in winners {
            self.agents.get_mut(id).unwrap().position = destination;
            arrivals.push((id, destination));
        }

        // Turns rotate unconditionally.
        self.agents.for_each_mut(|agent| {
            if let RequestedAction::Turn(turn) = agent.requested {
                agent.direction = agent.direction.rotated(turn);
            }
        });

        // ── 2. Item collection ────────────────────────────────────────────
        for (id, destination) in arrivals {
            self.try_collect(id, destination, committed_time);
        }

        // ── 3. Item decay ─────────────────────────────────────────────────
        self.purge_expired_items(committed_time);

        // ── 4. Scent diffusion ────────────────────────────────────────────
        let agent_positions: Vec<Position> =
            self.agents.iter().map(|agent| agent.position).collect();
        scent::diffuse_step(&mut self.map, &agent_positions, &self.config, committed_time);

        // ── 5. Observation rebuild ────────────────────────────────────────
        self.rebuild_observations();

        // ── 6. Commit ─────────────────────────────────────────────────────
        self.time = committed_time;
        self.agents.for_each_mut(|agent| {
            agent.requested = RequestedAction::None;
        });
        self.semaphores.reset_all();

        // ── 7. Notify (the caller fires observers once the lock drops) ────
        StepEvent {
            time:   self.time,
            agents: self.agents.iter().cloned().collect(),
        }
    }

    /// Walk up to `steps` cells from `start`, stopping one cell short of the
    /// first blocking live item.  Materializes and fixes patches along the
    /// path as needed.
    fn truncate_path(&mut self, start: Position, direction: Direction, steps: u32) -> Position {
        let mut position = start;
        for _ in 0..steps {
            let next = position + direction.step();
            self.ensure_fixed(next);
            if self.blocking_item_at(next) {
                break;
            }
            position = next;
        }
        position
    }

    fn ensure_fixed(&mut self, world_position: Position) {
        let patch_position = world_position.to_patch(self.map.n());
        let fixed = self
            .map
            .store()
            .get_if_exists(patch_position)
            .is_some_and(|patch| patch.fixed);
        if !fixed {
            self.map.fixed_neighborhood(world_position);
        }
    }

    fn blocking_item_at(&self, world_position: Position) -> bool {
        let (patch_position, _) = world_position.to_patch_with_offset(self.map.n());
        let Some(patch) = self.map.store().get_if_exists(patch_position) else {
            return false;
        };
        patch
            .live_item_at(world_position)
            .is_some_and(|item| self.map.catalogue()[item.item_type.index()].blocks_movement)
    }

    /// Collect the live item under an arriving agent if the agent meets the
    /// item type's requirement counts; pay its costs and tombstone it.
    fn try_collect(&mut self, id: AgentId, cell: Position, committed_time: SimTime) {
        let n = self.map.n();
        let patch_position = cell.to_patch(n);

        let Some(index) = self
            .map
            .store()
            .get_if_exists(patch_position)
            .and_then(|patch| patch.live_item_index_at(cell))
        else {
            return;
        };
        let item_type = {
            let patch = self.map.store().get_if_exists(patch_position).unwrap();
            patch.items[index].item_type
        };

        let requirements = &self.map.catalogue()[item_type.index()];
        let agent = self.agents.get(id).unwrap();
        let satisfied = requirements
            .required_item_counts
            .iter()
            .zip(&agent.collected_counts)
            .all(|(&needed, &held)| held >= needed);
        if !satisfied {
            return;
        }

        let costs = requirements.required_item_costs.clone();
        let agent = self.agents.get_mut(id).unwrap();
        for (held, &cost) in agent.collected_counts.iter_mut().zip(&costs) {
            *held -= cost;
        }
        agent.collected_counts[item_type.index()] += 1;

        let catalogue_len = self.map.catalogue().len();
        debug_assert!(item_type.index() < catalogue_len);
        let origin = patch_position.patch_origin(n);
        let color_dim = self.config.color_dim;
        let catalogue = self.map.catalogue().to_vec();
        let patch = self.map.store_mut().get_mut(patch_position).unwrap();
        patch.items[index].deletion_time = committed_time;
        patch.rebuild_vision(&catalogue, origin, n, color_dim);
    }

    /// Physically remove tombstones past their lifetime.
    fn purge_expired_items(&mut self, committed_time: SimTime) {
        let n = self.map.n();
        let color_dim = self.config.color_dim;
        let lifetime = self.config.deleted_item_lifetime;
        let catalogue = self.map.catalogue().to_vec();

        let positions: Vec<Position> = self
            .map
            .store()
            .iter()
            .filter(|(_, patch)| {
                patch
                    .items
                    .iter()
                    .any(|item| item.expired(committed_time, lifetime))
            })
            .map(|(position, _)| position)
            .collect();

        for position in positions {
            let origin = position.patch_origin(n);
            let patch = self.map.store_mut().get_mut(position).unwrap();
            patch.purge_expired(committed_time, lifetime);
            patch.rebuild_vision(&catalogue, origin, n, color_dim);
        }
    }

    /// Recompute scent and vision for every agent.
    fn rebuild_observations(&mut self) {
        let ids: Vec<AgentId> = self.agents.ids().to_vec();

        // Fix each agent's surroundings first (mutates the map).
        for &id in &ids {
            let position = self.agents.get(id).unwrap().position;
            self.ensure_fixed(position);
        }

        let markers = agent_markers(&self.agents);
        let n = self.map.n();
        for id in ids {
            let (position, facing) = {
                let agent = self.agents.get(id).unwrap();
                (agent.position, agent.direction)
            };

            let (patch_position, offset) = position.to_patch_with_offset(n);
            let scent = self
                .map
                .store()
                .get_if_exists(patch_position)
                .map(|patch| {
                    patch
                        .scent_at(offset, n, self.config.scent_dim)
                        .to_vec()
                })
                .unwrap_or_else(|| vec![0.0; self.config.scent_dim as usize]);

            let vision =
                vision::build_vision(&self.map, position, facing, &markers, &self.config);

            let agent = self.agents.get_mut(id).unwrap();
            agent.scent = scent;
            agent.vision = vision;
        }
    }

    /// First free cell scanning outward from the origin in Chebyshev rings:
    /// no blocking live item, no agent already standing there.
    fn spawn_position(&mut self) -> Position {
        let occupied: Vec<Position> = self.agents.iter().map(|agent| agent.position).collect();
        for radius in 0i64.. {
            for y in -radius..=radius {
                for x in -radius..=radius {
                    if x.abs().max(y.abs()) != radius {
                        continue;
                    }
                    let candidate = Position::new(x, y);
                    self.ensure_fixed(candidate);
                    if !self.blocking_item_at(candidate) && !occupied.contains(&candidate) {
                        return candidate;
                    }
                }
            }
        }
        unreachable!("an unbounded lattice always has a free cell")
    }
}

/// Cell → number of agents standing on it.
fn agent_markers(agents: &AgentRegistry) -> FxHashMap<Position, u32> {
    let mut markers: FxHashMap<Position, u32> = FxHashMap::default();
    for agent in agents.iter() {
        *markers.entry(agent.position).or_insert(0) += 1;
    }
    markers
}

// ── Snapshots ─────────────────────────────────────────────────────────────────

/// Copy-out of one patch for `get_map` consumers, with agent markers
/// composited into the vision raster.
#[derive(Clone, Debug)]
pub struct PatchSnapshot {
    pub position: Position,
    pub fixed:    bool,
    pub items:    Vec<Item>,
    /// World positions of agents standing in this patch.
    pub agents: Vec<Position>,
    pub scent:  Vec<f32>,
    pub vision: Vec<f32>,
}

// ── Simulator ─────────────────────────────────────────────────────────────────

/// The authoritative simulator.
///
/// All public operations are `&self` and internally serialize on the world
/// lock, so a `Simulator` can be shared across threads (the server wraps it
/// in an `Arc`).
pub struct Simulator {
    pub(crate) world: Mutex<World>,
    observers:        Mutex<Vec<Box<dyn StepObserver>>>,
}

impl Simulator {
    /// Validate `config` and build an empty world at time 0.
    pub fn new(config: SimulatorConfig) -> SimResult<Simulator> {
        config.validate().map_err(SimError::Config)?;
        let map = WorldMap::new(
            config.patch_size,
            config.mcmc_iterations,
            &config.item_types,
            config.scent_dim,
            config.color_dim,
            config.random_seed,
        );
        Ok(Simulator {
            world: Mutex::new(World {
                config,
                map,
                time: SimTime::ZERO,
                agents: AgentRegistry::new(),
                semaphores: SemaphoreRegistry::new(),
                next_request_seq: 0,
            }),
            observers: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn from_world(world: World) -> Simulator {
        Simulator {
            world:     Mutex::new(world),
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Register a step observer.  Observers fire in registration order.
    pub fn add_observer(&self, observer: Box<dyn StepObserver>) {
        self.observers.lock().push(observer);
    }

    /// Fire the observers for a committed step.  The world lock is already
    /// released; the observer list lock alone serializes step notification,
    /// so events reach observers in commit order.
    fn notify(&self, event: StepEvent) {
        let observers = self.observers.lock();
        for observer in observers.iter() {
            observer.on_step(&event);
        }
    }

    fn finish(&self, event: Option<StepEvent>) {
        if let Some(event) = event {
            self.notify(event);
        }
    }

    // ── Read-only accessors ───────────────────────────────────────────────

    pub fn time(&self) -> SimTime {
        self.world.lock().time
    }

    pub fn config(&self) -> SimulatorConfig {
        self.world.lock().config.clone()
    }

    /// Agent IDs in creation order.
    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.world.lock().agents.ids().to_vec()
    }

    /// Copy-out of one agent's state.
    pub fn agent_state(&self, id: AgentId) -> Result<AgentState, Status> {
        self.world
            .lock()
            .agents
            .get(id)
            .cloned()
            .ok_or(Status::InvalidAgentId)
    }

    pub fn semaphore_list(&self) -> Vec<Semaphore> {
        self.world.lock().semaphores.iter().collect()
    }

    // ── Agent lifecycle ───────────────────────────────────────────────────

    /// Create an agent on the first free cell near the origin, compute its
    /// initial observations, and return a copy of its state.
    pub fn add_agent(&self) -> Result<AgentState, Status> {
        let mut world = self.world.lock();
        let position = world.spawn_position();
        let id = world.agents.allocate_id();
        let agent = AgentState::new(
            id,
            position,
            world.config.scent_dim,
            world.config.vision_len(),
            world.config.item_types.len(),
        );
        world.agents.insert(agent);
        world.rebuild_observations();
        Ok(world.agents.get(id).unwrap().clone())
    }

    /// Remove an agent.  Removing the last un-acted active agent can close
    /// the turn barrier, in which case the timestep runs before returning.
    pub fn remove_agent(&self, id: AgentId) -> Status {
        let event = {
            let mut world = self.world.lock();
            if world.agents.remove(id).is_none() {
                return Status::InvalidAgentId;
            }
            world.maybe_advance()
        };
        self.finish(event);
        Status::Ok
    }

    // ── Actions ───────────────────────────────────────────────────────────

    /// Queue a move.  `Ok` means the request was recorded (or the policy is
    /// `Ignored`); if this submission closed the turn barrier the timestep
    /// has already run by the time this returns.
    pub fn move_agent(&self, id: AgentId, direction: Direction, steps: u32) -> Status {
        let max_steps = {
            let world = self.world.lock();
            world.config.max_steps_per_movement
        };
        if steps > max_steps {
            return Status::ViolatedPermissions;
        }
        let policy = |world: &World| world.config.allowed_movement_directions[direction as usize];
        self.submit(id, policy, RequestedAction::Move { direction, steps })
    }

    /// Queue a rotation.
    pub fn turn_agent(&self, id: AgentId, turn: TurnDirection) -> Status {
        let policy = |world: &World| world.config.allowed_rotations[turn as usize];
        self.submit(id, policy, RequestedAction::Turn(turn))
    }

    /// Queue a no-op.
    pub fn no_op(&self, id: AgentId) -> Status {
        let policy = |world: &World| {
            if world.config.no_op_allowed {
                ActionPolicy::Allowed
            } else {
                ActionPolicy::Disallowed
            }
        };
        self.submit(id, policy, RequestedAction::NoOp)
    }

    fn submit(
        &self,
        id: AgentId,
        policy: impl Fn(&World) -> ActionPolicy,
        action: RequestedAction,
    ) -> Status {
        let event = {
            let mut world = self.world.lock();
            if !world.agents.contains(id) {
                return Status::InvalidAgentId;
            }
            if !world.agents.get(id).unwrap().requested.is_none() {
                return Status::AgentAlreadyActed;
            }
            let recorded = match policy(&world) {
                ActionPolicy::Allowed => action,
                ActionPolicy::Disallowed => return Status::ViolatedPermissions,
                // Accepted but inert: burns the agent's turn.
                ActionPolicy::Ignored => RequestedAction::NoOp,
            };
            let seq = world.next_request_seq;
            world.next_request_seq += 1;
            let agent = world.agents.get_mut(id).unwrap();
            agent.requested = recorded;
            agent.request_seq = seq;
            world.maybe_advance()
        };
        self.finish(event);
        Status::Ok
    }

    // ── Activity ──────────────────────────────────────────────────────────

    /// Include or exempt an agent from the turn barrier.
    ///
    /// Deactivating the last un-acted agent advances the turn immediately;
    /// re-activating while the barrier is otherwise satisfied records an
    /// implicit no-op so the in-flight turn is not stalled.
    pub fn set_active(&self, id: AgentId, active: bool) -> Status {
        let event = {
            let mut world = self.world.lock();
            if !world.agents.contains(id) {
                return Status::InvalidAgentId;
            }
            if active && world.barrier_satisfied_excluding(id) {
                let agent = world.agents.get_mut(id).unwrap();
                if agent.requested.is_none() {
                    agent.requested = RequestedAction::NoOp;
                }
            }
            world.agents.get_mut(id).unwrap().active = active;
            world.maybe_advance()
        };
        self.finish(event);
        Status::Ok
    }

    pub fn is_active(&self, id: AgentId) -> Result<bool, Status> {
        self.world
            .lock()
            .agents
            .get(id)
            .map(|agent| agent.active)
            .ok_or(Status::InvalidAgentId)
    }

    // ── Semaphores ────────────────────────────────────────────────────────

    pub fn add_semaphore(&self) -> SemaphoreId {
        self.world.lock().semaphores.create()
    }

    pub fn remove_semaphore(&self, id: SemaphoreId) -> Status {
        let event = {
            let mut world = self.world.lock();
            if !world.semaphores.remove(id) {
                return Status::InvalidSemaphoreId;
            }
            world.maybe_advance()
        };
        self.finish(event);
        Status::Ok
    }

    pub fn signal_semaphore(&self, id: SemaphoreId) -> Status {
        let event = {
            let mut world = self.world.lock();
            if !world.semaphores.signal(id) {
                return Status::InvalidSemaphoreId;
            }
            world.maybe_advance()
        };
        self.finish(event);
        Status::Ok
    }

    // ── Map access ────────────────────────────────────────────────────────

    /// Materialize, fix, and copy out every patch intersecting `bbox`, with
    /// agent markers composited into the vision rasters.
    pub fn map_snapshot(&self, bbox: BoundingBox) -> Vec<PatchSnapshot> {
        let mut world = self.world.lock();
        let n = world.map.n();
        let color_dim = world.config.color_dim as usize;
        let agent_color = world.config.agent_color.clone();
        let markers = agent_markers(&world.agents);

        let mut snapshots = Vec::new();
        world.map.fix_region(bbox, |position, patch| {
            snapshots.push(PatchSnapshot {
                position,
                fixed: patch.fixed,
                items: patch.items.clone(),
                agents: Vec::new(),
                scent: patch.scent.clone(),
                vision: patch.vision.clone(),
            });
        });

        for snapshot in &mut snapshots {
            let origin = snapshot.position.patch_origin(n);
            for (&cell, &count) in &markers {
                if cell.to_patch(n) != snapshot.position {
                    continue;
                }
                for _ in 0..count {
                    snapshot.agents.push(cell);
                }
                let offset = cell - origin;
                let slot = (offset.y as usize * n as usize + offset.x as usize) * color_dim;
                for (channel, &marker) in agent_color.iter().enumerate() {
                    snapshot.vision[slot + channel] += marker * count as f32;
                }
            }
            snapshot.agents.sort();
        }
        snapshots
    }

    // ── Persistence ───────────────────────────────────────────────────────

    /// Write the whole world to `out` (see [`crate::persist`]).
    pub fn save<W: std::io::Write>(&self, out: &mut W) -> SimResult<()> {
        let world = self.world.lock();
        crate::persist::write_world(&world, out)
    }

    /// Read a world saved by [`Simulator::save`].  `config` supplies the
    /// catalogue metadata that is not serialized (names, colors, policies);
    /// kernel tags and parameters come from the stream.
    pub fn load<R: std::io::Read>(input: &mut R, config: SimulatorConfig) -> SimResult<Simulator> {
        let world = crate::persist::read_world(input, config)?;
        Ok(Simulator::from_world(world))
    }
}
