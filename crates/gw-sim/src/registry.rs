//! Insertion-ordered registries for agents and semaphores.
//!
//! IDs are allocated monotonically and never reused — a removed agent's ID
//! stays dead forever, which is what lets clients refer to agents across
//! reconnects without ambiguity.  Iteration follows insertion order, and
//! that order is part of the public contract (reconnection returns a
//! client's agents in the order they were created).

use rustc_hash::FxHashMap;

use gw_core::{AgentId, SemaphoreId};

use crate::agent::AgentState;

// ── AgentRegistry ─────────────────────────────────────────────────────────────

/// All agents, keyed by ID, iterated in insertion order.
#[derive(Default)]
pub struct AgentRegistry {
    by_id:   FxHashMap<AgentId, AgentState>,
    order:   Vec<AgentId>,
    next_id: u64,
}

impl AgentRegistry {
    pub fn new() -> AgentRegistry {
        AgentRegistry::default()
    }

    /// Allocate the next ID.  The caller builds the state around it and
    /// inserts with [`AgentRegistry::insert`].
    pub fn allocate_id(&mut self) -> AgentId {
        let id = AgentId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn insert(&mut self, agent: AgentState) {
        debug_assert!(!self.by_id.contains_key(&agent.id));
        self.order.push(agent.id);
        self.by_id.insert(agent.id, agent);
    }

    pub fn remove(&mut self, id: AgentId) -> Option<AgentState> {
        let removed = self.by_id.remove(&id)?;
        self.order.retain(|&other| other != id);
        Some(removed)
    }

    #[inline]
    pub fn get(&self, id: AgentId) -> Option<&AgentState> {
        self.by_id.get(&id)
    }

    #[inline]
    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut AgentState> {
        self.by_id.get_mut(&id)
    }

    #[inline]
    pub fn contains(&self, id: AgentId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// IDs in insertion order.
    pub fn ids(&self) -> &[AgentId] {
        &self.order
    }

    /// Agents in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentState> {
        self.order.iter().map(|id| &self.by_id[id])
    }

    /// Mutable visit in insertion order.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut AgentState)) {
        for id in &self.order {
            f(self.by_id.get_mut(id).unwrap());
        }
    }

    /// The ID the next insertion will receive (persisted so IDs are never
    /// reused across save/load).
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Restore the allocation cursor (load path).
    pub fn set_next_id(&mut self, next_id: u64) {
        self.next_id = next_id;
    }
}

// ── SemaphoreRegistry ─────────────────────────────────────────────────────────

/// A named gate in the turn barrier.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Semaphore {
    pub id:       SemaphoreId,
    pub signaled: bool,
}

/// All semaphores, keyed by ID, iterated in insertion order.
#[derive(Default)]
pub struct SemaphoreRegistry {
    by_id:   FxHashMap<SemaphoreId, Semaphore>,
    order:   Vec<SemaphoreId>,
    next_id: u64,
}

impl SemaphoreRegistry {
    pub fn new() -> SemaphoreRegistry {
        SemaphoreRegistry::default()
    }

    pub fn create(&mut self) -> SemaphoreId {
        let id = SemaphoreId(self.next_id);
        self.next_id += 1;
        self.order.push(id);
        self.by_id.insert(id, Semaphore { id, signaled: false });
        id
    }

    pub fn remove(&mut self, id: SemaphoreId) -> bool {
        if self.by_id.remove(&id).is_none() {
            return false;
        }
        self.order.retain(|&other| other != id);
        true
    }

    #[inline]
    pub fn get(&self, id: SemaphoreId) -> Option<&Semaphore> {
        self.by_id.get(&id)
    }

    /// Mark a semaphore signaled.  Returns `false` for unknown IDs.
    pub fn signal(&mut self, id: SemaphoreId) -> bool {
        match self.by_id.get_mut(&id) {
            Some(semaphore) => {
                semaphore.signaled = true;
                true
            }
            None => false,
        }
    }

    /// `true` when every semaphore is signaled (vacuously true when empty).
    pub fn all_signaled(&self) -> bool {
        self.by_id.values().all(|s| s.signaled)
    }

    /// Reset every semaphore to unsignaled (step commit).
    pub fn reset_all(&mut self) {
        for semaphore in self.by_id.values_mut() {
            semaphore.signaled = false;
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Semaphores in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = Semaphore> {
        self.order.iter().map(|id| self.by_id[id])
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn set_next_id(&mut self, next_id: u64) {
        self.next_id = next_id;
    }

    /// Re-insert a persisted semaphore (load path).
    pub fn restore(&mut self, semaphore: Semaphore) {
        self.order.push(semaphore.id);
        self.by_id.insert(semaphore.id, semaphore);
    }
}
