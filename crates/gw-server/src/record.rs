//! Client records and their persistence.

use std::io::{Read, Write};

use rustc_hash::FxHashMap;

use gw_core::{AgentId, ClientId, Decode, Encode, SemaphoreId};

use crate::permissions::Permissions;

/// What the server remembers about one client, across connections.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ClientRecord {
    pub client_id:   ClientId,
    pub permissions: Permissions,
    /// Owned agents in creation order (the order reconnection reports).
    pub owned_agents: Vec<AgentId>,
    /// Owned semaphores in creation order.
    pub owned_semaphores: Vec<SemaphoreId>,
}

impl ClientRecord {
    pub fn new(client_id: ClientId, permissions: Permissions) -> ClientRecord {
        ClientRecord {
            client_id,
            permissions,
            owned_agents: Vec::new(),
            owned_semaphores: Vec::new(),
        }
    }

    #[inline]
    pub fn owns_agent(&self, id: AgentId) -> bool {
        self.owned_agents.contains(&id)
    }

    #[inline]
    pub fn owns_semaphore(&self, id: SemaphoreId) -> bool {
        self.owned_semaphores.contains(&id)
    }
}

/// The registry of client records, insertion ordered.  `ClientId(0)` is
/// reserved as the "allocate me one" handshake sentinel.
pub struct ClientDirectory {
    records: FxHashMap<ClientId, ClientRecord>,
    order:   Vec<ClientId>,
    next_id: u64,
}

impl Default for ClientDirectory {
    fn default() -> ClientDirectory {
        ClientDirectory {
            records: FxHashMap::default(),
            order:   Vec::new(),
            next_id: 1,
        }
    }
}

impl ClientDirectory {
    pub fn new() -> ClientDirectory {
        ClientDirectory::default()
    }

    /// Allocate a fresh record with the given permissions.
    pub fn create(&mut self, permissions: Permissions) -> &mut ClientRecord {
        let id = ClientId(self.next_id);
        self.next_id += 1;
        self.order.push(id);
        self.records.insert(id, ClientRecord::new(id, permissions));
        self.records.get_mut(&id).unwrap()
    }

    pub fn get(&self, id: ClientId) -> Option<&ClientRecord> {
        self.records.get(&id)
    }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut ClientRecord> {
        self.records.get_mut(&id)
    }

    pub fn remove(&mut self, id: ClientId) -> Option<ClientRecord> {
        let record = self.records.remove(&id)?;
        self.order.retain(|&other| other != id);
        Some(record)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ClientRecord> {
        self.order.iter().map(|id| &self.records[id])
    }

    // ── Persistence ───────────────────────────────────────────────────────
    //
    // Appended after the simulator stream so a restarted deployment keeps
    // its client identities and ownership.

    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> std::io::Result<()> {
        self.next_id.encode(out)?;
        (self.order.len() as u32).encode(out)?;
        for record in self.iter() {
            record.client_id.encode(out)?;
            record.permissions.bits().encode(out)?;
            record.owned_agents.encode(out)?;
            record.owned_semaphores.encode(out)?;
        }
        Ok(())
    }

    pub fn read_from<R: Read + ?Sized>(input: &mut R) -> std::io::Result<ClientDirectory> {
        let next_id = u64::decode(input)?;
        let count = u32::decode(input)?;
        let mut directory = ClientDirectory::new();
        directory.next_id = next_id;
        for _ in 0..count {
            let client_id = ClientId::decode(input)?;
            let permissions = Permissions::from_bits_truncate(u64::decode(input)?);
            let record = ClientRecord {
                client_id,
                permissions,
                owned_agents: Vec::<AgentId>::decode(input)?,
                owned_semaphores: Vec::<SemaphoreId>::decode(input)?,
            };
            directory.order.push(client_id);
            directory.records.insert(client_id, record);
        }
        Ok(directory)
    }
}
