//! Socket-free request handling: opcode → simulator call → response bytes.
//!
//! `ServerCore` owns everything the protocol needs except the sockets
//! themselves, so the whole permission/ownership/dispatch surface is
//! testable without a network.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use gw_core::{AgentId, ClientId, SemaphoreId, Status};
use gw_proto::message::*;
use gw_proto::{Opcode, PROTOCOL_VERSION};
use gw_sim::{Simulator, StepEvent};

use crate::permissions::Permissions;
use crate::record::ClientDirectory;

/// What the transport should do after handling one request.
pub enum Outcome {
    /// Send this payload back under the request's opcode.
    Reply(Vec<u8>),
    /// Send the payload, then drop the connection (`REMOVE_CLIENT`).
    ReplyThenClose(Vec<u8>),
}

/// The server's protocol brain: simulator + client directory.
pub struct ServerCore {
    pub(crate) simulator: Arc<Simulator>,
    pub(crate) dims:      ProtoDims,
    pub(crate) directory: Mutex<ClientDirectory>,
    default_permissions:  Permissions,
}

impl ServerCore {
    pub fn new(simulator: Arc<Simulator>, default_permissions: Permissions) -> ServerCore {
        let dims = ProtoDims::from_config(&simulator.config());
        ServerCore {
            simulator,
            dims,
            directory: Mutex::new(ClientDirectory::new()),
            default_permissions,
        }
    }

    pub fn dims(&self) -> ProtoDims {
        self.dims
    }

    // ── Handshake ─────────────────────────────────────────────────────────

    /// Process a handshake.  `is_connected` reports whether a client id
    /// currently has a live connection (double connections are refused).
    /// Returns the response plus the granted id on success.
    pub fn handshake(
        &self,
        request: HandshakeRequest,
        is_connected: impl Fn(ClientId) -> bool,
    ) -> (HandshakeResponse, Option<ClientId>) {
        if request.version != PROTOCOL_VERSION {
            return (
                HandshakeResponse::rejected(Status::ServerParseMessageError),
                None,
            );
        }

        let mut directory = self.directory.lock();
        if request.client_id == HandshakeRequest::NEW_CLIENT {
            let record = directory.create(self.default_permissions);
            let response = HandshakeResponse {
                status:        Status::Ok,
                client_id:     record.client_id,
                time:          self.simulator.time(),
                permissions:   record.permissions.bits(),
                agents:        Vec::new(),
                semaphore_ids: Vec::new(),
            };
            return (response, Some(record.client_id));
        }

        // Reconnection path.
        let Some(record) = directory.get(request.client_id) else {
            return (HandshakeResponse::rejected(Status::ViolatedPermissions), None);
        };
        if is_connected(request.client_id) {
            return (HandshakeResponse::rejected(Status::AgentAlreadyExists), None);
        }

        let mut agents = Vec::with_capacity(record.owned_agents.len());
        for &id in &record.owned_agents {
            match self.simulator.agent_state(id) {
                Ok(state) => agents.push(state),
                Err(_) => continue,
            }
        }
        let response = HandshakeResponse {
            status:        Status::Ok,
            client_id:     record.client_id,
            time:          self.simulator.time(),
            permissions:   record.permissions.bits(),
            agents,
            semaphore_ids: record.owned_semaphores.clone(),
        };
        (response, Some(request.client_id))
    }

    // ── Request dispatch ──────────────────────────────────────────────────

    /// Handle one framed request from an authenticated client.
    pub fn handle(&self, client: ClientId, opcode: Opcode, payload: &[u8]) -> io::Result<Outcome> {
        match opcode {
            Opcode::AddAgent => self.add_agent(client),
            Opcode::RemoveAgent => {
                let request = SingleAgentRequest::decode_payload(payload)?;
                self.remove_agent(client, request.agent_id)
            }
            Opcode::Move => {
                let request = MoveRequest::decode_payload(payload)?;
                let status = if self.owns_agent(client, request.agent_id) {
                    self.simulator
                        .move_agent(request.agent_id, request.direction, request.steps)
                } else {
                    Status::InvalidAgentId
                };
                status_reply(status)
            }
            Opcode::Turn => {
                let request = TurnRequest::decode_payload(payload)?;
                let status = if self.owns_agent(client, request.agent_id) {
                    self.simulator.turn_agent(request.agent_id, request.turn)
                } else {
                    Status::InvalidAgentId
                };
                status_reply(status)
            }
            Opcode::DoNothing => {
                let request = SingleAgentRequest::decode_payload(payload)?;
                let status = if self.owns_agent(client, request.agent_id) {
                    self.simulator.no_op(request.agent_id)
                } else {
                    Status::InvalidAgentId
                };
                status_reply(status)
            }
            Opcode::GetMap => {
                let request = GetMapRequest::decode_payload(payload)?;
                self.get_map(client, request)
            }
            Opcode::GetAgentIds => self.get_agent_ids(client),
            Opcode::GetAgentStates => {
                let request = GetAgentStatesRequest::decode_payload(payload)?;
                self.get_agent_states(client, request)
            }
            Opcode::SetActive => {
                let request = SetActiveRequest::decode_payload(payload)?;
                let status = if !self.has_permission(client, Permissions::SET_ACTIVE) {
                    Status::ViolatedPermissions
                } else if !self.owns_agent(client, request.agent_id) {
                    Status::InvalidAgentId
                } else {
                    self.simulator.set_active(request.agent_id, request.active)
                };
                status_reply(status)
            }
            Opcode::IsActive => {
                let request = SingleAgentRequest::decode_payload(payload)?;
                let response = if !self.owns_agent(client, request.agent_id) {
                    IsActiveResponse { status: Status::InvalidAgentId, active: false }
                } else {
                    match self.simulator.is_active(request.agent_id) {
                        Ok(active) => IsActiveResponse { status: Status::Ok, active },
                        Err(status) => IsActiveResponse { status, active: false },
                    }
                };
                Ok(Outcome::Reply(response.encode_payload()?))
            }
            Opcode::AddSemaphore => self.add_semaphore(client),
            Opcode::RemoveSemaphore => {
                let request = SemaphoreRequest::decode_payload(payload)?;
                self.remove_semaphore(client, request.semaphore_id)
            }
            Opcode::SignalSemaphore => {
                let request = SemaphoreRequest::decode_payload(payload)?;
                let status = if !self.has_permission(client, Permissions::MANAGE_SEMAPHORES) {
                    Status::ViolatedPermissions
                } else if !self.owns_semaphore(client, request.semaphore_id) {
                    Status::InvalidSemaphoreId
                } else {
                    self.simulator.signal_semaphore(request.semaphore_id)
                };
                status_reply(status)
            }
            Opcode::GetSemaphores => self.get_semaphores(client),
            Opcode::RemoveClient => self.remove_client(client),

            // Server-initiated or connection-setup codes are not valid
            // requests on an established connection.
            Opcode::Handshake | Opcode::Step => {
                status_reply(Status::ServerParseMessageError)
            }
        }
    }

    /// Build the step broadcast payload for one client.
    pub fn step_payload(&self, client: ClientId, event: &StepEvent) -> io::Result<Vec<u8>> {
        let directory = self.directory.lock();
        let owned: Vec<AgentId> = directory
            .get(client)
            .map(|record| record.owned_agents.clone())
            .unwrap_or_default();
        drop(directory);

        let states = event
            .agents
            .iter()
            .filter(|state| owned.contains(&state.id))
            .cloned()
            .collect();
        StepBroadcast {
            status: Status::Ok,
            time: event.time,
            ids: owned,
            states,
        }
        .encode_payload()
    }

    // ── Per-opcode handlers ───────────────────────────────────────────────

    fn add_agent(&self, client: ClientId) -> io::Result<Outcome> {
        if !self.has_permission(client, Permissions::ADD_AGENT) {
            let response = AddAgentResponse { status: Status::ViolatedPermissions, agent: None };
            return Ok(Outcome::Reply(response.encode_payload()?));
        }
        let response = match self.simulator.add_agent() {
            Ok(agent) => {
                let mut directory = self.directory.lock();
                if let Some(record) = directory.get_mut(client) {
                    record.owned_agents.push(agent.id);
                }
                AddAgentResponse { status: Status::Ok, agent: Some(agent) }
            }
            Err(status) => AddAgentResponse { status, agent: None },
        };
        Ok(Outcome::Reply(response.encode_payload()?))
    }

    fn remove_agent(&self, client: ClientId, agent_id: AgentId) -> io::Result<Outcome> {
        if !self.has_permission(client, Permissions::REMOVE_AGENT) {
            return status_reply(Status::ViolatedPermissions);
        }
        if !self.owns_agent(client, agent_id) {
            return status_reply(Status::InvalidAgentId);
        }
        let status = self.simulator.remove_agent(agent_id);
        if status.is_ok() {
            let mut directory = self.directory.lock();
            if let Some(record) = directory.get_mut(client) {
                record.owned_agents.retain(|&id| id != agent_id);
            }
        }
        status_reply(status)
    }

    fn get_map(&self, client: ClientId, request: GetMapRequest) -> io::Result<Outcome> {
        let response = if self.has_permission(client, Permissions::GET_MAP) {
            GetMapResponse {
                status:  Status::Ok,
                patches: self.simulator.map_snapshot(request.bounds),
            }
        } else {
            GetMapResponse { status: Status::ViolatedPermissions, patches: Vec::new() }
        };
        Ok(Outcome::Reply(response.encode_payload()?))
    }

    fn get_agent_ids(&self, client: ClientId) -> io::Result<Outcome> {
        let response = if self.has_permission(client, Permissions::GET_AGENT_IDS) {
            let directory = self.directory.lock();
            GetAgentIdsResponse {
                status: Status::Ok,
                ids:    directory
                    .get(client)
                    .map(|record| record.owned_agents.clone())
                    .unwrap_or_default(),
            }
        } else {
            GetAgentIdsResponse { status: Status::ViolatedPermissions, ids: Vec::new() }
        };
        Ok(Outcome::Reply(response.encode_payload()?))
    }

    fn get_agent_states(
        &self,
        client: ClientId,
        request: GetAgentStatesRequest,
    ) -> io::Result<Outcome> {
        let response = if !self.has_permission(client, Permissions::GET_AGENT_STATES) {
            GetAgentStatesResponse { status: Status::ViolatedPermissions, states: Vec::new() }
        } else {
            let mut states = Vec::with_capacity(request.ids.len());
            let mut status = Status::Ok;
            for &id in &request.ids {
                if !self.owns_agent(client, id) {
                    status = Status::InvalidAgentId;
                    break;
                }
                match self.simulator.agent_state(id) {
                    Ok(state) => states.push(state),
                    Err(bad) => {
                        status = bad;
                        break;
                    }
                }
            }
            if status.is_ok() {
                GetAgentStatesResponse { status, states }
            } else {
                GetAgentStatesResponse { status, states: Vec::new() }
            }
        };
        Ok(Outcome::Reply(response.encode_payload()?))
    }

    fn add_semaphore(&self, client: ClientId) -> io::Result<Outcome> {
        let response = if self.has_permission(client, Permissions::MANAGE_SEMAPHORES) {
            let id = self.simulator.add_semaphore();
            let mut directory = self.directory.lock();
            if let Some(record) = directory.get_mut(client) {
                record.owned_semaphores.push(id);
            }
            drop(directory);
            AddSemaphoreResponse { status: Status::Ok, semaphore_id: id }
        } else {
            AddSemaphoreResponse {
                status:       Status::ViolatedPermissions,
                semaphore_id: SemaphoreId(0),
            }
        };
        Ok(Outcome::Reply(response.encode_payload()?))
    }

    fn remove_semaphore(&self, client: ClientId, id: SemaphoreId) -> io::Result<Outcome> {
        if !self.has_permission(client, Permissions::MANAGE_SEMAPHORES) {
            return status_reply(Status::ViolatedPermissions);
        }
        if !self.owns_semaphore(client, id) {
            return status_reply(Status::InvalidSemaphoreId);
        }
        let status = self.simulator.remove_semaphore(id);
        if status.is_ok() {
            let mut directory = self.directory.lock();
            if let Some(record) = directory.get_mut(client) {
                record.owned_semaphores.retain(|&other| other != id);
            }
        }
        status_reply(status)
    }

    fn get_semaphores(&self, client: ClientId) -> io::Result<Outcome> {
        let response = if self.has_permission(client, Permissions::MANAGE_SEMAPHORES) {
            GetSemaphoresResponse {
                status:     Status::Ok,
                semaphores: self
                    .simulator
                    .semaphore_list()
                    .into_iter()
                    .map(|s| (s.id, s.signaled))
                    .collect(),
            }
        } else {
            GetSemaphoresResponse { status: Status::ViolatedPermissions, semaphores: Vec::new() }
        };
        Ok(Outcome::Reply(response.encode_payload()?))
    }

    /// `REMOVE_CLIENT`: cascade-delete everything the client owns, then
    /// forget the client.
    fn remove_client(&self, client: ClientId) -> io::Result<Outcome> {
        if !self.has_permission(client, Permissions::REMOVE_CLIENT) {
            return status_reply(Status::ViolatedPermissions);
        }
        let record = self.directory.lock().remove(client);
        if let Some(record) = record {
            for agent in record.owned_agents {
                self.simulator.remove_agent(agent);
            }
            for semaphore in record.owned_semaphores {
                self.simulator.remove_semaphore(semaphore);
            }
        }
        let payload = StatusResponse { status: Status::Ok }.encode_payload()?;
        Ok(Outcome::ReplyThenClose(payload))
    }

    // ── Permission / ownership checks ─────────────────────────────────────

    fn has_permission(&self, client: ClientId, needed: Permissions) -> bool {
        self.directory
            .lock()
            .get(client)
            .is_some_and(|record| record.permissions.contains(needed))
    }

    fn owns_agent(&self, client: ClientId, agent: AgentId) -> bool {
        self.directory
            .lock()
            .get(client)
            .is_some_and(|record| record.owns_agent(agent))
    }

    fn owns_semaphore(&self, client: ClientId, semaphore: SemaphoreId) -> bool {
        self.directory
            .lock()
            .get(client)
            .is_some_and(|record| record.owns_semaphore(semaphore))
    }
}

fn status_reply(status: Status) -> io::Result<Outcome> {
    Ok(Outcome::Reply(StatusResponse { status }.encode_payload()?))
}
