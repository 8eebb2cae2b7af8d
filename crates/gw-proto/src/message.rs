//! Payload shapes for every opcode.
//!
//! Requests and responses are plain structs with hand-framed encode/decode.
//! Buffers whose shapes depend on the deployment configuration (scent and
//! vision vectors, patch grids) are sized by [`ProtoDims`], which both ends
//! derive from the shared configuration.

use std::io::{self, Read, Write};

use gw_core::codec::{invalid_data, read_f32_grid, write_f32_grid};
use gw_core::{
    AgentId, BoundingBox, ClientId, Decode, Direction, Encode, Position, SemaphoreId, SimTime,
    Status, TurnDirection,
};
use gw_energy::SimulatorConfig;
use gw_map::Item;
use gw_sim::{AgentState, PatchSnapshot};

// ── Dimensions ────────────────────────────────────────────────────────────────

/// The configuration-derived buffer shapes both endpoints agree on.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ProtoDims {
    pub scent_dim:    u32,
    pub color_dim:    u32,
    pub vision_range: u32,
    pub patch_size:   u32,
}

impl ProtoDims {
    pub fn from_config(config: &SimulatorConfig) -> ProtoDims {
        ProtoDims {
            scent_dim:    config.scent_dim,
            color_dim:    config.color_dim,
            vision_range: config.vision_range,
            patch_size:   config.patch_size,
        }
    }

    #[inline]
    pub fn vision_len(&self) -> usize {
        let side = (2 * self.vision_range + 1) as usize;
        side * side * self.color_dim as usize
    }

    #[inline]
    fn patch_scent_len(&self) -> usize {
        (self.patch_size * self.patch_size * self.scent_dim) as usize
    }

    #[inline]
    fn patch_vision_len(&self) -> usize {
        (self.patch_size * self.patch_size * self.color_dim) as usize
    }
}

// ── Shared pieces ─────────────────────────────────────────────────────────────

fn write_agent_states<W: Write + ?Sized>(
    out: &mut W,
    states: &[AgentState],
) -> io::Result<()> {
    (states.len() as u32).encode(out)?;
    for state in states {
        state.write_observable(out)?;
    }
    Ok(())
}

fn read_agent_states<R: Read + ?Sized>(
    input: &mut R,
    dims: &ProtoDims,
) -> io::Result<Vec<AgentState>> {
    let count = u32::decode(input)?;
    let mut states = Vec::with_capacity(count as usize);
    for _ in 0..count {
        states.push(AgentState::read_observable(
            input,
            dims.scent_dim,
            dims.vision_len(),
        )?);
    }
    Ok(states)
}

fn write_patch_snapshot<W: Write + ?Sized>(
    out: &mut W,
    patch: &PatchSnapshot,
) -> io::Result<()> {
    patch.position.encode(out)?;
    patch.fixed.encode(out)?;
    patch.items.encode(out)?;
    patch.agents.encode(out)?;
    write_f32_grid(out, &patch.scent)?;
    write_f32_grid(out, &patch.vision)
}

fn read_patch_snapshot<R: Read + ?Sized>(
    input: &mut R,
    dims: &ProtoDims,
) -> io::Result<PatchSnapshot> {
    Ok(PatchSnapshot {
        position: Position::decode(input)?,
        fixed:    bool::decode(input)?,
        items:    Vec::<Item>::decode(input)?,
        agents:   Vec::<Position>::decode(input)?,
        scent:    read_f32_grid(input, dims.patch_scent_len())?,
        vision:   read_f32_grid(input, dims.patch_vision_len())?,
    })
}

/// The one-field response shared by every mutation opcode.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct StatusResponse {
    pub status: Status,
}

impl StatusResponse {
    pub fn encode_payload(&self) -> io::Result<Vec<u8>> {
        self.status.encode_to_vec()
    }

    pub fn decode_payload(bytes: &[u8]) -> io::Result<StatusResponse> {
        Ok(StatusResponse { status: Status::decode_from_slice(bytes)? })
    }
}

// ── Handshake ─────────────────────────────────────────────────────────────────

/// First frame on every connection.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct HandshakeRequest {
    pub version: u32,
    /// `ClientId(0)` requests a fresh identity; any other value asks to
    /// reconnect as that client.
    pub client_id: ClientId,
}

impl HandshakeRequest {
    /// Sentinel for "allocate me a fresh id".
    pub const NEW_CLIENT: ClientId = ClientId(0);

    pub fn encode_payload(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.version.encode(&mut out)?;
        self.client_id.encode(&mut out)?;
        Ok(out)
    }

    pub fn decode_payload(mut bytes: &[u8]) -> io::Result<HandshakeRequest> {
        let input = &mut bytes;
        let request = HandshakeRequest {
            version:   u32::decode(input)?,
            client_id: ClientId::decode(input)?,
        };
        if !input.is_empty() {
            return Err(invalid_data("trailing bytes after handshake"));
        }
        Ok(request)
    }
}

/// Handshake outcome.  On reconnection `agents` carries the full state of
/// every owned agent in creation order, and `semaphore_ids` the owned
/// semaphores.
#[derive(Clone, Debug)]
pub struct HandshakeResponse {
    pub status:        Status,
    pub client_id:     ClientId,
    pub time:          SimTime,
    pub permissions:   u64,
    pub agents:        Vec<AgentState>,
    pub semaphore_ids: Vec<SemaphoreId>,
}

impl HandshakeResponse {
    /// A rejection with empty identity fields.
    pub fn rejected(status: Status) -> HandshakeResponse {
        HandshakeResponse {
            status,
            client_id: ClientId(0),
            time: SimTime::ZERO,
            permissions: 0,
            agents: Vec::new(),
            semaphore_ids: Vec::new(),
        }
    }

    pub fn encode_payload(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.status.encode(&mut out)?;
        self.client_id.encode(&mut out)?;
        self.time.encode(&mut out)?;
        self.permissions.encode(&mut out)?;
        write_agent_states(&mut out, &self.agents)?;
        self.semaphore_ids.encode(&mut out)?;
        Ok(out)
    }

    pub fn decode_payload(mut bytes: &[u8], dims: &ProtoDims) -> io::Result<HandshakeResponse> {
        let input = &mut bytes;
        Ok(HandshakeResponse {
            status:        Status::decode(input)?,
            client_id:     ClientId::decode(input)?,
            time:          SimTime::decode(input)?,
            permissions:   u64::decode(input)?,
            agents:        read_agent_states(input, dims)?,
            semaphore_ids: Vec::<SemaphoreId>::decode(input)?,
        })
    }
}

// ── Agent lifecycle ───────────────────────────────────────────────────────────

/// Requests that carry nothing but an agent id (`REMOVE_AGENT`,
/// `DO_NOTHING`, `IS_ACTIVE`).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct SingleAgentRequest {
    pub agent_id: AgentId,
}

impl SingleAgentRequest {
    pub fn encode_payload(&self) -> io::Result<Vec<u8>> {
        self.agent_id.encode_to_vec()
    }

    pub fn decode_payload(bytes: &[u8]) -> io::Result<SingleAgentRequest> {
        Ok(SingleAgentRequest { agent_id: AgentId::decode_from_slice(bytes)? })
    }
}

/// `ADD_AGENT` response: the new agent's full state on success.
#[derive(Clone, Debug)]
pub struct AddAgentResponse {
    pub status: Status,
    pub agent:  Option<AgentState>,
}

impl AddAgentResponse {
    pub fn encode_payload(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.status.encode(&mut out)?;
        match &self.agent {
            Some(agent) => {
                true.encode(&mut out)?;
                agent.write_observable(&mut out)?;
            }
            None => false.encode(&mut out)?,
        }
        Ok(out)
    }

    pub fn decode_payload(mut bytes: &[u8], dims: &ProtoDims) -> io::Result<AddAgentResponse> {
        let input = &mut bytes;
        let status = Status::decode(input)?;
        let agent = if bool::decode(input)? {
            Some(AgentState::read_observable(
                input,
                dims.scent_dim,
                dims.vision_len(),
            )?)
        } else {
            None
        };
        Ok(AddAgentResponse { status, agent })
    }
}

// ── Actions ───────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct MoveRequest {
    pub agent_id:  AgentId,
    pub direction: Direction,
    pub steps:     u32,
}

impl MoveRequest {
    pub fn encode_payload(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.agent_id.encode(&mut out)?;
        self.direction.encode(&mut out)?;
        self.steps.encode(&mut out)?;
        Ok(out)
    }

    pub fn decode_payload(mut bytes: &[u8]) -> io::Result<MoveRequest> {
        let input = &mut bytes;
        Ok(MoveRequest {
            agent_id:  AgentId::decode(input)?,
            direction: Direction::decode(input)?,
            steps:     u32::decode(input)?,
        })
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct TurnRequest {
    pub agent_id: AgentId,
    pub turn:     TurnDirection,
}

impl TurnRequest {
    pub fn encode_payload(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.agent_id.encode(&mut out)?;
        self.turn.encode(&mut out)?;
        Ok(out)
    }

    pub fn decode_payload(mut bytes: &[u8]) -> io::Result<TurnRequest> {
        let input = &mut bytes;
        Ok(TurnRequest {
            agent_id: AgentId::decode(input)?,
            turn:     TurnDirection::decode(input)?,
        })
    }
}

// ── Map and registry queries ──────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct GetMapRequest {
    pub bounds: BoundingBox,
}

impl GetMapRequest {
    pub fn encode_payload(&self) -> io::Result<Vec<u8>> {
        self.bounds.encode_to_vec()
    }

    pub fn decode_payload(bytes: &[u8]) -> io::Result<GetMapRequest> {
        Ok(GetMapRequest { bounds: BoundingBox::decode_from_slice(bytes)? })
    }
}

#[derive(Clone, Debug)]
pub struct GetMapResponse {
    pub status:  Status,
    pub patches: Vec<PatchSnapshot>,
}

impl GetMapResponse {
    pub fn encode_payload(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.status.encode(&mut out)?;
        (self.patches.len() as u32).encode(&mut out)?;
        for patch in &self.patches {
            write_patch_snapshot(&mut out, patch)?;
        }
        Ok(out)
    }

    pub fn decode_payload(mut bytes: &[u8], dims: &ProtoDims) -> io::Result<GetMapResponse> {
        let input = &mut bytes;
        let status = Status::decode(input)?;
        let count = u32::decode(input)?;
        let mut patches = Vec::with_capacity(count as usize);
        for _ in 0..count {
            patches.push(read_patch_snapshot(input, dims)?);
        }
        Ok(GetMapResponse { status, patches })
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GetAgentIdsResponse {
    pub status: Status,
    pub ids:    Vec<AgentId>,
}

impl GetAgentIdsResponse {
    pub fn encode_payload(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.status.encode(&mut out)?;
        self.ids.encode(&mut out)?;
        Ok(out)
    }

    pub fn decode_payload(mut bytes: &[u8]) -> io::Result<GetAgentIdsResponse> {
        let input = &mut bytes;
        Ok(GetAgentIdsResponse {
            status: Status::decode(input)?,
            ids:    Vec::<AgentId>::decode(input)?,
        })
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GetAgentStatesRequest {
    pub ids: Vec<AgentId>,
}

impl GetAgentStatesRequest {
    pub fn encode_payload(&self) -> io::Result<Vec<u8>> {
        self.ids.encode_to_vec()
    }

    pub fn decode_payload(bytes: &[u8]) -> io::Result<GetAgentStatesRequest> {
        Ok(GetAgentStatesRequest { ids: Vec::<AgentId>::decode_from_slice(bytes)? })
    }
}

#[derive(Clone, Debug)]
pub struct GetAgentStatesResponse {
    pub status: Status,
    pub states: Vec<AgentState>,
}

impl GetAgentStatesResponse {
    pub fn encode_payload(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.status.encode(&mut out)?;
        write_agent_states(&mut out, &self.states)?;
        Ok(out)
    }

    pub fn decode_payload(
        mut bytes: &[u8],
        dims: &ProtoDims,
    ) -> io::Result<GetAgentStatesResponse> {
        let input = &mut bytes;
        Ok(GetAgentStatesResponse {
            status: Status::decode(input)?,
            states: read_agent_states(input, dims)?,
        })
    }
}

// ── Activity ──────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct SetActiveRequest {
    pub agent_id: AgentId,
    pub active:   bool,
}

impl SetActiveRequest {
    pub fn encode_payload(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.agent_id.encode(&mut out)?;
        self.active.encode(&mut out)?;
        Ok(out)
    }

    pub fn decode_payload(mut bytes: &[u8]) -> io::Result<SetActiveRequest> {
        let input = &mut bytes;
        Ok(SetActiveRequest {
            agent_id: AgentId::decode(input)?,
            active:   bool::decode(input)?,
        })
    }
}

/// `IS_ACTIVE` answer: `status` reports lookup success, `active` the flag.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct IsActiveResponse {
    pub status: Status,
    pub active: bool,
}

impl IsActiveResponse {
    pub fn encode_payload(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.status.encode(&mut out)?;
        self.active.encode(&mut out)?;
        Ok(out)
    }

    pub fn decode_payload(mut bytes: &[u8]) -> io::Result<IsActiveResponse> {
        let input = &mut bytes;
        Ok(IsActiveResponse {
            status: Status::decode(input)?,
            active: bool::decode(input)?,
        })
    }
}

// ── Semaphores ────────────────────────────────────────────────────────────────

/// Requests carrying one semaphore id (`REMOVE_SEMAPHORE`, `SIGNAL_SEMAPHORE`).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct SemaphoreRequest {
    pub semaphore_id: SemaphoreId,
}

impl SemaphoreRequest {
    pub fn encode_payload(&self) -> io::Result<Vec<u8>> {
        self.semaphore_id.encode_to_vec()
    }

    pub fn decode_payload(bytes: &[u8]) -> io::Result<SemaphoreRequest> {
        Ok(SemaphoreRequest { semaphore_id: SemaphoreId::decode_from_slice(bytes)? })
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct AddSemaphoreResponse {
    pub status:       Status,
    pub semaphore_id: SemaphoreId,
}

impl AddSemaphoreResponse {
    pub fn encode_payload(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.status.encode(&mut out)?;
        self.semaphore_id.encode(&mut out)?;
        Ok(out)
    }

    pub fn decode_payload(mut bytes: &[u8]) -> io::Result<AddSemaphoreResponse> {
        let input = &mut bytes;
        Ok(AddSemaphoreResponse {
            status:       Status::decode(input)?,
            semaphore_id: SemaphoreId::decode(input)?,
        })
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GetSemaphoresResponse {
    pub status:     Status,
    pub semaphores: Vec<(SemaphoreId, bool)>,
}

impl GetSemaphoresResponse {
    pub fn encode_payload(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.status.encode(&mut out)?;
        self.semaphores.encode(&mut out)?;
        Ok(out)
    }

    pub fn decode_payload(mut bytes: &[u8]) -> io::Result<GetSemaphoresResponse> {
        let input = &mut bytes;
        Ok(GetSemaphoresResponse {
            status:     Status::decode(input)?,
            semaphores: Vec::<(SemaphoreId, bool)>::decode(input)?,
        })
    }
}

// ── Step broadcast ────────────────────────────────────────────────────────────

/// Sent on every connection after a committed turn: the new time plus the
/// receiving client's owned agents, ids and states in creation order.
#[derive(Clone, Debug)]
pub struct StepBroadcast {
    pub status: Status,
    pub time:   SimTime,
    pub ids:    Vec<AgentId>,
    pub states: Vec<AgentState>,
}

impl StepBroadcast {
    pub fn encode_payload(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.status.encode(&mut out)?;
        self.time.encode(&mut out)?;
        self.ids.encode(&mut out)?;
        write_agent_states(&mut out, &self.states)?;
        Ok(out)
    }

    pub fn decode_payload(mut bytes: &[u8], dims: &ProtoDims) -> io::Result<StepBroadcast> {
        let input = &mut bytes;
        Ok(StepBroadcast {
            status: Status::decode(input)?,
            time:   SimTime::decode(input)?,
            ids:    Vec::<AgentId>::decode(input)?,
            states: read_agent_states(input, dims)?,
        })
    }
}
