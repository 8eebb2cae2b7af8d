//! The blocking client.

use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread::JoinHandle;

use log::{debug, warn};
use parking_lot::Mutex;

use gw_core::{AgentId, BoundingBox, ClientId, Direction, SemaphoreId, SimTime, Status, TurnDirection};
use gw_proto::message::*;
use gw_proto::{Opcode, PROTOCOL_VERSION, read_frame, write_frame};
use gw_sim::{AgentState, PatchSnapshot};

use crate::handler::ClientHandler;
use crate::waiters::WaitMap;
use crate::{ClientError, ClientResult};

/// What the server granted at handshake time.
#[derive(Clone, Debug)]
pub struct ConnectionInfo {
    pub client_id:   ClientId,
    pub time:        SimTime,
    pub permissions: u64,
    /// On reconnection: owned agents' states, creation order.
    pub agents: Vec<AgentState>,
    /// On reconnection: owned semaphores, creation order.
    pub semaphore_ids: Vec<SemaphoreId>,
}

struct Inner {
    stream:    TcpStream,
    send_lock: Mutex<()>,
    waiters:   WaitMap,
    dims:      ProtoDims,
    handler:   Arc<dyn ClientHandler>,
}

impl Inner {
    fn send_frame(&self, opcode: Opcode, payload: &[u8]) -> ClientResult<()> {
        let _guard = self.send_lock.lock();
        write_frame(&mut (&self.stream), opcode, payload)?;
        Ok(())
    }
}

/// A connection to a remote simulator.
pub struct Client {
    inner:    Arc<Inner>,
    info:     ConnectionInfo,
    listener: Option<JoinHandle<()>>,
}

impl Client {
    // ── Connection ────────────────────────────────────────────────────────

    /// Connect with a fresh identity.
    pub fn connect<A: ToSocketAddrs>(
        address: A,
        dims: ProtoDims,
        handler: Arc<dyn ClientHandler>,
    ) -> ClientResult<Client> {
        Client::handshake(address, HandshakeRequest::NEW_CLIENT, dims, handler)
    }

    /// Reconnect as a previously granted client id, reclaiming owned
    /// agents and semaphores.
    pub fn reconnect<A: ToSocketAddrs>(
        address: A,
        client_id: ClientId,
        dims: ProtoDims,
        handler: Arc<dyn ClientHandler>,
    ) -> ClientResult<Client> {
        Client::handshake(address, client_id, dims, handler)
    }

    fn handshake<A: ToSocketAddrs>(
        address: A,
        client_id: ClientId,
        dims: ProtoDims,
        handler: Arc<dyn ClientHandler>,
    ) -> ClientResult<Client> {
        let stream = TcpStream::connect(address)?;
        stream.set_nodelay(true)?;

        // The handshake happens synchronously, before the listener exists.
        let request = HandshakeRequest { version: PROTOCOL_VERSION, client_id };
        write_frame(&mut (&stream), Opcode::Handshake, &request.encode_payload()?)?;
        let (opcode, payload) = read_frame(&mut (&stream))?;
        if opcode != Opcode::Handshake {
            return Err(ClientError::Refused(Status::ClientParseMessageError));
        }
        let response = HandshakeResponse::decode_payload(&payload, &dims)?;
        if !response.status.is_ok() {
            return Err(ClientError::HandshakeRejected(response.status));
        }

        let info = ConnectionInfo {
            client_id:     response.client_id,
            time:          response.time,
            permissions:   response.permissions,
            agents:        response.agents,
            semaphore_ids: response.semaphore_ids,
        };
        let inner = Arc::new(Inner {
            stream,
            send_lock: Mutex::new(()),
            waiters: WaitMap::new(),
            dims,
            handler,
        });

        let listener_inner = Arc::clone(&inner);
        let listener = std::thread::spawn(move || listen_loop(listener_inner));

        Ok(Client { inner, info, listener: Some(listener) })
    }

    /// The identity granted at handshake (stable across reconnects).
    pub fn client_id(&self) -> ClientId {
        self.info.client_id
    }

    /// Handshake-time connection details.
    pub fn connection_info(&self) -> &ConnectionInfo {
        &self.info
    }

    /// `true` once the connection has died.
    pub fn is_lost(&self) -> bool {
        self.inner.waiters.is_lost()
    }

    /// Close the socket and join the listener thread.  The server keeps
    /// this client's record, so a later [`Client::reconnect`] with the same
    /// id reclaims everything.
    pub fn stop(&mut self) {
        let _ = self.inner.stream.shutdown(Shutdown::Both);
        if let Some(handle) = self.listener.take() {
            let _ = handle.join();
        }
    }

    // ── Request plumbing ──────────────────────────────────────────────────

    /// Send one frame and park until its response arrives.
    fn request(&self, opcode: Opcode, payload: &[u8]) -> ClientResult<Vec<u8>> {
        self.inner.waiters.register(opcode)?;
        if let Err(error) = self.inner.send_frame(opcode, payload) {
            self.inner.waiters.cancel(opcode);
            return Err(error);
        }
        self.inner.waiters.wait(opcode)
    }

    fn expect_ok(&self, opcode: Opcode, payload: &[u8]) -> ClientResult<()> {
        let response = StatusResponse::decode_payload(&self.request(opcode, payload)?)?;
        response
            .status
            .into_result()
            .map_err(ClientError::Refused)
    }

    // ── Agent operations ──────────────────────────────────────────────────

    pub fn add_agent(&self) -> ClientResult<AgentState> {
        let bytes = self.request(Opcode::AddAgent, &[])?;
        let response = AddAgentResponse::decode_payload(&bytes, &self.inner.dims)?;
        match response.agent {
            Some(agent) if response.status.is_ok() => Ok(agent),
            _ => Err(ClientError::Refused(response.status)),
        }
    }

    pub fn remove_agent(&self, agent_id: AgentId) -> ClientResult<()> {
        let request = SingleAgentRequest { agent_id };
        self.expect_ok(Opcode::RemoveAgent, &request.encode_payload()?)
    }

    pub fn move_agent(&self, agent_id: AgentId, direction: Direction, steps: u32) -> ClientResult<()> {
        let request = MoveRequest { agent_id, direction, steps };
        self.expect_ok(Opcode::Move, &request.encode_payload()?)
    }

    pub fn turn_agent(&self, agent_id: AgentId, turn: TurnDirection) -> ClientResult<()> {
        let request = TurnRequest { agent_id, turn };
        self.expect_ok(Opcode::Turn, &request.encode_payload()?)
    }

    pub fn do_nothing(&self, agent_id: AgentId) -> ClientResult<()> {
        let request = SingleAgentRequest { agent_id };
        self.expect_ok(Opcode::DoNothing, &request.encode_payload()?)
    }

    pub fn set_active(&self, agent_id: AgentId, active: bool) -> ClientResult<()> {
        let request = SetActiveRequest { agent_id, active };
        self.expect_ok(Opcode::SetActive, &request.encode_payload()?)
    }

    pub fn is_active(&self, agent_id: AgentId) -> ClientResult<bool> {
        let request = SingleAgentRequest { agent_id };
        let bytes = self.request(Opcode::IsActive, &request.encode_payload()?)?;
        let response = IsActiveResponse::decode_payload(&bytes)?;
        response
            .status
            .into_result()
            .map_err(ClientError::Refused)?;
        Ok(response.active)
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn get_map(&self, bounds: BoundingBox) -> ClientResult<Vec<PatchSnapshot>> {
        let request = GetMapRequest { bounds };
        let bytes = self.request(Opcode::GetMap, &request.encode_payload()?)?;
        let response = GetMapResponse::decode_payload(&bytes, &self.inner.dims)?;
        response
            .status
            .into_result()
            .map_err(ClientError::Refused)?;
        Ok(response.patches)
    }

    pub fn get_agent_ids(&self) -> ClientResult<Vec<AgentId>> {
        let bytes = self.request(Opcode::GetAgentIds, &[])?;
        let response = GetAgentIdsResponse::decode_payload(&bytes)?;
        response
            .status
            .into_result()
            .map_err(ClientError::Refused)?;
        Ok(response.ids)
    }

    pub fn get_agent_states(&self, ids: &[AgentId]) -> ClientResult<Vec<AgentState>> {
        let request = GetAgentStatesRequest { ids: ids.to_vec() };
        let bytes = self.request(Opcode::GetAgentStates, &request.encode_payload()?)?;
        let response = GetAgentStatesResponse::decode_payload(&bytes, &self.inner.dims)?;
        response
            .status
            .into_result()
            .map_err(ClientError::Refused)?;
        Ok(response.states)
    }

    // ── Semaphores ────────────────────────────────────────────────────────

    pub fn add_semaphore(&self) -> ClientResult<SemaphoreId> {
        let bytes = self.request(Opcode::AddSemaphore, &[])?;
        let response = AddSemaphoreResponse::decode_payload(&bytes)?;
        response
            .status
            .into_result()
            .map_err(ClientError::Refused)?;
        Ok(response.semaphore_id)
    }

    pub fn remove_semaphore(&self, semaphore_id: SemaphoreId) -> ClientResult<()> {
        let request = SemaphoreRequest { semaphore_id };
        self.expect_ok(Opcode::RemoveSemaphore, &request.encode_payload()?)
    }

    pub fn signal_semaphore(&self, semaphore_id: SemaphoreId) -> ClientResult<()> {
        let request = SemaphoreRequest { semaphore_id };
        self.expect_ok(Opcode::SignalSemaphore, &request.encode_payload()?)
    }

    pub fn get_semaphores(&self) -> ClientResult<Vec<(SemaphoreId, bool)>> {
        let bytes = self.request(Opcode::GetSemaphores, &[])?;
        let response = GetSemaphoresResponse::decode_payload(&bytes)?;
        response
            .status
            .into_result()
            .map_err(ClientError::Refused)?;
        Ok(response.semaphores)
    }

    // ── Detach ────────────────────────────────────────────────────────────

    /// Permanently remove this client and everything it owns, then close.
    pub fn remove_client(mut self) -> ClientResult<()> {
        let result = self.expect_ok(Opcode::RemoveClient, &[]);
        self.stop();
        result
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Response listener ─────────────────────────────────────────────────────────

fn listen_loop(inner: Arc<Inner>) {
    loop {
        let (opcode, payload) = match read_frame(&mut (&inner.stream)) {
            Ok(frame) => frame,
            Err(error) => {
                debug!("listener exiting: {error}");
                break;
            }
        };
        match opcode {
            Opcode::Step => match StepBroadcast::decode_payload(&payload, &inner.dims) {
                Ok(broadcast) => inner.handler.on_step(&broadcast),
                Err(error) => {
                    warn!("undecodable step broadcast: {error}");
                    break;
                }
            },
            _ => {
                if !inner.waiters.fulfill(opcode, payload) {
                    warn!("unsolicited {opcode:?} response dropped");
                }
            }
        }
    }
    inner.waiters.fail_all();
    inner.handler.on_lost_connection();
}
