//! The process-local handle registry.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use gw_client::Client;
use gw_core::{AgentId, Status};
use gw_energy::SimulatorConfig;
use gw_server::{Server, ServerConfig};
use gw_sim::Simulator;

/// Generate an opaque handle newtype.
macro_rules! handle_type {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
        pub struct $name(pub u64);
    };
}

handle_type! {
    /// Opaque reference to a registered simulator.
    SimulatorHandle
}
handle_type! {
    /// Opaque reference to a running server.
    ServerHandle
}
handle_type! {
    /// Opaque reference to a connected client.
    ClientHandle
}

#[derive(Debug, thiserror::Error)]
pub enum HandleError {
    #[error("handle does not refer to a live object")]
    Dead,

    #[error("destination buffer holds {got} floats, need {need}")]
    BufferSize { need: usize, got: usize },

    #[error("simulator refused: {0}")]
    Sim(Status),

    #[error("simulator failed to start: {0}")]
    Construct(#[from] gw_sim::SimError),

    #[error("server failed to start: {0}")]
    Server(#[from] gw_server::ServerError),

    #[error("client failed to connect: {0}")]
    Client(#[from] gw_client::ClientError),
}

pub type HandleResult<T> = Result<T, HandleError>;

/// One registry per process (or per embedding, if a binding prefers
/// isolation — nothing here is global).
#[derive(Default)]
pub struct Registry {
    inner: Mutex<Slots>,
}

#[derive(Default)]
struct Slots {
    simulators: FxHashMap<u64, Arc<Simulator>>,
    servers:    FxHashMap<u64, Server>,
    clients:    FxHashMap<u64, Client>,
    next:       u64,
}

impl Slots {
    fn allocate(&mut self) -> u64 {
        let handle = self.next;
        self.next += 1;
        handle
    }
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    // ── Simulators ────────────────────────────────────────────────────────

    /// Validate `config`, build a simulator, and register it.
    pub fn create_simulator(&self, config: SimulatorConfig) -> HandleResult<SimulatorHandle> {
        let simulator = Arc::new(Simulator::new(config)?);
        let mut slots = self.inner.lock();
        let handle = slots.allocate();
        slots.simulators.insert(handle, simulator);
        Ok(SimulatorHandle(handle))
    }

    /// Register an existing simulator (e.g. one restored from a stream).
    pub fn adopt_simulator(&self, simulator: Arc<Simulator>) -> SimulatorHandle {
        let mut slots = self.inner.lock();
        let handle = slots.allocate();
        slots.simulators.insert(handle, simulator);
        SimulatorHandle(handle)
    }

    /// The shared simulator behind a handle.
    pub fn simulator(&self, handle: SimulatorHandle) -> HandleResult<Arc<Simulator>> {
        self.inner
            .lock()
            .simulators
            .get(&handle.0)
            .cloned()
            .ok_or(HandleError::Dead)
    }

    /// Drop a simulator handle.  Servers started from it keep their own
    /// reference and are unaffected.
    pub fn destroy_simulator(&self, handle: SimulatorHandle) -> bool {
        self.inner.lock().simulators.remove(&handle.0).is_some()
    }

    // ── Servers ───────────────────────────────────────────────────────────

    pub fn create_server(
        &self,
        simulator: SimulatorHandle,
        address: (&str, u16),
        config: ServerConfig,
    ) -> HandleResult<ServerHandle> {
        let simulator = self.simulator(simulator)?;
        let server = Server::start(simulator, address, config)?;
        let mut slots = self.inner.lock();
        let handle = slots.allocate();
        slots.servers.insert(handle, server);
        Ok(ServerHandle(handle))
    }

    pub fn server_address(&self, handle: ServerHandle) -> HandleResult<std::net::SocketAddr> {
        self.inner
            .lock()
            .servers
            .get(&handle.0)
            .map(Server::address)
            .ok_or(HandleError::Dead)
    }

    /// Stop and forget a server.
    pub fn destroy_server(&self, handle: ServerHandle) -> bool {
        let server = self.inner.lock().servers.remove(&handle.0);
        match server {
            Some(mut server) => {
                server.stop();
                true
            }
            None => false,
        }
    }

    // ── Clients ───────────────────────────────────────────────────────────

    /// Connect to a remote server and register the resulting client.
    pub fn connect_client(
        &self,
        address: (&str, u16),
        dims: gw_proto::message::ProtoDims,
        handler: Arc<dyn gw_client::ClientHandler>,
    ) -> HandleResult<ClientHandle> {
        let client = Client::connect(address, dims, handler)?;
        Ok(self.adopt_client(client))
    }

    pub fn adopt_client(&self, client: Client) -> ClientHandle {
        let mut slots = self.inner.lock();
        let handle = slots.allocate();
        slots.clients.insert(handle, client);
        ClientHandle(handle)
    }

    /// Run `f` against the client behind `handle`.
    pub fn with_client<T>(
        &self,
        handle: ClientHandle,
        f: impl FnOnce(&Client) -> T,
    ) -> HandleResult<T> {
        let slots = self.inner.lock();
        let client = slots.clients.get(&handle.0).ok_or(HandleError::Dead)?;
        Ok(f(client))
    }

    /// Disconnect and forget a client.
    pub fn destroy_client(&self, handle: ClientHandle) -> bool {
        let client = self.inner.lock().clients.remove(&handle.0);
        match client {
            Some(mut client) => {
                client.stop();
                true
            }
            None => false,
        }
    }

    // ── Observation copy-out ──────────────────────────────────────────────

    /// Copy an agent's vision tensor into `out`.
    pub fn copy_vision(
        &self,
        simulator: SimulatorHandle,
        agent: AgentId,
        out: &mut [f32],
    ) -> HandleResult<()> {
        let simulator = self.simulator(simulator)?;
        let state = simulator.agent_state(agent).map_err(HandleError::Sim)?;
        if out.len() != state.vision.len() {
            return Err(HandleError::BufferSize { need: state.vision.len(), got: out.len() });
        }
        out.copy_from_slice(&state.vision);
        Ok(())
    }

    /// Copy an agent's scent vector into `out`.
    pub fn copy_scent(
        &self,
        simulator: SimulatorHandle,
        agent: AgentId,
        out: &mut [f32],
    ) -> HandleResult<()> {
        let simulator = self.simulator(simulator)?;
        let state = simulator.agent_state(agent).map_err(HandleError::Sim)?;
        if out.len() != state.scent.len() {
            return Err(HandleError::BufferSize { need: state.scent.len(), got: out.len() });
        }
        out.copy_from_slice(&state.scent);
        Ok(())
    }
}
