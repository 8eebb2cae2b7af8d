//! The TCP transport: listener, readiness queue, worker pool, broadcast.

use std::io::Read;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, info, warn};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use gw_core::{ClientId, Status};
use gw_proto::message::{HandshakeRequest, StatusResponse};
use gw_proto::{Opcode, read_frame, write_frame};
use gw_sim::{Simulator, StepEvent, StepObserver};

use crate::dispatch::{Outcome, ServerCore};
use crate::permissions::Permissions;
use crate::record::ClientDirectory;
use crate::{ServerError, ServerResult};

/// How long a worker waits on one idle connection before rotating to the
/// next (the readiness poll quantum).
const POLL_QUANTUM: Duration = Duration::from_millis(20);

/// Reading a frame that has started arriving, or writing any frame, must
/// finish within this bound or the peer is treated as lost.
const WIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Server tuning knobs.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Fixed worker-pool size.
    pub worker_count: usize,
    /// Permission bits granted to newly handshaken clients.
    pub default_permissions: Permissions,
}

impl Default for ServerConfig {
    fn default() -> ServerConfig {
        ServerConfig {
            worker_count:        4,
            default_permissions: Permissions::standard(),
        }
    }
}

// ── Connections ───────────────────────────────────────────────────────────────

struct Connection {
    stream:    TcpStream,
    /// Serializes responses and broadcasts on this socket.
    send_lock: Mutex<()>,
    client:    ClientId,
}

impl Connection {
    /// Write one frame under the send lock.
    fn send(&self, opcode: Opcode, payload: &[u8]) -> ServerResult<()> {
        let _guard = self.send_lock.lock();
        write_frame(&mut (&self.stream), opcode, payload)?;
        Ok(())
    }
}

/// Unit of work flowing through the readiness queue.
enum Task {
    /// Fresh socket, handshake not yet performed.
    Handshake(TcpStream),
    /// Established connection ready to be polled for its next request.
    Serve(Arc<Connection>),
}

struct Shared {
    core:        ServerCore,
    connections: Mutex<FxHashMap<ClientId, Arc<Connection>>>,
    queue:       Sender<Task>,
    running:     AtomicBool,
}

impl Shared {
    fn is_connected(&self, client: ClientId) -> bool {
        self.connections.lock().contains_key(&client)
    }

    /// Drop a connection; the client record stays for reconnection.
    fn disconnect(&self, connection: &Arc<Connection>) {
        let mut connections = self.connections.lock();
        // A reconnect may already have replaced this entry; only evict the
        // exact connection being torn down.
        if connections
            .get(&connection.client)
            .is_some_and(|current| Arc::ptr_eq(current, connection))
        {
            connections.remove(&connection.client);
        }
        drop(connections);
        let _ = connection.stream.shutdown(std::net::Shutdown::Both);
        debug!("client {} disconnected; agents orphaned", connection.client);
    }
}

/// Broadcast fan-out, registered as the simulator's step observer.
struct Broadcaster {
    shared: std::sync::Weak<Shared>,
}

impl StepObserver for Broadcaster {
    fn on_step(&self, event: &StepEvent) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let targets: Vec<Arc<Connection>> =
            shared.connections.lock().values().cloned().collect();
        for connection in targets {
            let payload = match shared.core.step_payload(connection.client, event) {
                Ok(payload) => payload,
                Err(error) => {
                    warn!("step payload for {} failed: {error}", connection.client);
                    continue;
                }
            };
            if let Err(error) = connection.send(Opcode::Step, &payload) {
                warn!("step broadcast to {} failed: {error}", connection.client);
                shared.disconnect(&connection);
            }
        }
    }
}

// ── Server ────────────────────────────────────────────────────────────────────

/// A running server: listener thread plus worker pool over one simulator.
pub struct Server {
    shared:   Arc<Shared>,
    address:  SocketAddr,
    listener: Option<JoinHandle<()>>,
    workers:  Vec<JoinHandle<()>>,
}

impl Server {
    /// Bind, spawn the listener and workers, and hook the step broadcast
    /// into the simulator.
    pub fn start<A: ToSocketAddrs>(
        simulator: Arc<Simulator>,
        address: A,
        config: ServerConfig,
    ) -> ServerResult<Server> {
        Server::start_with_directory(simulator, ClientDirectory::new(), address, config)
    }

    /// Like [`Server::start`], but with a client directory restored from a
    /// saved deployment.
    pub fn start_with_directory<A: ToSocketAddrs>(
        simulator: Arc<Simulator>,
        directory: ClientDirectory,
        address: A,
        config: ServerConfig,
    ) -> ServerResult<Server> {
        let listener = TcpListener::bind(address)?;
        let local_address = listener.local_addr()?;

        let (queue, tasks) = unbounded::<Task>();
        let core = ServerCore::new(Arc::clone(&simulator), config.default_permissions);
        *core.directory.lock() = directory;

        let shared = Arc::new(Shared {
            core,
            connections: Mutex::new(FxHashMap::default()),
            queue,
            running: AtomicBool::new(true),
        });

        simulator.add_observer(Box::new(Broadcaster { shared: Arc::downgrade(&shared) }));

        let accept_shared = Arc::clone(&shared);
        let listener_thread = std::thread::spawn(move || {
            accept_loop(listener, accept_shared);
        });

        let mut workers = Vec::with_capacity(config.worker_count.max(1));
        for _ in 0..config.worker_count.max(1) {
            let worker_shared = Arc::clone(&shared);
            let worker_tasks = tasks.clone();
            workers.push(std::thread::spawn(move || {
                worker_loop(worker_shared, worker_tasks);
            }));
        }

        info!("server listening on {local_address}");
        Ok(Server {
            shared,
            address: local_address,
            listener: Some(listener_thread),
            workers,
        })
    }

    /// The bound address (useful with port 0).
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Number of currently connected clients.
    pub fn connection_count(&self) -> usize {
        self.shared.connections.lock().len()
    }

    /// Save the deployment: the whole simulator stream followed by the
    /// client directory.
    pub fn save<W: std::io::Write>(&self, out: &mut W) -> ServerResult<()> {
        self.shared.core.simulator.save(out)?;
        self.shared.core.directory.lock().write_to(out)?;
        Ok(())
    }

    /// Read back a deployment saved by [`Server::save`].
    pub fn load_deployment<R: Read>(
        input: &mut R,
        config: gw_energy::SimulatorConfig,
    ) -> ServerResult<(Arc<Simulator>, ClientDirectory)> {
        let simulator = Arc::new(Simulator::load(input, config)?);
        let directory = ClientDirectory::read_from(input)?;
        Ok((simulator, directory))
    }

    /// Stop accepting, drain the workers, and close every connection.  No
    /// graceful goodbye is sent; clients observe a lost connection.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        // Closing the sockets first frees any worker parked mid-read.
        for connection in self.shared.connections.lock().values() {
            let _ = connection.stream.shutdown(std::net::Shutdown::Both);
        }
        // Unblock the accept call.
        let _ = TcpStream::connect(self.address);
        if let Some(handle) = self.listener.take() {
            let _ = handle.join();
        }
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        self.shared.connections.lock().clear();
        info!("server stopped");
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if self.shared.running.load(Ordering::SeqCst) {
            self.stop();
        }
    }
}

// ── Listener ──────────────────────────────────────────────────────────────────

fn accept_loop(listener: TcpListener, shared: Arc<Shared>) {
    loop {
        let accepted = listener.accept();
        if !shared.running.load(Ordering::SeqCst) {
            return;
        }
        match accepted {
            Ok((stream, peer)) => {
                debug!("accepted connection from {peer}");
                let _ = stream.set_nodelay(true);
                let _ = stream.set_write_timeout(Some(WIRE_TIMEOUT));
                if shared.queue.send(Task::Handshake(stream)).is_err() {
                    return;
                }
            }
            Err(error) => {
                warn!("accept failed: {error}");
            }
        }
    }
}

// ── Workers ───────────────────────────────────────────────────────────────────

fn worker_loop(shared: Arc<Shared>, tasks: Receiver<Task>) {
    while shared.running.load(Ordering::SeqCst) {
        let task = match tasks.recv_timeout(POLL_QUANTUM) {
            Ok(task) => task,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => return,
        };
        match task {
            Task::Handshake(stream) => perform_handshake(&shared, stream),
            Task::Serve(connection) => serve_one(&shared, connection),
        }
    }
}

/// First frame on a fresh socket must be a well-formed handshake.
fn perform_handshake(shared: &Shared, stream: TcpStream) {
    let _ = stream.set_read_timeout(Some(WIRE_TIMEOUT));
    let frame = read_frame(&mut (&stream));
    let (opcode, payload) = match frame {
        Ok(frame) => frame,
        Err(error) => {
            debug!("handshake read failed: {error}");
            return;
        }
    };
    if opcode != Opcode::Handshake {
        debug!("first frame was {opcode:?}, closing");
        return;
    }
    let request = match HandshakeRequest::decode_payload(&payload) {
        Ok(request) => request,
        Err(_) => {
            let rejection = gw_proto::message::HandshakeResponse::rejected(
                Status::ServerParseMessageError,
            );
            if let Ok(bytes) = rejection.encode_payload() {
                let _ = write_frame(&mut (&stream), Opcode::Handshake, &bytes);
            }
            return;
        }
    };

    let (response, granted) = shared
        .core
        .handshake(request, |client| shared.is_connected(client));
    let Ok(bytes) = response.encode_payload() else {
        return;
    };
    if write_frame(&mut (&stream), Opcode::Handshake, &bytes).is_err() {
        return;
    }

    if let Some(client) = granted {
        info!("client {client} connected");
        let connection = Arc::new(Connection {
            stream,
            send_lock: Mutex::new(()),
            client,
        });
        shared
            .connections
            .lock()
            .insert(client, Arc::clone(&connection));
        let _ = shared.queue.send(Task::Serve(connection));
    }
}

/// Poll one connection for readiness; if a frame is waiting, serve it.
fn serve_one(shared: &Shared, connection: Arc<Connection>) {
    let stream = &connection.stream;
    let _ = stream.set_read_timeout(Some(POLL_QUANTUM));

    let mut probe = [0u8; 1];
    match stream.peek(&mut probe) {
        // Peer closed the socket.
        Ok(0) => {
            shared.disconnect(&connection);
            return;
        }
        Ok(_) => {}
        Err(error)
            if error.kind() == std::io::ErrorKind::WouldBlock
                || error.kind() == std::io::ErrorKind::TimedOut =>
        {
            requeue(shared, connection);
            return;
        }
        Err(_) => {
            shared.disconnect(&connection);
            return;
        }
    }

    // A frame has started arriving; finish reading it within the bound.
    let _ = stream.set_read_timeout(Some(WIRE_TIMEOUT));
    let (opcode, payload) = match read_frame(&mut (&*stream)) {
        Ok(frame) => frame,
        Err(error) => {
            debug!("client {}: unreadable frame ({error}); closing", connection.client);
            shared.disconnect(&connection);
            return;
        }
    };

    match shared.core.handle(connection.client, opcode, &payload) {
        Ok(Outcome::Reply(bytes)) => {
            if connection.send(opcode, &bytes).is_err() {
                shared.disconnect(&connection);
                return;
            }
            requeue(shared, connection);
        }
        Ok(Outcome::ReplyThenClose(bytes)) => {
            let _ = connection.send(opcode, &bytes);
            info!("client {} removed", connection.client);
            shared.disconnect(&connection);
        }
        // Malformed payload: report, then close the connection.
        Err(error) => {
            debug!("client {}: malformed {opcode:?} payload ({error})", connection.client);
            let reply = StatusResponse { status: Status::ServerParseMessageError };
            if let Ok(bytes) = reply.encode_payload() {
                let _ = connection.send(opcode, &bytes);
            }
            shared.disconnect(&connection);
        }
    }
}

fn requeue(shared: &Shared, connection: Arc<Connection>) {
    if shared.running.load(Ordering::SeqCst) {
        let _ = shared.queue.send(Task::Serve(connection));
    }
}
