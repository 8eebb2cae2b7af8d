//! End-to-end tests against a real in-process server.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use gw_core::{ActionPolicy, BoundingBox, Direction, MoveConflictPolicy, Position};
use gw_energy::SimulatorConfig;
use gw_proto::message::{ProtoDims, StepBroadcast};
use gw_server::{Server, ServerConfig};
use gw_sim::Simulator;

use crate::handler::NoopHandler;
use crate::{Client, ClientError, ClientHandler};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn test_config() -> SimulatorConfig {
    SimulatorConfig {
        max_steps_per_movement:      2,
        scent_dim:                   3,
        color_dim:                   3,
        vision_range:                2,
        allowed_movement_directions: [ActionPolicy::Allowed; 4],
        allowed_rotations:           [ActionPolicy::Allowed; 4],
        no_op_allowed:               true,
        patch_size:                  8,
        mcmc_iterations:             0,
        item_types:                  Vec::new(),
        agent_color:                 vec![1.0, 1.0, 1.0],
        collision_policy:            MoveConflictPolicy::FirstComeFirstServed,
        scent_decay:                 0.9,
        scent_diffusion:             0.1,
        deleted_item_lifetime:       100,
        agent_field_of_view:         2.0 * std::f32::consts::PI,
        random_seed:                 0,
    }
}

/// Spin up a server on an ephemeral port.
fn start_server(workers: usize) -> (Server, std::net::SocketAddr, ProtoDims) {
    let config = test_config();
    let dims = ProtoDims::from_config(&config);
    let simulator = Arc::new(Simulator::new(config).unwrap());
    let server = Server::start(
        simulator,
        ("127.0.0.1", 0),
        ServerConfig { worker_count: workers, ..ServerConfig::default() },
    )
    .unwrap();
    let address = server.address();
    (server, address, dims)
}

fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}

// ── Basic round trips ─────────────────────────────────────────────────────────

#[test]
fn add_agent_and_act() {
    let (mut server, address, dims) = start_server(2);
    let client = Client::connect(address, dims, Arc::new(NoopHandler)).unwrap();

    let agent = client.add_agent().unwrap();
    assert_eq!(agent.position, Position::new(0, 0));

    // Sole agent: each action commits a turn.
    client.move_agent(agent.id, Direction::Up, 1).unwrap();
    client.turn_agent(agent.id, gw_core::TurnDirection::Right).unwrap();
    client.do_nothing(agent.id).unwrap();

    let states = client.get_agent_states(&[agent.id]).unwrap();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].position, Position::new(0, 1));
    assert_eq!(states[0].direction, Direction::Right);

    drop(client);
    server.stop();
}

#[test]
fn get_map_returns_fixed_patches() {
    let (mut server, address, dims) = start_server(2);
    let client = Client::connect(address, dims, Arc::new(NoopHandler)).unwrap();

    let patches = client
        .get_map(BoundingBox::new(Position::new(-8, -8), Position::new(7, 7)))
        .unwrap();
    assert_eq!(patches.len(), 4);
    assert!(patches.iter().all(|patch| patch.fixed));

    drop(client);
    server.stop();
}

#[test]
fn unknown_agent_is_refused() {
    let (mut server, address, dims) = start_server(2);
    let client = Client::connect(address, dims, Arc::new(NoopHandler)).unwrap();

    let result = client.do_nothing(gw_core::AgentId(42));
    assert!(matches!(
        result,
        Err(ClientError::Refused(gw_core::Status::InvalidAgentId))
    ));

    drop(client);
    server.stop();
}

// ── Step broadcast ────────────────────────────────────────────────────────────

struct StepCounter {
    steps:     AtomicU64,
    last_time: AtomicU64,
    lost:      AtomicBool,
}

impl ClientHandler for StepCounter {
    fn on_step(&self, broadcast: &StepBroadcast) {
        self.steps.fetch_add(1, Ordering::SeqCst);
        self.last_time.store(broadcast.time.0, Ordering::SeqCst);
    }

    fn on_lost_connection(&self) {
        self.lost.store(true, Ordering::SeqCst);
    }
}

#[test]
fn steps_are_broadcast_to_all_clients() {
    let (mut server, address, dims) = start_server(4);

    let counter_a = Arc::new(StepCounter {
        steps:     AtomicU64::new(0),
        last_time: AtomicU64::new(0),
        lost:      AtomicBool::new(false),
    });
    let counter_b = Arc::new(StepCounter {
        steps:     AtomicU64::new(0),
        last_time: AtomicU64::new(0),
        lost:      AtomicBool::new(false),
    });

    let driver = Client::connect(address, dims, Arc::clone(&counter_a) as _).unwrap();
    let watcher = Client::connect(address, dims, Arc::clone(&counter_b) as _).unwrap();

    let agent = driver.add_agent().unwrap();
    for _ in 0..3 {
        driver.do_nothing(agent.id).unwrap();
    }

    // Both connections receive all three broadcasts.
    assert!(wait_until(Duration::from_secs(5), || {
        counter_a.steps.load(Ordering::SeqCst) == 3
            && counter_b.steps.load(Ordering::SeqCst) == 3
    }));
    assert_eq!(counter_a.last_time.load(Ordering::SeqCst), 3);

    drop(driver);
    drop(watcher);
    server.stop();
}

#[test]
fn broadcast_carries_only_owned_agents() {
    let (mut server, address, dims) = start_server(4);

    struct OwnedCheck {
        expected: parking_lot::Mutex<Vec<gw_core::AgentId>>,
        ok:       AtomicBool,
        seen:     AtomicU64,
    }
    impl ClientHandler for OwnedCheck {
        fn on_step(&self, broadcast: &StepBroadcast) {
            let expected = self.expected.lock();
            if broadcast.ids == *expected {
                self.ok.store(true, Ordering::SeqCst);
            }
            self.seen.fetch_add(1, Ordering::SeqCst);
        }
    }

    let check = Arc::new(OwnedCheck {
        expected: parking_lot::Mutex::new(Vec::new()),
        ok:       AtomicBool::new(false),
        seen:     AtomicU64::new(0),
    });

    let owner = Client::connect(address, dims, Arc::clone(&check) as _).unwrap();
    let other = Client::connect(address, dims, Arc::new(NoopHandler)).unwrap();

    let mine = owner.add_agent().unwrap();
    let theirs = other.add_agent().unwrap();
    *check.expected.lock() = vec![mine.id];

    owner.do_nothing(mine.id).unwrap();
    other.do_nothing(theirs.id).unwrap();

    assert!(wait_until(Duration::from_secs(5), || {
        check.seen.load(Ordering::SeqCst) >= 1
    }));
    assert!(check.ok.load(Ordering::SeqCst), "broadcast leaked foreign agents");

    drop(owner);
    drop(other);
    server.stop();
}

// ── Reconnection ──────────────────────────────────────────────────────────────

#[test]
fn reconnect_reclaims_agents_in_order() {
    // S4 / P6: kill the socket, reconnect with the same id, get the same
    // agents back in the same order.
    let (mut server, address, dims) = start_server(4);

    let mut client = Client::connect(address, dims, Arc::new(NoopHandler)).unwrap();
    let client_id = client.client_id();
    let first = client.add_agent().unwrap();
    let second = client.add_agent().unwrap();
    let positions = {
        let states = client.get_agent_states(&[first.id, second.id]).unwrap();
        (states[0].position, states[1].position)
    };

    client.stop();
    drop(client);

    // The server notices the drop asynchronously; reconnect may race the
    // cleanup, so retry until the old connection is gone.
    let reconnected = {
        let mut attempt = None;
        for _ in 0..100 {
            match Client::reconnect(address, client_id, dims, Arc::new(NoopHandler)) {
                Ok(client) => {
                    attempt = Some(client);
                    break;
                }
                Err(_) => std::thread::sleep(Duration::from_millis(20)),
            }
        }
        attempt.expect("reconnection kept failing")
    };

    assert_eq!(reconnected.client_id(), client_id);
    let info = reconnected.connection_info();
    let ids: Vec<_> = info.agents.iter().map(|agent| agent.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);
    assert_eq!(info.agents[0].position, positions.0);
    assert_eq!(info.agents[1].position, positions.1);

    // P6: get_agent_ids agrees with the handshake.
    assert_eq!(reconnected.get_agent_ids().unwrap(), vec![first.id, second.id]);

    drop(reconnected);
    server.stop();
}

#[test]
fn lost_connection_fires_callback() {
    let (mut server, address, dims) = start_server(2);
    let counter = Arc::new(StepCounter {
        steps:     AtomicU64::new(0),
        last_time: AtomicU64::new(0),
        lost:      AtomicBool::new(false),
    });
    let client = Client::connect(address, dims, Arc::clone(&counter) as _).unwrap();

    server.stop();

    assert!(wait_until(Duration::from_secs(5), || {
        counter.lost.load(Ordering::SeqCst)
    }));
    assert!(client.is_lost());
    assert!(matches!(client.get_agent_ids(), Err(ClientError::Lost)));
}

#[test]
fn remove_client_cascades_and_frees_the_id() {
    let (mut server, address, dims) = start_server(2);
    let client = Client::connect(address, dims, Arc::new(NoopHandler)).unwrap();
    let client_id = client.client_id();
    client.add_agent().unwrap();
    client.remove_client().unwrap();

    // The record is gone: reconnecting with that id must be refused.
    let result = Client::reconnect(address, client_id, dims, Arc::new(NoopHandler));
    assert!(matches!(result, Err(ClientError::HandshakeRejected(_))));

    server.stop();
}
