//! Connect one randomly wandering agent to a running server.
//!
//! ```text
//! gw-explorer <config.json> <host:port> [steps]
//! ```
//!
//! The config must match the server's (the wire format sizes observation
//! buffers from it).  The agent submits a uniformly random move each turn
//! and prints its position and strongest scent channel after every step.

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use gw_client::{Client, ClientHandler};
use gw_core::Direction;
use gw_energy::SimulatorConfig;
use gw_proto::message::{ProtoDims, StepBroadcast};

struct StepPrinter {
    steps: mpsc::Sender<u64>,
    seen:  AtomicU64,
}

impl ClientHandler for StepPrinter {
    fn on_step(&self, broadcast: &StepBroadcast) {
        for state in &broadcast.states {
            let strongest = state
                .scent
                .iter()
                .cloned()
                .fold(0.0f32, f32::max);
            println!(
                "{} agent {} at {} facing {} scent {strongest:.3}",
                broadcast.time, state.id, state.position, state.direction
            );
        }
        self.seen.fetch_add(1, Ordering::SeqCst);
        let _ = self.steps.send(broadcast.time.0);
    }

    fn on_lost_connection(&self) {
        eprintln!("lost connection to server");
        std::process::exit(1);
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let (Some(config_path), Some(address)) = (args.next(), args.next()) else {
        eprintln!("usage: gw-explorer <config.json> <host:port> [steps]");
        return ExitCode::FAILURE;
    };
    let total_steps: u64 = args
        .next()
        .and_then(|text| text.parse().ok())
        .unwrap_or(100);

    let config: SimulatorConfig = match std::fs::read_to_string(&config_path)
        .map_err(|e| e.to_string())
        .and_then(|text| serde_json::from_str(&text).map_err(|e| e.to_string()))
    {
        Ok(config) => config,
        Err(error) => {
            eprintln!("cannot load {config_path}: {error}");
            return ExitCode::FAILURE;
        }
    };

    let (step_sender, step_receiver) = mpsc::channel();
    let handler = Arc::new(StepPrinter { steps: step_sender, seen: AtomicU64::new(0) });
    let client = match Client::connect(
        address.as_str(),
        ProtoDims::from_config(&config),
        Arc::clone(&handler) as _,
    ) {
        Ok(client) => client,
        Err(error) => {
            eprintln!("cannot connect to {address}: {error}");
            return ExitCode::FAILURE;
        }
    };

    let agent = match client.add_agent() {
        Ok(agent) => agent,
        Err(error) => {
            eprintln!("server refused an agent: {error}");
            return ExitCode::FAILURE;
        }
    };
    println!("agent {} spawned at {}", agent.id, agent.position);

    let mut rng = SmallRng::seed_from_u64(agent.id.0);
    for _ in 0..total_steps {
        let direction = match rng.gen_range(0..4u8) {
            0 => Direction::Up,
            1 => Direction::Down,
            2 => Direction::Left,
            _ => Direction::Right,
        };
        if let Err(error) = client.move_agent(agent.id, direction, 1) {
            eprintln!("move failed: {error}");
            return ExitCode::FAILURE;
        }
        // Other clients may be pacing the world; wait for the step to land.
        if step_receiver.recv().is_err() {
            return ExitCode::FAILURE;
        }
    }

    println!("done after {} steps", handler.seen.load(Ordering::SeqCst));
    ExitCode::SUCCESS
}
