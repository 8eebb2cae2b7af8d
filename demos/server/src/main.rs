//! Run an authoritative simulator server from a JSON configuration.
//!
//! ```text
//! gw-server <config.json> <host:port> [trace-dir]
//! ```
//!
//! With a third argument, per-step agent trajectories are recorded as CSV
//! into that directory.

use std::process::ExitCode;
use std::sync::Arc;

use log::info;

use gw_energy::SimulatorConfig;
use gw_server::{Server, ServerConfig};
use gw_sim::{Simulator, StepObserver};
use gw_trace::TraceRecorder;

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let (Some(config_path), Some(address)) = (args.next(), args.next()) else {
        eprintln!("usage: gw-server <config.json> <host:port> [trace-dir]");
        return ExitCode::FAILURE;
    };
    let trace_dir = args.next();

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

    let simulator = match Simulator::new(config) {
        Ok(simulator) => Arc::new(simulator),
        Err(error) => {
            eprintln!("simulator construction failed: {error}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(dir) = trace_dir {
        let recorder = match TraceRecorder::create(std::path::Path::new(&dir)) {
            Ok(recorder) => Arc::new(recorder),
            Err(error) => {
                eprintln!("cannot open trace directory {dir}: {error}");
                return ExitCode::FAILURE;
            }
        };
        let observer = Arc::clone(&recorder);
        simulator.add_observer(Box::new(move |event: &gw_sim::StepEvent| {
            observer.on_step(event)
        }));
        info!("recording trajectories to {dir}");
    }

    let server = match Server::start(simulator, address.as_str(), ServerConfig::default()) {
        Ok(server) => server,
        Err(error) => {
            eprintln!("cannot listen on {address}: {error}");
            return ExitCode::FAILURE;
        }
    };
    info!("serving on {}", server.address());

    // Serve until killed.
    loop {
        std::thread::park();
    }
}
