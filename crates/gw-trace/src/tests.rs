//! Recorder tests.

use std::sync::Arc;

use gw_core::{ActionPolicy, Direction, MoveConflictPolicy};
use gw_energy::SimulatorConfig;
use gw_sim::{Simulator, StepObserver};

use crate::TraceRecorder;

fn test_config() -> SimulatorConfig {
    SimulatorConfig {
        max_steps_per_movement:      1,
        scent_dim:                   2,
        color_dim:                   2,
        vision_range:                1,
        allowed_movement_directions: [ActionPolicy::Allowed; 4],
        allowed_rotations:           [ActionPolicy::Allowed; 4],
        no_op_allowed:               true,
        patch_size:                  8,
        mcmc_iterations:             0,
        item_types:                  Vec::new(),
        agent_color:                 vec![1.0, 0.0],
        collision_policy:            MoveConflictPolicy::FirstComeFirstServed,
        scent_decay:                 0.9,
        scent_diffusion:             0.1,
        deleted_item_lifetime:       100,
        agent_field_of_view:         2.0 * std::f32::consts::PI,
        random_seed:                 0,
    }
}

#[test]
fn records_one_row_per_agent_per_step() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Arc::new(TraceRecorder::create(dir.path()).unwrap());

    let simulator = Simulator::new(test_config()).unwrap();
    let shared = Arc::clone(&recorder);
    simulator.add_observer(Box::new(move |event: &gw_sim::StepEvent| {
        shared.on_step(event)
    }));

    let a = simulator.add_agent().unwrap().id;
    let b = simulator.add_agent().unwrap().id;
    for _ in 0..3 {
        simulator.move_agent(a, Direction::Up, 1);
        simulator.no_op(b);
    }
    recorder.finish().unwrap();

    let steps = std::fs::read_to_string(dir.path().join("agent_steps.csv")).unwrap();
    let lines: Vec<&str> = steps.lines().collect();
    // Header + 3 steps × 2 agents.
    assert_eq!(lines.len(), 1 + 6);
    assert_eq!(lines[0], "time,agent_id,x,y,direction,active,collected");
    // First data row: time 1, agent a moved up to (0, 1).
    assert_eq!(lines[1], format!("1,{},0,1,up,1,", a.0));

    let summaries = std::fs::read_to_string(dir.path().join("step_summaries.csv")).unwrap();
    let lines: Vec<&str> = summaries.lines().collect();
    assert_eq!(lines.len(), 1 + 3);
    assert_eq!(lines[1], "1,2");
    assert_eq!(lines[3], "3,2");
}

#[test]
fn finish_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = TraceRecorder::create(dir.path()).unwrap();
    recorder.finish().unwrap();
    recorder.finish().unwrap();
}
