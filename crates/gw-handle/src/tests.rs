//! Handle-registry tests.

use gw_core::{ActionPolicy, AgentId, MoveConflictPolicy};
use gw_energy::SimulatorConfig;

use crate::{HandleError, Registry, SimulatorHandle};

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
fn create_and_destroy_simulator() {
    let registry = Registry::new();
    let handle = registry.create_simulator(test_config()).unwrap();
    assert!(registry.simulator(handle).is_ok());
    assert!(registry.destroy_simulator(handle));
    assert!(matches!(registry.simulator(handle), Err(HandleError::Dead)));
    // Double destroy is a clean no-op.
    assert!(!registry.destroy_simulator(handle));
}

#[test]
fn handles_are_never_reused() {
    let registry = Registry::new();
    let first = registry.create_simulator(test_config()).unwrap();
    registry.destroy_simulator(first);
    let second = registry.create_simulator(test_config()).unwrap();
    assert_ne!(first, second);
}

#[test]
fn invalid_configuration_is_rejected() {
    let registry = Registry::new();
    let mut config = test_config();
    config.patch_size = 7;
    assert!(registry.create_simulator(config).is_err());
}

#[test]
fn observation_copy_out() {
    let registry = Registry::new();
    let handle = registry.create_simulator(test_config()).unwrap();
    let simulator = registry.simulator(handle).unwrap();
    let agent = simulator.add_agent().unwrap();

    let mut scent = vec![9.0f32; 2];
    registry.copy_scent(handle, agent.id, &mut scent).unwrap();
    assert_eq!(scent, vec![0.0, 0.0]);

    let mut vision = vec![0.0f32; 3 * 3 * 2];
    registry.copy_vision(handle, agent.id, &mut vision).unwrap();
    // The agent paints itself at the window center.
    let center = (1 * 3 + 1) * 2;
    assert_eq!(&vision[center..center + 2], &[1.0, 0.0]);
}

#[test]
fn wrong_buffer_size_is_reported() {
    let registry = Registry::new();
    let handle = registry.create_simulator(test_config()).unwrap();
    let simulator = registry.simulator(handle).unwrap();
    let agent = simulator.add_agent().unwrap();

    let mut tiny = vec![0.0f32; 1];
    assert!(matches!(
        registry.copy_scent(handle, agent.id, &mut tiny),
        Err(HandleError::BufferSize { need: 2, got: 1 })
    ));
}

#[test]
fn dead_handles_fail_cleanly() {
    let registry = Registry::new();
    let mut out = vec![0.0f32; 2];
    assert!(matches!(
        registry.copy_scent(SimulatorHandle(123), AgentId(0), &mut out),
        Err(HandleError::Dead)
    ));
}
