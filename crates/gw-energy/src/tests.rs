//! Unit tests for kernels and configuration validation.

use gw_core::Position;

use crate::{IntensityKernel, InteractionKernel};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Catalogue with one self-clustering item type, valid for dims (3, 3).
fn one_type_catalogue() -> Vec<crate::ItemType> {
    vec![crate::ItemType {
        name:                 "berry".into(),
        scent:                vec![1.0, 0.0, 0.0],
        color:                vec![0.0, 1.0, 0.0],
        required_item_counts: vec![0],
        required_item_costs:  vec![0],
        blocks_movement:      false,
        visual_occlusion:     0.0,
        intensity:            IntensityKernel::Constant { value: -2.0 },
        interactions:         vec![InteractionKernel::PiecewiseBox {
            first_cutoff:  40.0,
            second_cutoff: 200.0,
            first_value:   0.0,
            second_value:  -40.0,
        }],
    }]
}

fn valid_config() -> crate::SimulatorConfig {
    use gw_core::{ActionPolicy, MoveConflictPolicy};
    crate::SimulatorConfig {
        max_steps_per_movement:      1,
        scent_dim:                   3,
        color_dim:                   3,
        vision_range:                5,
        allowed_movement_directions: [ActionPolicy::Allowed; 4],
        allowed_rotations:           [ActionPolicy::Allowed; 4],
        no_op_allowed:               true,
        patch_size:                  8,
        mcmc_iterations:             100,
        item_types:                  one_type_catalogue(),
        agent_color:                 vec![1.0, 1.0, 1.0],
        collision_policy:            MoveConflictPolicy::FirstComeFirstServed,
        scent_decay:                 0.95,
        scent_diffusion:             0.12,
        deleted_item_lifetime:       500,
        agent_field_of_view:         2.0 * std::f32::consts::PI,
        random_seed:                 0,
    }
}

// ── Intensity kernels ─────────────────────────────────────────────────────────

mod intensity {
    use super::*;

    #[test]
    fn constant_ignores_position() {
        let k = IntensityKernel::Constant { value: -2.0 };
        assert_eq!(k.value_at(Position::ORIGIN), -2.0);
        assert_eq!(k.value_at(Position::new(1000, -77)), -2.0);
        assert!(k.is_stationary());
    }

    #[test]
    fn zero_is_zero() {
        let k = IntensityKernel::Zero;
        assert_eq!(k.value_at(Position::new(3, 4)), 0.0);
    }

    #[test]
    fn radial_hash_is_radially_symmetric_and_nonstationary() {
        let k = IntensityKernel::RadialHash { shift: 7, scale: 10, offset: 0.0, weight: 2.0 };
        assert!(!k.is_stationary());
        // Same radius → same value.
        let a = k.value_at(Position::new(30, 40)); // r = 50
        let b = k.value_at(Position::new(50, 0));  // r = 50
        assert_eq!(a, b);
        // The hash modulation stays within offset ± weight.
        for r in 0..200 {
            let v = k.value_at(Position::new(r, 0));
            assert!((-2.0..=0.0).contains(&v), "r={r} v={v}");
        }
    }

    #[test]
    fn tag_args_roundtrip() {
        for kernel in [
            IntensityKernel::Zero,
            IntensityKernel::Constant { value: -3.25 },
            IntensityKernel::RadialHash { shift: 1, scale: 5, offset: 0.5, weight: 1.5 },
        ] {
            let back =
                IntensityKernel::from_tag_args(kernel.tag(), &kernel.args()).unwrap();
            assert_eq!(back, kernel);
        }
    }

    #[test]
    fn wrong_arity_rejected() {
        assert!(IntensityKernel::from_tag_args(0, &[1.0]).is_err());
        assert!(IntensityKernel::from_tag_args(1, &[]).is_err());
        assert!(IntensityKernel::from_tag_args(2, &[1.0, 2.0]).is_err());
        assert!(IntensityKernel::from_tag_args(99, &[]).is_err());
    }
}

// ── Interaction kernels ───────────────────────────────────────────────────────

mod interaction {
    use super::*;

    #[test]
    fn piecewise_box_bands() {
        let k = InteractionKernel::PiecewiseBox {
            first_cutoff:  40.0,
            second_cutoff: 200.0,
            first_value:   10.0,
            second_value:  -40.0,
        };
        let origin = Position::ORIGIN;
        // squared distance 25 < 40 → near band
        assert_eq!(k.value_between(origin, Position::new(3, 4)), 10.0);
        // squared distance 100 → far band
        assert_eq!(k.value_between(origin, Position::new(10, 0)), -40.0);
        // squared distance 400 → outside
        assert_eq!(k.value_between(origin, Position::new(20, 0)), 0.0);
        assert!(k.is_stationary());
        assert!(!k.is_zero());
    }

    #[test]
    fn cross_separates_axis_from_diagonal() {
        let k = InteractionKernel::Cross {
            near_cutoff:   2.0,
            far_cutoff:    4.0,
            axis_near:     5.0,
            axis_far:      1.0,
            diagonal_near: -5.0,
            diagonal_far:  -1.0,
        };
        let origin = Position::ORIGIN;
        assert_eq!(k.value_between(origin, Position::new(2, 0)), 5.0);
        assert_eq!(k.value_between(origin, Position::new(0, 4)), 1.0);
        assert_eq!(k.value_between(origin, Position::new(2, 2)), -5.0);
        assert_eq!(k.value_between(origin, Position::new(3, 4)), -1.0);
        assert_eq!(k.value_between(origin, Position::new(0, 5)), 0.0);
    }

    #[test]
    fn cross_hash_is_not_stationary() {
        let k = InteractionKernel::CrossHash {
            scale:         10,
            base:          1.0,
            amplitude:     3.0,
            band_width:    2.0,
            axis_near:     1.0,
            axis_far:      0.5,
            diagonal_near: -1.0,
            diagonal_far:  -0.5,
        };
        assert!(!k.is_stationary());
        // Translating both endpoints can change the value (cutoff depends on
        // absolute x).  Just verify evaluation is finite and bounded.
        for x in 0..50 {
            let v = k.value_between(Position::new(x, 0), Position::new(x + 1, 0));
            assert!(v.abs() <= 1.0);
        }
    }

    #[test]
    fn tag_args_roundtrip() {
        for kernel in [
            InteractionKernel::Zero,
            InteractionKernel::PiecewiseBox {
                first_cutoff:  40.0,
                second_cutoff: 200.0,
                first_value:   2.0,
                second_value:  -40.0,
            },
            InteractionKernel::Cross {
                near_cutoff:   2.0,
                far_cutoff:    4.0,
                axis_near:     5.0,
                axis_far:      1.0,
                diagonal_near: -5.0,
                diagonal_far:  -1.0,
            },
            InteractionKernel::CrossHash {
                scale:         10,
                base:          1.0,
                amplitude:     3.0,
                band_width:    2.0,
                axis_near:     1.0,
                axis_far:      0.5,
                diagonal_near: -1.0,
                diagonal_far:  -0.5,
            },
        ] {
            let back =
                InteractionKernel::from_tag_args(kernel.tag(), &kernel.args()).unwrap();
            assert_eq!(back, kernel);
        }
    }

    #[test]
    fn wrong_arity_rejected() {
        assert!(InteractionKernel::from_tag_args(1, &[1.0]).is_err());
        assert!(InteractionKernel::from_tag_args(2, &[0.0; 8]).is_err());
        assert!(InteractionKernel::from_tag_args(3, &[0.0; 6]).is_err());
        assert!(InteractionKernel::from_tag_args(42, &[]).is_err());
    }
}

// ── Configuration validation ──────────────────────────────────────────────────

mod config {
    use super::*;

    #[test]
    fn valid_config_passes() {
        valid_config().validate().unwrap();
    }

    #[test]
    fn odd_patch_size_rejected() {
        let mut cfg = valid_config();
        cfg.patch_size = 7;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn mismatched_scent_length_rejected() {
        let mut cfg = valid_config();
        cfg.item_types[0].scent = vec![1.0];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn mismatched_interaction_table_rejected() {
        let mut cfg = valid_config();
        cfg.item_types[0].interactions.push(InteractionKernel::Zero);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn occlusion_out_of_range_rejected() {
        let mut cfg = valid_config();
        cfg.item_types[0].visual_occlusion = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unstable_diffusion_rejected() {
        let mut cfg = valid_config();
        cfg.scent_diffusion = 0.3; // 4 · 0.3 > 1
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn bad_fov_rejected() {
        let mut cfg = valid_config();
        cfg.agent_field_of_view = 0.0;
        assert!(cfg.validate().is_err());
        cfg.agent_field_of_view = 7.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn config_json_roundtrip() {
        let cfg = valid_config();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: crate::SimulatorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn vision_dimensions() {
        let cfg = valid_config();
        assert_eq!(cfg.vision_side(), 11);
        assert_eq!(cfg.vision_len(), 11 * 11 * 3);
        assert_eq!(cfg.cells_per_patch(), 64);
    }
}
