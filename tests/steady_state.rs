#![cfg(not(target_arch = "wasm32"))]

//! Long-run soak over the simulation core: bursts, config churn and resizes
//! while the population, boundary and opacity invariants are checked every
//! frame.

use glam::Vec2;

use aura_wasm::config::{Boundary, ConfigPatch, EngineConfig, Range};
use aura_wasm::sim::Simulation;

const DT: f32 = 16.0;

fn assert_invariants(sim: &Simulation) {
    let config = sim.config();
    for (_, p) in sim.particles() {
        assert!(p.pos.x.is_finite() && p.pos.y.is_finite());
        assert!((0.0..=sim.width()).contains(&p.pos.x));
        assert!((0.0..=sim.height()).contains(&p.pos.y));
        assert!(p.size > 0.0);
        assert!(p.opacity >= 0.0);
        assert!(p.opacity <= config.opacity.max + f32::EPSILON);
    }
}

#[test]
fn soak_with_bursts_patches_and_resizes() {
    let config = EngineConfig {
        count: 50,
        speed: 2.0,
        enable_physics: true,
        gravity: 0.02,
        wind: 0.01,
        enable_interaction: true,
        ..EngineConfig::ambient()
    };
    let mut sim = Simulation::new(config, 400.0, 300.0, 0xA02A);

    for frame in 0..2000u32 {
        match frame {
            200 => sim.burst(Vec2::new(100.0, 100.0)),
            500 => sim.apply_patch(&ConfigPatch {
                count: Some(80.0),
                opacity: Some(Range::new(0.1, 0.5)),
                ..Default::default()
            }),
            900 => sim.resize(800.0, 600.0),
            1200 => sim.apply_patch(&ConfigPatch {
                count: Some(20.0),
                boundary: Some(Boundary::Bounce),
                ..Default::default()
            }),
            1500 => sim.resize(200.0, 150.0),
            _ => {}
        }
        if frame % 3 == 0 {
            sim.set_pointer(Some(Vec2::new(sim.width() * 0.5, sim.height() * 0.5)));
        } else if frame % 7 == 0 {
            sim.set_pointer(None);
        }

        sim.step(DT);
        assert_invariants(&sim);
        // bursts may push the count above target, never below
        assert!(sim.len() >= sim.config().count);
    }

    // bursts have long since decayed; population sits exactly on target
    assert_eq!(sim.len(), sim.config().count);
}
