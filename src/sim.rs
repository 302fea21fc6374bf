//! Platform-independent simulation core.
//!
//! Owns the particle arena and advances it one animation frame at a time.
//! Nothing in here touches the DOM; the wasm layer feeds it elapsed time,
//! surface dimensions and pointer state, and reads particles back out to
//! draw them. That split keeps every population/boundary/lifetime property
//! testable natively.

use glam::Vec2;

use crate::arena::Arena;
use crate::config::{Boundary, ConfigPatch, EngineConfig, REFERENCE_FRAME_MS};
use crate::particle::Particle;
use crate::rng::Rng;

/// Pointer pull acceleration at zero distance, px per reference frame².
const POINTER_PULL: f32 = 0.25;

/// Burst particles leave the click point at this multiple of `speed`.
const BURST_SPEED_SCALE: f32 = 2.0;

/// Safety cap on velocity magnitude, px per reference frame. Keeps repeated
/// pointer pulls from accelerating particles without bound.
const MAX_PARTICLE_SPEED: f32 = 40.0;

pub struct Simulation {
    config: EngineConfig,
    arena: Arena,
    rng: Rng,
    width: f32,
    height: f32,
    pointer: Option<Vec2>,
    /// Live particles with `replenish` set. Tracked separately from
    /// `arena.len()` so an active burst can never mask a steady-state
    /// particle's death and leave the population under target.
    steady: usize,
}

impl Simulation {
    pub fn new(mut config: EngineConfig, width: f32, height: f32, seed: u64) -> Self {
        config.sanitize();
        let mut sim = Self {
            arena: Arena::with_capacity(config.count),
            config,
            rng: Rng::new(seed),
            width: width.max(1.0),
            height: height.max(1.0),
            pointer: None,
            steady: 0,
        };
        for _ in 0..sim.config.count {
            let p = sim.spawn_ambient();
            sim.arena.insert(p);
            sim.steady += 1;
        }
        sim
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// See [`Arena::slot_bound`].
    pub fn slot_bound(&self) -> usize {
        self.arena.slot_bound()
    }

    /// Live particles with their stable slot indices.
    pub fn particles(&self) -> impl Iterator<Item = (usize, &Particle)> {
        self.arena.iter()
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Records the pointer position (surface-local px), or `None` when the
    /// pointer left the surface. The attraction force itself is applied in
    /// [`step`], once per frame, so event delivery rate cannot change the
    /// physics.
    ///
    /// [`step`]: Simulation::step
    pub fn set_pointer(&mut self, pointer: Option<Vec2>) {
        self.pointer = pointer;
    }

    /// Spawns a radial burst at `at`. Burst particles are extra population:
    /// they are not replaced when they die, so the count decays back to the
    /// steady-state target on its own.
    pub fn burst(&mut self, at: Vec2) {
        let k = self.config.burst_count;
        let speed = self.config.speed * BURST_SPEED_SCALE;
        for i in 0..k {
            let angle = std::f32::consts::TAU * i as f32 / k as f32;
            let mut p = self.spawn_ambient();
            p.pos = self.confine(at);
            p.vel = Vec2::from_angle(angle) * speed;
            p.replenish = false;
            self.arena.insert(p);
        }
    }

    /// Advances the population by `dt_ms` of wall time: pointer force,
    /// physics, integration, aging, boundary policy, then reap-and-replace.
    pub fn step(&mut self, dt_ms: f32) {
        if dt_ms <= 0.0 {
            return;
        }
        let scale = dt_ms / REFERENCE_FRAME_MS;
        let pointer = if self.config.enable_interaction {
            self.pointer
        } else {
            None
        };

        let (width, height) = (self.width, self.height);
        let config = &self.config;
        let mut dead: Vec<usize> = Vec::new();

        for (index, p) in self.arena.iter_mut() {
            if let Some(at) = pointer {
                let to_pointer = at - p.pos;
                let dist = to_pointer.length();
                if dist > f32::EPSILON && dist < config.interaction_radius {
                    // linear falloff: full pull at the cursor, zero at the radius
                    let strength = 1.0 - dist / config.interaction_radius;
                    p.vel += to_pointer / dist * POINTER_PULL * strength * scale;
                }
            }

            if config.enable_physics {
                p.vel.y += config.gravity * scale;
                p.vel.x += config.wind * scale;
            }

            let speed = p.vel.length();
            if speed > MAX_PARTICLE_SPEED {
                p.vel *= MAX_PARTICLE_SPEED / speed;
            }

            p.pos += p.vel * scale;
            p.age(dt_ms);

            match config.boundary {
                Boundary::Wrap => {
                    p.pos.x = p.pos.x.rem_euclid(width);
                    p.pos.y = p.pos.y.rem_euclid(height);
                }
                Boundary::Bounce => {
                    if p.pos.x < 0.0 || p.pos.x > width {
                        p.vel.x = -p.vel.x;
                        p.pos.x = p.pos.x.clamp(0.0, width);
                    }
                    if p.pos.y < 0.0 || p.pos.y > height {
                        p.vel.y = -p.vel.y;
                        p.pos.y = p.pos.y.clamp(0.0, height);
                    }
                }
            }

            if !p.is_alive() {
                dead.push(index);
            }
        }

        for index in dead {
            let Some(died) = self.arena.remove(index) else {
                continue;
            };
            if !died.replenish {
                continue;
            }
            self.steady -= 1;
            // steady-state replacement happens in the same frame the
            // particle dies, so the population target never dips
            if self.steady < self.config.count {
                let p = self.spawn_ambient();
                self.arena.insert(p);
                self.steady += 1;
            }
        }
    }

    /// Tracks a host-container resize. Existing particles are re-confined so
    /// no position ever sits outside the new surface.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width.max(1.0);
        self.height = height.max(1.0);
        let (w, h) = (self.width, self.height);
        for (_, p) in self.arena.iter_mut() {
            p.pos.x = p.pos.x.rem_euclid(w);
            p.pos.y = p.pos.y.rem_euclid(h);
        }
    }

    /// Merges a config patch and converges the population on the (possibly
    /// new) target by spawning or removing only the difference; surviving
    /// particles are left untouched to avoid a visible reset.
    pub fn apply_patch(&mut self, patch: &ConfigPatch) {
        self.config.apply(patch);

        while self.steady < self.config.count {
            let p = self.spawn_ambient();
            self.arena.insert(p);
            self.steady += 1;
        }
        if self.steady > self.config.count {
            // trim steady-state particles only; burst particles are already
            // on their way out and are never counted against the target
            let excess = self.steady - self.config.count;
            let victims: Vec<usize> = self
                .arena
                .iter()
                .filter(|(_, p)| p.replenish)
                .map(|(i, _)| i)
                .take(excess)
                .collect();
            for index in victims {
                if self.arena.remove(index).is_some() {
                    self.steady -= 1;
                }
            }
        }
    }

    /// Drops the whole population. Used by engine teardown.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.steady = 0;
    }

    fn confine(&self, at: Vec2) -> Vec2 {
        Vec2::new(at.x.clamp(0.0, self.width), at.y.clamp(0.0, self.height))
    }

    fn spawn_ambient(&mut self) -> Particle {
        let c = &self.config;
        let pos = Vec2::new(
            self.rng.range(0.0, self.width),
            self.rng.range(0.0, self.height),
        );
        let angle = self.rng.unit_angle();
        let magnitude = c.speed * self.rng.range(0.2, 1.0);
        let base_opacity = self.rng.range(c.opacity.min, c.opacity.max);
        let max_life_ms = c.lifetime_ms * self.rng.range(0.5, 1.0);
        Particle {
            pos,
            vel: Vec2::from_angle(angle) * magnitude,
            size: self.rng.range(c.size.min, c.size.max),
            color: self.rng.pick(c.colors.len()),
            base_opacity,
            opacity: base_opacity,
            life_ms: max_life_ms,
            max_life_ms,
            replenish: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Range;

    const DT: f32 = 16.0;

    fn sim(count: usize) -> Simulation {
        let config = EngineConfig {
            count,
            ..EngineConfig::ambient()
        };
        Simulation::new(config, 400.0, 300.0, 42)
    }

    #[test]
    fn population_holds_steady_across_frames() {
        let mut sim = sim(25);
        assert_eq!(sim.len(), 25);
        for _ in 0..500 {
            sim.step(DT);
            assert_eq!(sim.len(), 25);
        }
    }

    #[test]
    fn particles_stay_inside_surface_under_wrap() {
        let mut sim = sim(30);
        for _ in 0..300 {
            sim.step(DT);
            for (_, p) in sim.particles() {
                assert!((0.0..=sim.width()).contains(&p.pos.x), "x = {}", p.pos.x);
                assert!((0.0..=sim.height()).contains(&p.pos.y), "y = {}", p.pos.y);
            }
        }
    }

    #[test]
    fn particles_stay_inside_surface_under_bounce() {
        let config = EngineConfig {
            count: 30,
            speed: 4.0,
            boundary: Boundary::Bounce,
            ..EngineConfig::ambient()
        };
        let mut sim = Simulation::new(config, 200.0, 150.0, 7);
        for _ in 0..300 {
            sim.step(DT);
            for (_, p) in sim.particles() {
                assert!((0.0..=sim.width()).contains(&p.pos.x));
                assert!((0.0..=sim.height()).contains(&p.pos.y));
            }
        }
    }

    #[test]
    fn opacity_stays_within_configured_bounds() {
        let config = EngineConfig {
            count: 20,
            opacity: Range::new(0.1, 0.6),
            ..EngineConfig::ambient()
        };
        let mut sim = Simulation::new(config, 400.0, 300.0, 11);
        for _ in 0..400 {
            sim.step(DT);
            for (_, p) in sim.particles() {
                assert!(p.opacity >= 0.0);
                assert!(p.opacity <= 0.6 + f32::EPSILON);
            }
        }
    }

    #[test]
    fn burst_particles_are_not_replenished() {
        let mut sim = sim(10);
        sim.burst(Vec2::new(200.0, 150.0));
        assert_eq!(sim.len(), 10 + sim.config().burst_count);

        // run well past the maximum lifetime; only the steady-state
        // population should remain, and it must never dip below target even
        // while burst and steady deaths interleave
        let frames = (sim.config().lifetime_ms / DT) as usize + 10;
        for _ in 0..frames {
            sim.step(DT);
            assert!(sim.len() >= 10);
        }
        assert_eq!(sim.len(), 10);
    }

    #[test]
    fn burst_angles_are_evenly_spaced() {
        let mut sim = sim(0);
        sim.burst(Vec2::new(100.0, 100.0));
        let k = sim.config().burst_count;
        let mut angles: Vec<f32> = sim
            .particles()
            .map(|(_, p)| p.vel.y.atan2(p.vel.x).rem_euclid(std::f32::consts::TAU))
            .collect();
        angles.sort_by(f32::total_cmp);
        assert_eq!(angles.len(), k);
        let expected = std::f32::consts::TAU / k as f32;
        for pair in angles.windows(2) {
            assert!((pair[1] - pair[0] - expected).abs() < 1e-3);
        }
    }

    #[test]
    fn full_population_turns_over_within_lifetime() {
        // one second of 16 ms frames against a 1000 ms base lifetime
        let config = EngineConfig {
            count: 10,
            lifetime_ms: 1000.0,
            enable_physics: false,
            ..EngineConfig::ambient()
        };
        let mut sim = Simulation::new(config, 400.0, 300.0, 3);
        for _ in 0..63 {
            sim.step(DT);
            assert_eq!(sim.len(), 10);
        }
        // 63 * 16 ms > every sampled lifetime, so everything alive now is a
        // replacement and still mid-life
        for (_, p) in sim.particles() {
            assert!(p.life_ms > 0.0);
            assert!(p.is_alive());
        }
    }

    #[test]
    fn resize_keeps_positions_finite_and_contained() {
        let mut sim = sim(30);
        for _ in 0..50 {
            sim.step(DT);
        }
        sim.resize(800.0, 600.0);
        for (_, p) in sim.particles() {
            assert!(p.pos.x.is_finite() && p.pos.y.is_finite());
            assert!(p.pos.x >= 0.0 && p.pos.x <= 800.0);
            assert!(p.pos.y >= 0.0 && p.pos.y <= 600.0);
        }

        sim.resize(400.0, 300.0);
        for _ in 0..50 {
            sim.step(DT);
            for (_, p) in sim.particles() {
                assert!(p.pos.x >= 0.0 && p.pos.x <= 400.0);
                assert!(p.pos.y >= 0.0 && p.pos.y <= 300.0);
            }
        }
    }

    #[test]
    fn count_patch_converges_without_rebuilding() {
        let mut sim = sim(20);
        let survivor_positions: Vec<Vec2> = sim.particles().map(|(_, p)| p.pos).collect();

        sim.apply_patch(&ConfigPatch {
            count: Some(25.0),
            ..Default::default()
        });
        assert_eq!(sim.len(), 25);
        // original particles are still there, untouched
        let after: Vec<Vec2> = sim.particles().map(|(_, p)| p.pos).collect();
        for pos in &survivor_positions {
            assert!(after.contains(pos));
        }

        sim.apply_patch(&ConfigPatch {
            count: Some(5.0),
            ..Default::default()
        });
        assert_eq!(sim.len(), 5);
        for _ in 0..100 {
            sim.step(DT);
            assert_eq!(sim.len(), 5);
        }
    }

    #[test]
    fn pointer_pulls_nearby_particles() {
        let config = EngineConfig {
            count: 1,
            speed: 0.0,
            enable_interaction: true,
            interaction_radius: 1000.0,
            ..EngineConfig::ambient()
        };
        let mut sim = Simulation::new(config, 400.0, 300.0, 5);
        let target = Vec2::new(390.0, 290.0);
        sim.set_pointer(Some(target));

        let before = sim.particles().next().map(|(_, p)| p.pos).unwrap();
        let dist_before = before.distance(target);
        sim.step(DT);

        let (_, p) = sim.particles().next().unwrap();
        assert!(p.vel.dot(target - p.pos) > 0.0, "velocity should aim at the pointer");
        assert!(p.pos.distance(target) < dist_before);
    }

    #[test]
    fn pointer_is_inert_when_interaction_disabled() {
        let config = EngineConfig {
            count: 1,
            speed: 0.0,
            enable_interaction: false,
            ..EngineConfig::ambient()
        };
        let mut sim = Simulation::new(config, 400.0, 300.0, 5);
        sim.set_pointer(Some(Vec2::new(200.0, 150.0)));

        let before = sim.particles().next().map(|(_, p)| p.pos).unwrap();
        for _ in 0..30 {
            sim.step(DT);
        }
        let after = sim.particles().next().map(|(_, p)| p.pos).unwrap();
        assert_eq!(before, after, "speed 0 and no forces should mean no motion");
    }

    #[test]
    fn zero_count_is_a_valid_configuration() {
        let mut sim = sim(0);
        assert!(sim.is_empty());
        for _ in 0..10 {
            sim.step(DT);
        }
        assert!(sim.is_empty());
    }
}
