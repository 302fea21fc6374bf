//! The particle entity.

use glam::Vec2;

/// A single live particle. All state is ephemeral; particles are rebuilt
/// from configuration whenever an engine is (re)initialized.
#[derive(Debug, Clone)]
pub struct Particle {
    /// Position on the render surface, px.
    pub pos: Vec2,
    /// Velocity in px per reference frame.
    pub vel: Vec2,
    /// Radius, px. Always positive.
    pub size: f32,
    /// Index into the configured palette, fixed at spawn.
    pub color: usize,
    /// Opacity sampled once at spawn; the upper bound for this particle.
    pub base_opacity: f32,
    /// Current opacity, `life_ratio * base_opacity`.
    pub opacity: f32,
    /// Remaining lifetime, ms.
    pub life_ms: f32,
    /// Total lifetime, ms.
    pub max_life_ms: f32,
    /// Steady-state particles are replaced when they die; burst particles
    /// are not.
    pub replenish: bool,
}

impl Particle {
    /// Remaining-life fraction in `[0, 1]`.
    pub fn life_ratio(&self) -> f32 {
        if self.max_life_ms <= 0.0 {
            0.0
        } else {
            (self.life_ms / self.max_life_ms).clamp(0.0, 1.0)
        }
    }

    pub fn is_alive(&self) -> bool {
        self.life_ms > 0.0 && self.opacity > 0.0
    }

    /// Ages the particle by `dt_ms` and refreshes the opacity fade.
    pub fn age(&mut self, dt_ms: f32) {
        self.life_ms -= dt_ms;
        self.opacity = self.life_ratio() * self.base_opacity;
    }
}
