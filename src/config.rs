//! Engine configuration.
//!
//! A config record crosses the JS boundary once at construction and later as
//! partial patches; unknown fields are ignored and out-of-range values are
//! clamped rather than rejected, so a bad config can degrade the effect but
//! never break the page.

use serde::Deserialize;

/// Fallback accent used when the palette is empty.
pub const DEFAULT_COLOR: &str = "#64ffda";

/// Hard ceiling on the particle population.
pub const MAX_COUNT: usize = 2000;

/// Reference frame interval (60 fps) that `speed`, `gravity` and `wind`
/// are expressed against, in milliseconds.
pub const REFERENCE_FRAME_MS: f32 = 1000.0 / 60.0;

/// Inclusive `min..=max` scalar range sampled uniformly at spawn.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Range {
    pub min: f32,
    pub max: f32,
}

impl Range {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Swaps inverted bounds so sampling stays well-defined.
    fn normalized(self) -> Self {
        if self.min > self.max {
            Self::new(self.max, self.min)
        } else {
            self
        }
    }
}

/// How particles are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// One shared canvas, particles drawn as glowing discs.
    #[default]
    Canvas,
    /// One positioned element per particle.
    Dom,
}

/// What happens when a particle reaches the surface edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Boundary {
    /// Re-enter from the opposite edge. The default; keeps ambient
    /// backgrounds free of sudden direction changes.
    #[default]
    Wrap,
    /// Invert the velocity component at the edge.
    Bounce,
}

/// Named visual presets. Each is just a starting [`EngineConfig`]; everything
/// a preset sets can also be overridden field by field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Ambient,
    Embers,
    Snow,
}

/// Live engine configuration. Constructed from [`Preset`] defaults plus an
/// optional [`ConfigPatch`], then kept current by further patches.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Steady-state population target.
    pub count: usize,
    /// Velocity magnitude scale, px per reference frame.
    pub speed: f32,
    /// Spawn size range, px.
    pub size: Range,
    /// CSS color strings particles draw from uniformly at random.
    pub colors: Vec<String>,
    /// Spawn opacity range; a particle's opacity never exceeds its sample.
    pub opacity: Range,
    /// Base lifetime in milliseconds.
    pub lifetime_ms: f32,
    /// Downward acceleration, px per reference frame per frame.
    pub gravity: f32,
    /// Horizontal acceleration, px per reference frame per frame.
    pub wind: f32,
    /// Master switch for gravity/wind.
    pub enable_physics: bool,
    /// Master switch for pointer attraction and click bursts.
    pub enable_interaction: bool,
    /// Pointer attraction radius, px.
    pub interaction_radius: f32,
    /// Particles spawned per click burst.
    pub burst_count: usize,
    pub render_mode: RenderMode,
    /// Canvas composite operation; additive by default so overlapping
    /// particles brighten instead of occluding.
    pub blend_mode: String,
    pub boundary: Boundary,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::ambient()
    }
}

impl EngineConfig {
    /// Slow drifting glow field, the all-purpose background.
    pub fn ambient() -> Self {
        Self {
            count: 60,
            speed: 1.0,
            size: Range::new(1.0, 3.0),
            colors: vec![DEFAULT_COLOR.to_string()],
            opacity: Range::new(0.2, 0.7),
            lifetime_ms: 6000.0,
            gravity: 0.0,
            wind: 0.0,
            enable_physics: false,
            enable_interaction: false,
            interaction_radius: 120.0,
            burst_count: 12,
            render_mode: RenderMode::default(),
            blend_mode: "lighter".to_string(),
            boundary: Boundary::default(),
        }
    }

    /// Warm motes rising against gravity, physics on.
    pub fn embers() -> Self {
        Self {
            count: 40,
            speed: 1.4,
            size: Range::new(1.5, 4.0),
            colors: vec![
                "#ffb347".to_string(),
                "#ff6b35".to_string(),
                "#ffd700".to_string(),
            ],
            opacity: Range::new(0.3, 0.9),
            lifetime_ms: 4000.0,
            gravity: -0.02,
            wind: 0.01,
            enable_physics: true,
            ..Self::ambient()
        }
    }

    /// Sparse white flakes drifting down and sideways.
    pub fn snow() -> Self {
        Self {
            count: 80,
            speed: 0.6,
            size: Range::new(1.0, 3.5),
            colors: vec!["#ffffff".to_string(), "#dbe9ff".to_string()],
            opacity: Range::new(0.4, 0.9),
            lifetime_ms: 12000.0,
            gravity: 0.015,
            wind: 0.008,
            enable_physics: true,
            ..Self::ambient()
        }
    }

    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::Ambient => Self::ambient(),
            Preset::Embers => Self::embers(),
            Preset::Snow => Self::snow(),
        }
    }

    /// Merges a partial patch into the live config. Only fields present in
    /// the patch change; the result is re-sanitized.
    pub fn apply(&mut self, patch: &ConfigPatch) {
        if let Some(count) = patch.count {
            self.count = count.max(0.0) as usize;
        }
        if let Some(speed) = patch.speed {
            self.speed = speed;
        }
        if let Some(size) = patch.size {
            self.size = size;
        }
        if let Some(colors) = &patch.colors {
            self.colors = colors.clone();
        }
        if let Some(opacity) = patch.opacity {
            self.opacity = opacity;
        }
        if let Some(lifetime) = patch.lifetime {
            self.lifetime_ms = lifetime;
        }
        if let Some(gravity) = patch.gravity {
            self.gravity = gravity;
        }
        if let Some(wind) = patch.wind {
            self.wind = wind;
        }
        if let Some(v) = patch.enable_physics {
            self.enable_physics = v;
        }
        if let Some(v) = patch.enable_interaction {
            self.enable_interaction = v;
        }
        if let Some(r) = patch.interaction_radius {
            self.interaction_radius = r;
        }
        if let Some(n) = patch.burst_count {
            self.burst_count = n.max(0.0) as usize;
        }
        if let Some(mode) = patch.render_mode {
            self.render_mode = mode;
        }
        if let Some(blend) = &patch.blend_mode {
            self.blend_mode = blend.clone();
        }
        if let Some(boundary) = patch.boundary {
            self.boundary = boundary;
        }
        self.sanitize();
    }

    /// Clamps every field into its safe domain. Invalid input degrades the
    /// effect instead of propagating an error.
    pub fn sanitize(&mut self) {
        self.count = self.count.min(MAX_COUNT);
        self.speed = finite_or(self.speed, 0.0).max(0.0);
        self.gravity = finite_or(self.gravity, 0.0);
        self.wind = finite_or(self.wind, 0.0);
        self.size.min = finite_or(self.size.min, 1.0);
        self.size.max = finite_or(self.size.max, 3.0);
        self.opacity.min = finite_or(self.opacity.min, 0.0);
        self.opacity.max = finite_or(self.opacity.max, 1.0);
        self.interaction_radius = finite_or(self.interaction_radius, 0.0);

        self.size = self.size.normalized();
        if !(self.size.min > 0.0) {
            self.size = Range::new(1.0, self.size.max.max(1.0));
        }

        self.opacity = self.opacity.normalized();
        self.opacity.min = self.opacity.min.clamp(0.0, 1.0);
        self.opacity.max = self.opacity.max.clamp(0.0, 1.0);

        if !self.lifetime_ms.is_finite() || self.lifetime_ms <= 0.0 {
            self.lifetime_ms = Self::ambient().lifetime_ms;
        }

        if self.colors.is_empty() {
            self.colors.push(DEFAULT_COLOR.to_string());
        }

        self.interaction_radius = self.interaction_radius.max(0.0);
        if self.blend_mode.is_empty() {
            self.blend_mode = "lighter".to_string();
        }
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Partial configuration as received from JS. Field names follow the JS
/// convention; anything unrecognized is dropped by serde.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigPatch {
    /// Accepted as any JS number; clamped to a non-negative integer.
    pub count: Option<f64>,
    pub speed: Option<f32>,
    pub size: Option<Range>,
    pub colors: Option<Vec<String>>,
    pub opacity: Option<Range>,
    /// Milliseconds.
    pub lifetime: Option<f32>,
    pub gravity: Option<f32>,
    pub wind: Option<f32>,
    pub enable_physics: Option<bool>,
    pub enable_interaction: Option<bool>,
    pub interaction_radius: Option<f32>,
    pub burst_count: Option<f64>,
    pub render_mode: Option<RenderMode>,
    pub blend_mode: Option<String>,
    pub boundary: Option<Boundary>,
    /// Base preset the patch is applied on top of; only honored at
    /// construction time.
    pub preset: Option<Preset>,
}

impl ConfigPatch {
    /// Resolves a construction-time patch into a full config: preset (or
    /// ambient) first, then the patch on top.
    pub fn into_config(self) -> EngineConfig {
        let mut config = match self.preset {
            Some(p) => EngineConfig::preset(p),
            None => EngineConfig::default(),
        };
        config.apply(&self);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_touches_only_present_fields() {
        let mut config = EngineConfig::default();
        let before = config.clone();

        config.apply(&ConfigPatch {
            speed: Some(5.0),
            ..Default::default()
        });

        assert_eq!(config.speed, 5.0);
        assert_eq!(config.count, before.count);
        assert_eq!(config.colors, before.colors);
        assert_eq!(config.opacity, before.opacity);
        assert_eq!(config.lifetime_ms, before.lifetime_ms);
        assert_eq!(config.render_mode, before.render_mode);
        assert_eq!(config.blend_mode, before.blend_mode);
    }

    #[test]
    fn negative_count_clamps_to_zero() {
        let mut config = EngineConfig::default();
        config.apply(&ConfigPatch {
            count: Some(-20.0),
            ..Default::default()
        });
        assert_eq!(config.count, 0);
    }

    #[test]
    fn count_is_capped() {
        let mut config = EngineConfig::default();
        config.apply(&ConfigPatch {
            count: Some(1e9),
            ..Default::default()
        });
        assert_eq!(config.count, MAX_COUNT);
    }

    #[test]
    fn empty_palette_falls_back_to_default_color() {
        let mut config = EngineConfig::default();
        config.apply(&ConfigPatch {
            colors: Some(vec![]),
            ..Default::default()
        });
        assert_eq!(config.colors, vec![DEFAULT_COLOR.to_string()]);
    }

    #[test]
    fn inverted_ranges_are_swapped() {
        let mut config = EngineConfig::default();
        config.apply(&ConfigPatch {
            size: Some(Range::new(4.0, 2.0)),
            opacity: Some(Range::new(0.9, 0.1)),
            ..Default::default()
        });
        assert_eq!(config.size, Range::new(2.0, 4.0));
        assert_eq!(config.opacity, Range::new(0.1, 0.9));
    }

    #[test]
    fn nonsense_lifetime_and_size_recover_defaults() {
        let mut config = EngineConfig::default();
        config.apply(&ConfigPatch {
            lifetime: Some(-100.0),
            size: Some(Range::new(-3.0, -1.0)),
            ..Default::default()
        });
        assert!(config.lifetime_ms > 0.0);
        assert!(config.size.min > 0.0);
        assert!(config.size.max >= config.size.min);
    }

    #[test]
    fn preset_resolution_applies_patch_on_top() {
        let config = ConfigPatch {
            preset: Some(Preset::Snow),
            count: Some(10.0),
            ..Default::default()
        }
        .into_config();

        assert_eq!(config.count, 10);
        assert!(config.enable_physics);
        assert!(config.gravity > 0.0);
    }
}
