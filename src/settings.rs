//! Simulation configuration and presets
//!
//! Every cosmetic constant lives here so sketches that differ only in
//! thresholds, gains or counts are just different configs. Persisted in
//! LocalStorage on the web, loaded from a JSON file natively.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::Bounds;
use crate::clock::FieldKind;
use crate::consts::*;
use crate::error::{Result, SimError};
use crate::sim::{ControlConfig, ForceConfig, GroupConfig, IdleBehavior, LayoutStyle, StageThresholds};

/// Preset sketch families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Preset {
    /// Minute and hour digits as planets on four orbits, seconds on an outer orbit
    #[default]
    Planets,
    /// Seven-segment digits filled by particles drawn from shared pools
    DigitGrid,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Planets => "Planets",
            Preset::DigitGrid => "DigitGrid",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "planets" | "planet" => Some(Preset::Planets),
            "digitgrid" | "digit-grid" | "digits" | "grid" => Some(Preset::DigitGrid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub name: String,
    pub capacity: usize,
    #[serde(default)]
    pub idle: IdleBehavior,
}

impl PoolConfig {
    fn new(name: &str, capacity: usize, idle: IdleBehavior) -> Self {
        Self {
            name: name.to_string(),
            capacity,
            idle,
        }
    }
}

/// Capture and culling rules
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Distance below which a seeking particle is consumed
    pub capture_distance: f32,
    /// Life a released particle starts with
    pub freed_life: f32,
    /// Life lost per simulation step
    pub freed_life_decay: f32,
    /// Freed particles of hidden pools are culled this far outside the face
    pub cull_margin: f32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            capture_distance: CAPTURE_DISTANCE,
            freed_life: FREED_LIFE,
            freed_life_decay: FREED_LIFE_DECAY,
            cull_margin: 20.0,
        }
    }
}

/// Sparks emitted by held particles of agitated groups
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SparkConfig {
    pub enabled: bool,
    /// Expected sparks per held particle per second
    pub rate: f32,
    /// Initial speed (px/s)
    pub speed: f32,
    pub max: usize,
}

impl Default for SparkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rate: 2.0,
            speed: 60.0,
            max: MAX_SPARKS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub preset: Preset,
    pub seed: u64,
    pub bounds: Bounds,
    /// Fixed simulation step (s)
    pub dt: f32,
    pub max_substeps: u32,
    /// Logical clock tick period (s)
    pub tick_period: f32,
    /// Linear air drag of the body backend (1/s)
    pub air_drag: f32,
    pub control: ControlConfig,
    pub stages: StageThresholds,
    pub forces: ForceConfig,
    pub lifecycle: LifecycleConfig,
    pub sparks: SparkConfig,
    pub pools: Vec<PoolConfig>,
    pub groups: Vec<GroupConfig>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::from_preset(Preset::Planets)
    }
}

impl SimConfig {
    /// Build the config for a preset
    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Planets => Self::planets(),
            Preset::DigitGrid => Self::digit_grid(),
        }
    }

    fn base(preset: Preset) -> Self {
        Self {
            preset,
            seed: 0x5eed,
            bounds: Bounds::default(),
            dt: SIM_DT,
            max_substeps: MAX_SUBSTEPS,
            tick_period: CLOCK_TICK_SECS,
            air_drag: 0.6,
            control: ControlConfig::default(),
            stages: StageThresholds::default(),
            forces: ForceConfig::default(),
            lifecycle: LifecycleConfig::default(),
            sparks: SparkConfig::default(),
            pools: Vec::new(),
            groups: Vec::new(),
        }
    }

    fn planets() -> Self {
        let mut config = Self::base(Preset::Planets);
        config.forces.containment_strength = 900.0;

        // (field, orbit radius); one pool per orbit, sized to the digit range
        let orbits = [
            (FieldKind::MinutesOnes, 150.0),
            (FieldKind::MinutesTens, 120.0),
            (FieldKind::HoursOnes, 90.0),
            (FieldKind::HoursTens, 60.0),
            (FieldKind::Seconds, 180.0),
        ];
        for (index, (field, radius)) in orbits.into_iter().enumerate() {
            config
                .pools
                .push(PoolConfig::new(field.name(), field.range_len(), IdleBehavior::Hidden));
            config.groups.push(GroupConfig {
                name: field.name().to_string(),
                count_field: field,
                shape_field: None,
                pool: index,
                slots: field.range_len(),
                layout: LayoutStyle::Orbit {
                    offset: Vec2::ZERO,
                    radius,
                    phase: -std::f32::consts::FRAC_PI_2,
                },
                release_speed: 0.0,
            });
        }
        config
    }

    fn digit_grid() -> Self {
        let mut config = Self::base(Preset::DigitGrid);
        config.air_drag = 1.8;
        config.forces.max_speed = 72.0;
        config.forces.idle_max_speed = 72.0;

        config
            .pools
            .push(PoolConfig::new("minutes", 120, IdleBehavior::Drift));
        config
            .pools
            .push(PoolConfig::new("hours", 120, IdleBehavior::Drift));

        // (name, count field, shape field, pool, x offset)
        let digits = [
            ("h10", FieldKind::Hours, FieldKind::HoursTens, 1, -138.0),
            ("h1", FieldKind::Hours, FieldKind::HoursOnes, 1, -62.0),
            ("m10", FieldKind::Minutes, FieldKind::MinutesTens, 0, 62.0),
            ("m1", FieldKind::Seconds, FieldKind::SecondsTens, 0, 138.0),
        ];
        for (name, count, shape, pool, x) in digits {
            config.groups.push(GroupConfig {
                name: name.to_string(),
                count_field: count,
                shape_field: Some(shape),
                pool,
                slots: 60,
                layout: LayoutStyle::Glyph {
                    offset: Vec2::new(x, 0.0),
                    width: 56.0,
                    height: 110.0,
                },
                release_speed: 60.0,
            });
        }
        config
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject configs the simulator cannot run
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(SimError::InvalidConfig(msg));

        if !(self.dt > 0.0) || !(self.tick_period > 0.0) {
            return invalid(format!("dt {} and tick_period {} must be positive", self.dt, self.tick_period));
        }
        if self.max_substeps == 0 {
            return invalid("max_substeps must be at least 1".into());
        }
        if !(self.bounds.width > 0.0 && self.bounds.height > 0.0) {
            return invalid(format!("bounds {}x{} must be positive", self.bounds.width, self.bounds.height));
        }
        if !self.stages.is_ordered() {
            return invalid("stage thresholds must satisfy down <= up and agitate <= breakaway".into());
        }
        if self.control.baseline < 0.0 || self.control.baseline > self.control.max {
            return invalid("control baseline must lie in [0, max]".into());
        }
        if !(self.lifecycle.freed_life_decay > 0.0) {
            return invalid("freed_life_decay must be positive".into());
        }
        if self.pools.is_empty() {
            return invalid("at least one pool is required".into());
        }
        for pool in &self.pools {
            if pool.capacity == 0 {
                return invalid(format!("pool {:?} has zero capacity", pool.name));
            }
        }
        for group in &self.groups {
            if group.pool >= self.pools.len() {
                return invalid(format!("group {:?} references missing pool {}", group.name, group.pool));
            }
            if group.slots == 0 {
                return invalid(format!("group {:?} has zero slots", group.name));
            }
        }
        Ok(())
    }

    /// Read and validate a JSON config file
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// LocalStorage key
    const STORAGE_KEY: &'static str = "clockwork_config";

    /// Load config from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(config) => {
                        log::info!("Loaded config from LocalStorage ({})", config.preset.as_str());
                        return config;
                    }
                    Err(e) => log::warn!("Ignoring stored config: {}", e),
                }
            }
        }

        log::info!("Using default config");
        Self::default()
    }

    /// Save config to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Config saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        for preset in [Preset::Planets, Preset::DigitGrid] {
            let config = SimConfig::from_preset(preset);
            config.validate().unwrap();
            assert_eq!(config.preset, preset);
        }
    }

    #[test]
    fn test_planets_pools_sized_to_fields() {
        let config = SimConfig::from_preset(Preset::Planets);
        assert_eq!(config.groups.len(), 5);
        let seconds = config
            .groups
            .iter()
            .find(|g| g.count_field == FieldKind::Seconds)
            .unwrap();
        assert_eq!(config.pools[seconds.pool].capacity, 60);
    }

    #[test]
    fn test_digit_grid_shares_pools() {
        let config = SimConfig::from_preset(Preset::DigitGrid);
        assert_eq!(config.pools.len(), 2);
        assert!(config.pools.iter().all(|p| p.capacity == 120));
        assert_eq!(config.groups.iter().filter(|g| g.pool == 0).count(), 2);
    }

    #[test]
    fn test_json_roundtrip_and_defaults() {
        let config = SimConfig::from_preset(Preset::DigitGrid);
        let json = config.to_json().unwrap();
        assert_eq!(SimConfig::from_json(&json).unwrap(), config);

        // Missing fields fall back to the default preset
        let partial = SimConfig::from_json(r#"{"seed": 42}"#).unwrap();
        assert_eq!(partial.seed, 42);
        assert_eq!(partial.groups.len(), 5);
    }

    #[test]
    fn test_validate_rejects_bad_configs() {
        let mut config = SimConfig::default();
        config.groups[0].pool = 99;
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));

        let mut config = SimConfig::default();
        config.stages.breakaway_down = 0.5;
        assert!(config.validate().is_err());

        let mut config = SimConfig::default();
        config.pools[0].capacity = 0;
        assert!(config.validate().is_err());

        assert!(matches!(SimConfig::from_json("{"), Err(SimError::Json(_))));
    }

    #[test]
    fn test_preset_from_str() {
        assert_eq!(Preset::from_str("Planets"), Some(Preset::Planets));
        assert_eq!(Preset::from_str("digit-grid"), Some(Preset::DigitGrid));
        assert_eq!(Preset::from_str("pendulum"), None);
    }
}
