//! The global control scalar ("orbit speed")

use serde::{Deserialize, Serialize};

use crate::consts::{ORBIT_SPEED_BASELINE, ORBIT_SPEED_INITIAL, ORBIT_SPEED_MAX, ORBIT_SPEED_STEP};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Value after construction
    pub initial: f32,
    /// Magnitude the value relaxes to without input, and returns to on reset
    pub baseline: f32,
    /// Hard bound, the value stays in `[-max, max]`
    pub max: f32,
    /// Change per second while an input is held
    pub rate: f32,
    /// Exponential relaxation rate (1/s)
    pub decay: f32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            initial: ORBIT_SPEED_INITIAL,
            baseline: ORBIT_SPEED_BASELINE,
            max: ORBIT_SPEED_MAX,
            rate: ORBIT_SPEED_STEP * 60.0,
            decay: 0.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControlVariable {
    value: f32,
    config: ControlConfig,
}

impl ControlVariable {
    pub fn new(config: ControlConfig) -> Self {
        Self {
            value: config.initial.clamp(-config.max, config.max),
            config,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn magnitude(&self) -> f32 {
        self.value.abs()
    }

    /// Back to the baseline, in the direction of the initial value
    pub fn reset(&mut self) {
        let baseline = self.config.baseline.min(self.config.max);
        self.value = baseline.copysign(self.config.initial);
    }

    pub fn update(&mut self, accelerate: bool, decelerate: bool, dt: f32) {
        let cfg = &self.config;
        if accelerate || decelerate {
            let mut delta = 0.0;
            if accelerate {
                delta += cfg.rate * dt;
            }
            if decelerate {
                delta -= cfg.rate * dt;
            }
            self.value = (self.value + delta).clamp(-cfg.max, cfg.max);
            return;
        }

        // Inertia: relax toward +-baseline keeping the current direction
        let sign = if self.value < 0.0 { -1.0 } else { 1.0 };
        let excess = self.value.abs() - cfg.baseline;
        let relaxed = cfg.baseline + excess * (-cfg.decay * dt).exp();
        self.value = sign * relaxed;
    }
}
