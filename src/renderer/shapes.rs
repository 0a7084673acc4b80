//! Draw list generation
//!
//! Turns particle and spark views into filled circles in face coordinates.
//! Backends only have to know how to fill a circle.

use glam::Vec2;

use super::palette::{self, colors};
use crate::settings::Preset;
use crate::sim::{ParticleState, ParticleView, SparkView};

/// A filled circle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dot {
    pub pos: Vec2,
    pub radius: f32,
    pub color: [f32; 4],
}

/// Per-preset sizes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawStyle {
    /// Radius of a held particle
    pub particle_radius: f32,
    /// Radius of free and freed particles
    pub idle_radius: f32,
    /// Tint held particles by speed instead of state
    pub speed_tint: bool,
    pub max_speed: f32,
}

impl DrawStyle {
    pub fn for_preset(preset: Preset) -> Self {
        match preset {
            Preset::Planets => Self {
                particle_radius: 6.0,
                idle_radius: 4.0,
                speed_tint: true,
                max_speed: 600.0,
            },
            Preset::DigitGrid => Self {
                particle_radius: 2.5,
                idle_radius: 1.5,
                speed_tint: false,
                max_speed: 72.0,
            },
        }
    }
}

impl Default for DrawStyle {
    fn default() -> Self {
        Self::for_preset(Preset::default())
    }
}

/// Dots for one frame: particles first, sparks on top
pub fn draw_list(particles: &[ParticleView], sparks: &[SparkView], style: &DrawStyle) -> Vec<Dot> {
    let mut dots = Vec::with_capacity(particles.len() + sparks.len());

    for view in particles {
        let held = view.state.is_held();
        let radius = if held {
            style.particle_radius
        } else {
            style.idle_radius
        };
        let color = if held && style.speed_tint {
            palette::velocity_color(view.vel.length(), style.max_speed, view.alpha)
        } else {
            palette::particle_color(view)
        };
        // Freed particles shrink as they fade
        let radius = match view.state {
            ParticleState::Freed { .. } => radius * (0.5 + 0.5 * view.alpha),
            _ => radius,
        };
        dots.push(Dot {
            pos: view.pos,
            radius,
            color,
        });
    }

    for spark in sparks {
        if spark.life <= 0.0 {
            continue;
        }
        dots.push(Dot {
            pos: spark.pos,
            radius: spark.size * spark.life,
            color: palette::with_alpha(colors::SPARK, spark.life),
        });
    }

    dots
}
