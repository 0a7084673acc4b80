//! Target layouts: where the particles of a group want to be

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

use super::glyph;
use crate::error::{Result, SimError};
use crate::{cartesian_to_polar, polar_to_cartesian};

/// Circle a target lies on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orbit {
    pub center: Vec2,
    pub radius: f32,
}

impl Orbit {
    /// Closest point on the orbit to `pos`
    pub fn project(&self, pos: Vec2) -> Vec2 {
        let (_, theta) = cartesian_to_polar(pos - self.center);
        self.center + polar_to_cartesian(self.radius, theta)
    }
}

/// A stable point a particle is guided toward
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub pos: Vec2,
    /// Set for orbit layouts; the radial constraint uses it
    pub orbit: Option<Orbit>,
}

impl Target {
    pub fn point(pos: Vec2) -> Self {
        Self { pos, orbit: None }
    }

    /// Target to resume toward after constraints were dropped. Orbit targets
    /// move to the particle's current angle so reattaching does not snap.
    pub fn reattached_at(&self, current: Vec2) -> Self {
        match self.orbit {
            Some(orbit) => Self {
                pos: orbit.project(current),
                orbit: Some(orbit),
            },
            None => *self,
        }
    }
}

/// How a group lays out its targets. Offsets are relative to the face centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum LayoutStyle {
    /// Evenly spaced slots on a circle, first slot at `phase` radians
    Orbit { offset: Vec2, radius: f32, phase: f32 },
    /// Points along the seven-segment glyph of the digit
    Glyph { offset: Vec2, width: f32, height: f32 },
}

impl LayoutStyle {
    pub fn is_orbit(&self) -> bool {
        matches!(self, LayoutStyle::Orbit { .. })
    }

    /// Anchor point of the layout for a face centred on `origin`
    pub fn anchor(&self, origin: Vec2) -> Vec2 {
        match self {
            LayoutStyle::Orbit { offset, .. } | LayoutStyle::Glyph { offset, .. } => {
                origin + *offset
            }
        }
    }
}

/// Deterministically produce `slot_count` targets for `value`.
///
/// Orbit layouts ignore the value. Glyph layouts fail when the value has no
/// glyph; see [`fallback_ring`].
pub fn layout(style: &LayoutStyle, origin: Vec2, value: u32, slot_count: usize) -> Result<Vec<Target>> {
    match *style {
        LayoutStyle::Orbit { radius, phase, .. } => {
            let orbit = Orbit {
                center: style.anchor(origin),
                radius,
            };
            let spacing = TAU / slot_count.max(1) as f32;
            Ok((0..slot_count)
                .map(|i| Target {
                    pos: orbit.center + polar_to_cartesian(radius, phase + spacing * i as f32),
                    orbit: Some(orbit),
                })
                .collect())
        }
        LayoutStyle::Glyph { width, height, .. } => {
            if slot_count == 0 {
                return Ok(Vec::new());
            }
            let points = glyph::sample_digit(
                value,
                style.anchor(origin),
                Vec2::new(width, height),
                slot_count,
            );
            if points.is_empty() {
                return Err(SimError::LayoutRegeneration {
                    reason: format!("digit {value} has no glyph points"),
                });
            }
            Ok(points.into_iter().map(Target::point).collect())
        }
    }
}

/// Minimal default target set: a ring around the layout anchor
pub fn fallback_ring(style: &LayoutStyle, origin: Vec2, slot_count: usize) -> Vec<Target> {
    let radius = match *style {
        LayoutStyle::Orbit { radius, .. } => radius,
        LayoutStyle::Glyph { width, height, .. } => width.min(height) / 4.0,
    };
    let center = style.anchor(origin);
    let spacing = TAU / slot_count.max(1) as f32;
    (0..slot_count)
        .map(|i| Target::point(center + polar_to_cartesian(radius, spacing * i as f32)))
        .collect()
}
