//! Force rules
//!
//! Pure functions over positions and velocities. All forces are accelerations
//! (unit mass) in px/s², so they are independent of any body backend.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{Bounds, normalize_angle};

/// Gains and radii for every force rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceConfig {
    /// Spring gain toward a glyph target (1/s²)
    pub seek_gain: f32,
    /// Tangential acceleration per unit of control
    pub tangential_gain: f32,
    /// Radial spring stiffness holding a particle on its orbit (1/s²)
    pub orbit_stiffness: f32,
    /// Radial damping on the orbit (1/s)
    pub orbit_damping: f32,
    /// Calm spacing between group particles
    pub spacing_distance: f32,
    pub spacing_strength: f32,
    /// Agitated post-collision separation
    pub collision_distance: f32,
    pub collision_strength: f32,
    /// Separation only applies while the pair closes slower than this (px/s, negative)
    pub approach_threshold: f32,
    /// Tangential share of the separation force
    pub collision_spin: f32,
    /// Edge band width and peak push of the containment force
    pub containment_margin: f32,
    pub containment_strength: f32,
    /// Breakaway acceleration along the velocity, per unit of control
    pub momentum_gain: f32,
    /// Below this speed breakaway bodies are nudged toward the centre
    pub momentum_rest_speed: f32,
    /// Inverse-square repulsion between idle particles
    pub repulsion_distance: f32,
    pub repulsion_strength: f32,
    /// Directional gravity from the arrow-key input
    pub field_gravity: f32,
    /// Speed cap for held particles, scaled by each particle's speed multiplier
    pub max_speed: f32,
    /// Speed cap for idle and freed particles
    pub idle_max_speed: f32,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            seek_gain: 2.0,
            tangential_gain: 3000.0,
            orbit_stiffness: 40.0,
            orbit_damping: 8.0,
            spacing_distance: 50.0,
            spacing_strength: 72.0,
            collision_distance: 15.0,
            collision_strength: 288.0,
            approach_threshold: -120.0,
            collision_spin: 0.5,
            containment_margin: 50.0,
            containment_strength: 144.0,
            momentum_gain: 1500.0,
            momentum_rest_speed: 6.0,
            repulsion_distance: 25.0,
            repulsion_strength: 144.0,
            field_gravity: 58.0,
            max_speed: 600.0,
            idle_max_speed: 72.0,
        }
    }
}

/// Proportional pull toward `target`
#[inline]
pub fn seek(pos: Vec2, target: Vec2, gain: f32) -> Vec2 {
    (target - pos) * gain
}

/// Push perpendicular to the radius vector (counter-clockwise on screen for
/// positive `magnitude`)
pub fn tangential(pos: Vec2, center: Vec2, magnitude: f32) -> Vec2 {
    let radial = pos - center;
    let len = radial.length();
    if len <= f32::EPSILON {
        return Vec2::ZERO;
    }
    Vec2::new(-radial.y, radial.x) / len * magnitude
}

/// Soft distance constraint to `center` at `radius`.
///
/// Spring plus damping along the radius, and the centripetal term v_t²/r so
/// a particle moving along the orbit stays on it at any speed.
pub fn orbit_constraint(
    pos: Vec2,
    vel: Vec2,
    center: Vec2,
    radius: f32,
    stiffness: f32,
    damping: f32,
) -> Vec2 {
    let radial = pos - center;
    let dist = radial.length();
    if dist <= f32::EPSILON {
        return Vec2::ZERO;
    }
    let normal = radial / dist;
    let radial_speed = vel.dot(normal);
    let tangential_speed_sq = (vel - normal * radial_speed).length_squared();
    let centripetal = tangential_speed_sq / dist;
    normal * (-(dist - radius) * stiffness - radial_speed * damping - centripetal)
}

/// Calm spacing: linear push away from `other` inside `min_distance`
pub fn spacing(pos: Vec2, other: Vec2, min_distance: f32, strength: f32) -> Vec2 {
    let delta = pos - other;
    let dist = delta.length();
    // NaN fails every comparison below, so test finiteness explicitly
    if !dist.is_finite() || dist >= min_distance || dist <= f32::EPSILON {
        return Vec2::ZERO;
    }
    delta / dist * strength * (min_distance - dist) / min_distance
}

/// Agitated separation after a near-collision.
///
/// Only applies while the pair is not closing fast (closing fast is an
/// ongoing collision, not its aftermath). Adds a tangential spin term.
pub fn separation(pos: Vec2, vel: Vec2, other: Vec2, other_vel: Vec2, cfg: &ForceConfig) -> Vec2 {
    let delta = pos - other;
    let dist = delta.length();
    if !dist.is_finite() || dist >= cfg.collision_distance || dist <= f32::EPSILON {
        return Vec2::ZERO;
    }
    let normal = delta / dist;
    let approach = (vel - other_vel).dot(normal);
    if !approach.is_finite() || approach <= cfg.approach_threshold {
        return Vec2::ZERO;
    }
    let push = normal * cfg.collision_strength * (cfg.collision_distance - dist) / cfg.collision_distance;
    push + Vec2::new(-push.y, push.x) * cfg.collision_spin
}

/// Push back toward the interior inside the margin band along each edge
pub fn containment(pos: Vec2, bounds: Bounds, margin: f32, strength: f32) -> Vec2 {
    if margin <= 0.0 {
        return Vec2::ZERO;
    }
    let mut force = Vec2::ZERO;
    if pos.x < margin {
        force.x += (margin - pos.x) / margin * strength;
    }
    if pos.x > bounds.width - margin {
        force.x -= (pos.x - (bounds.width - margin)) / margin * strength;
    }
    if pos.y < margin {
        force.y += (margin - pos.y) / margin * strength;
    }
    if pos.y > bounds.height - margin {
        force.y -= (pos.y - (bounds.height - margin)) / margin * strength;
    }
    force
}

/// Idle drift along a heading that random-walks by `turn`.
/// Returns the force and the new heading.
pub fn drift(heading: f32, turn: f32, strength: f32) -> (Vec2, f32) {
    let heading = normalize_angle(heading + turn);
    (Vec2::from_angle(heading) * strength, heading)
}

/// Breakaway momentum: accelerate along the current velocity. Bodies that
/// have nearly stopped get nudged toward `center`, rotated by `jitter`.
pub fn momentum(pos: Vec2, vel: Vec2, center: Vec2, control: f32, jitter: f32, cfg: &ForceConfig) -> Vec2 {
    let speed = vel.length();
    if speed > cfg.momentum_rest_speed {
        return vel / speed * control * cfg.momentum_gain;
    }
    let to_center = center - pos;
    let angle = to_center.y.atan2(to_center.x) + jitter;
    Vec2::from_angle(angle) * control.abs() * cfg.momentum_gain * (2.0 / 3.0)
}

/// Inverse-square repulsion between idle particles
pub fn repulsion(pos: Vec2, other: Vec2, distance: f32, strength: f32) -> Vec2 {
    let delta = pos - other;
    let dist = delta.length();
    if !dist.is_finite() || dist >= distance || dist <= f32::EPSILON {
        return Vec2::ZERO;
    }
    // Normalised so the push is `strength` at 1 px and falls off with 1/d²
    delta / dist * (strength / (dist * dist)).min(strength)
}

/// Directional gravity from the control input, scaled per particle
#[inline]
pub fn field_gravity(direction: Vec2, strength: f32, multiplier: f32) -> Vec2 {
    direction * strength * multiplier
}

/// Clamp `vel` to `max_speed`; `None` when already within bounds
pub fn clamp_speed(vel: Vec2, max_speed: f32) -> Option<Vec2> {
    let speed = vel.length();
    if speed > max_speed && speed > 0.0 {
        Some(vel / speed * max_speed)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn test_seek_points_at_target() {
        let f = seek(Vec2::ZERO, Vec2::new(10.0, 0.0), 2.0);
        assert!(approx(f, Vec2::new(20.0, 0.0)));
    }

    #[test]
    fn test_tangential_is_perpendicular() {
        let f = tangential(Vec2::new(10.0, 0.0), Vec2::ZERO, 5.0);
        assert!(approx(f, Vec2::new(0.0, 5.0)));
        assert_eq!(tangential(Vec2::ZERO, Vec2::ZERO, 5.0), Vec2::ZERO);
    }

    #[test]
    fn test_orbit_constraint_pulls_to_radius() {
        let out = orbit_constraint(Vec2::new(110.0, 0.0), Vec2::ZERO, Vec2::ZERO, 100.0, 40.0, 8.0);
        assert!(out.x < 0.0 && out.y.abs() < 1e-4);
        let inside = orbit_constraint(Vec2::new(90.0, 0.0), Vec2::ZERO, Vec2::ZERO, 100.0, 40.0, 8.0);
        assert!(inside.x > 0.0);
        // On the orbit moving tangentially: only the centripetal term
        let on = orbit_constraint(Vec2::new(100.0, 0.0), Vec2::new(0.0, 50.0), Vec2::ZERO, 100.0, 40.0, 8.0);
        assert!(approx(on, Vec2::new(-25.0, 0.0)));
    }

    #[test]
    fn test_spacing_and_range() {
        let f = spacing(Vec2::new(25.0, 0.0), Vec2::ZERO, 50.0, 72.0);
        assert!(approx(f, Vec2::new(36.0, 0.0)));
        assert_eq!(spacing(Vec2::new(60.0, 0.0), Vec2::ZERO, 50.0, 72.0), Vec2::ZERO);
    }

    #[test]
    fn test_separation_filters_fast_approach() {
        let cfg = ForceConfig::default();
        let pos = Vec2::new(5.0, 0.0);
        // Slowly drifting apart: separation with spin
        let f = separation(pos, Vec2::new(10.0, 0.0), Vec2::ZERO, Vec2::ZERO, &cfg);
        assert!(f.x > 0.0 && f.y > 0.0);
        // Closing faster than the threshold: left to the collision itself
        let closing = separation(pos, Vec2::new(-200.0, 0.0), Vec2::ZERO, Vec2::ZERO, &cfg);
        assert_eq!(closing, Vec2::ZERO);
    }

    #[test]
    fn test_containment_band() {
        let bounds = Bounds::new(400.0, 400.0);
        assert_eq!(containment(Vec2::splat(200.0), bounds, 50.0, 144.0), Vec2::ZERO);
        let f = containment(Vec2::new(0.0, 375.0), bounds, 50.0, 144.0);
        assert!(approx(f, Vec2::new(144.0, -72.0)));
    }

    #[test]
    fn test_drift_turns_heading() {
        let (f, heading) = drift(0.0, 0.5, 10.0);
        assert!((heading - 0.5).abs() < 1e-6);
        assert!((f.length() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_momentum_follows_velocity() {
        let cfg = ForceConfig::default();
        let f = momentum(Vec2::ZERO, Vec2::new(0.0, 100.0), Vec2::splat(200.0), 0.16, 0.0, &cfg);
        assert!(f.x.abs() < 1e-3 && f.y > 0.0);
        // At rest: toward the centre
        let rest = momentum(Vec2::ZERO, Vec2::ZERO, Vec2::new(100.0, 0.0), 0.16, 0.0, &cfg);
        assert!(rest.x > 0.0 && rest.y.abs() < 1e-3);
    }

    #[test]
    fn test_repulsion_falls_off() {
        let near = repulsion(Vec2::new(2.0, 0.0), Vec2::ZERO, 25.0, 144.0);
        let far = repulsion(Vec2::new(10.0, 0.0), Vec2::ZERO, 25.0, 144.0);
        assert!(near.x > far.x && far.x > 0.0);
        assert_eq!(repulsion(Vec2::new(30.0, 0.0), Vec2::ZERO, 25.0, 144.0), Vec2::ZERO);
    }

    #[test]
    fn test_clamp_speed() {
        assert_eq!(clamp_speed(Vec2::new(3.0, 4.0), 10.0), None);
        let clamped = clamp_speed(Vec2::new(30.0, 40.0), 10.0).unwrap();
        assert!(approx(clamped, Vec2::new(6.0, 8.0)));
        assert_eq!(field_gravity(Vec2::X, 58.0, 0.5), Vec2::new(29.0, 0.0));
    }

    #[test]
    fn test_pair_forces_ignore_non_finite_neighbour() {
        let cfg = ForceConfig::default();
        let pos = Vec2::new(10.0, 10.0);
        assert_eq!(spacing(pos, Vec2::NAN, 50.0, 72.0), Vec2::ZERO);
        assert_eq!(separation(pos, Vec2::ZERO, Vec2::NAN, Vec2::ZERO, &cfg), Vec2::ZERO);
        assert_eq!(
            separation(pos, Vec2::ZERO, pos + Vec2::X, Vec2::splat(f32::NAN), &cfg),
            Vec2::ZERO
        );
        assert_eq!(repulsion(pos, Vec2::new(f32::INFINITY, 0.0), 25.0, 144.0), Vec2::ZERO);
    }
}
