//! Colours for particles and sparks

use crate::sim::{ParticleState, ParticleView, Stage};

/// Base colours, RGBA in 0-1
pub mod colors {
    pub const BACKGROUND: [f32; 4] = [0.02, 0.02, 0.05, 1.0];
    pub const IDLE: [f32; 4] = [0.35, 0.35, 0.45, 1.0];
    pub const SEEKING: [f32; 4] = [0.4, 0.7, 1.0, 1.0];
    pub const SETTLED: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
    pub const FREED: [f32; 4] = [1.0, 0.4, 0.2, 1.0];
    pub const AGITATED: [f32; 4] = [0.9, 0.85, 0.3, 1.0];
    pub const BREAKAWAY: [f32; 4] = [1.0, 0.25, 0.35, 1.0];
    pub const SPARK: [f32; 4] = [1.0, 0.8, 0.4, 1.0];
}

/// Speed gradient: blue (slow) -> cyan -> green -> yellow -> red (fast)
pub fn velocity_color(speed: f32, max_speed: f32, alpha: f32) -> [f32; 4] {
    let t = if max_speed > 0.0 {
        (speed / max_speed).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let (r, g, b) = if t < 0.25 {
        let u = t / 0.25;
        (0.2, 0.4 + 0.4 * u, 1.0)
    } else if t < 0.5 {
        let u = (t - 0.25) / 0.25;
        (0.2, 0.8, 1.0 - 0.6 * u)
    } else if t < 0.75 {
        let u = (t - 0.5) / 0.25;
        (0.2 + 0.8 * u, 0.8, 0.4 - 0.2 * u)
    } else {
        let u = (t - 0.75) / 0.25;
        (1.0, 0.8 - 0.5 * u, 0.2)
    };

    [r, g, b, alpha]
}

/// Colour of a particle: state first, then the stage of its group
pub fn particle_color(view: &ParticleView) -> [f32; 4] {
    let base = match (view.state, view.stage) {
        (ParticleState::Free, _) => colors::IDLE,
        (ParticleState::Freed { .. }, _) => colors::FREED,
        (_, Stage::Breakaway) => colors::BREAKAWAY,
        (_, Stage::Agitated) => colors::AGITATED,
        (ParticleState::Assigned, Stage::Calm) => colors::SEEKING,
        (ParticleState::Consumed, Stage::Calm) => colors::SETTLED,
    };
    with_alpha(base, base[3] * view.alpha)
}

pub fn with_alpha(color: [f32; 4], alpha: f32) -> [f32; 4] {
    [color[0], color[1], color[2], alpha.clamp(0.0, 1.0)]
}

/// CSS `rgba()` string for the 2D canvas
pub fn css_rgba(color: [f32; 4]) -> String {
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!(
        "rgba({},{},{},{:.3})",
        channel(color[0]),
        channel(color[1]),
        channel(color[2]),
        color[3].clamp(0.0, 1.0)
    )
}
