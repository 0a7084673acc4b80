//! Particle records and simulation-wide state types

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::body::BodyId;
use super::layout::Target;
use super::stage::Stage;

/// Lifecycle state of a particle. Exactly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParticleState {
    /// Available for assignment
    Free,
    /// Owned by a group slot, travelling to (or orbiting at) its target
    Assigned,
    /// Reached its target; drawn as part of the static digit glyph
    Consumed,
    /// Released by its digit; still simulated until culled
    Freed { life: f32 },
}

impl ParticleState {
    pub fn name(&self) -> &'static str {
        match self {
            ParticleState::Free => "free",
            ParticleState::Assigned => "assigned",
            ParticleState::Consumed => "consumed",
            ParticleState::Freed { .. } => "freed",
        }
    }

    /// Assigned or consumed: held by a group slot
    pub fn is_held(&self) -> bool {
        matches!(self, ParticleState::Assigned | ParticleState::Consumed)
    }
}

/// Group slot that owns a particle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub group: usize,
    pub slot: usize,
}

/// Per-particle variety, rolled once at creation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    /// Scales the maximum speed
    pub speed_mul: f32,
    /// Scales seek / orbit forces
    pub force_mul: f32,
    /// Scales directional field gravity
    pub gravity_mul: f32,
    /// Current drift heading (radians), random-walks while idle
    pub drift_heading: f32,
    /// Max heading change per step (radians)
    pub drift_turn: f32,
    /// Drift force magnitude
    pub drift_strength: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            speed_mul: 1.0,
            force_mul: 1.0,
            gravity_mul: 1.0,
            drift_heading: 0.0,
            drift_turn: 0.02,
            drift_strength: 12.0,
        }
    }
}

impl Tuning {
    /// Roll visual variety from the seeded RNG
    pub fn roll(rng: &mut Pcg32) -> Self {
        Self {
            speed_mul: rng.random_range(0.5..2.0),
            force_mul: rng.random_range(0.7..1.3),
            gravity_mul: rng.random_range(0.3..1.8),
            drift_heading: rng.random_range(0.0..std::f32::consts::TAU),
            drift_turn: rng.random_range(0.01..0.04),
            drift_strength: rng.random_range(7.0..22.0),
        }
    }
}

/// One simulated body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub id: u32,
    /// Position mirrored from the body backend after each step
    pub pos: Vec2,
    /// Velocity mirrored from the body backend after each step
    pub vel: Vec2,
    pub state: ParticleState,
    pub owner: Option<Owner>,
    pub target: Option<Target>,
    /// Seek / orbit constraint active (false while the group is in breakaway)
    pub attached: bool,
    pub tuning: Tuning,
    #[serde(skip)]
    pub body: Option<BodyId>,
}

impl Particle {
    pub fn new(id: u32, pos: Vec2, tuning: Tuning) -> Self {
        Self {
            id,
            pos,
            vel: Vec2::ZERO,
            state: ParticleState::Free,
            owner: None,
            target: None,
            attached: false,
            tuning,
            body: None,
        }
    }

    /// Back to a blank free particle (keeps id, body and tuning)
    pub fn clear_assignment(&mut self) {
        self.state = ParticleState::Free;
        self.owner = None;
        self.target = None;
        self.attached = false;
    }
}

/// What the render sink sees of one visible particle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleView {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub state: ParticleState,
    pub group: Option<usize>,
    pub stage: Stage,
    /// 0-1, fades out freed particles
    pub alpha: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparkView {
    pub pos: Vec2,
    pub life: f32,
    pub size: f32,
}

/// A short-lived visual spark (not part of pool bookkeeping)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spark {
    pub pos: Vec2,
    pub vel: Vec2,
    /// 0-1, decreases over time
    pub life: f32,
    pub size: f32,
}

impl Spark {
    /// Advance one step. Returns false once expired.
    pub fn update(&mut self, dt: f32) -> bool {
        self.pos += self.vel * dt;
        // Big sparks slow down faster
        let drag = if self.size > 3.0 { 0.95 } else { 0.98 };
        self.vel *= drag;
        self.life -= dt * 1.5;
        self.life > 0.0
    }

    pub fn view(&self) -> SparkView {
        SparkView {
            pos: self.pos,
            life: self.life,
            size: self.size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_tuning_is_seeded() {
        let a = Tuning::roll(&mut Pcg32::seed_from_u64(7));
        let b = Tuning::roll(&mut Pcg32::seed_from_u64(7));
        assert_eq!(a, b);
        assert!((0.5..2.0).contains(&a.speed_mul));
    }

    #[test]
    fn test_clear_assignment() {
        let mut p = Particle::new(3, Vec2::ONE, Tuning::default());
        p.state = ParticleState::Consumed;
        p.owner = Some(Owner { group: 0, slot: 4 });
        p.target = Some(Target::point(Vec2::ZERO));
        p.attached = true;
        p.clear_assignment();
        assert_eq!(p.state, ParticleState::Free);
        assert!(p.owner.is_none() && p.target.is_none() && !p.attached);
        assert_eq!(p.id, 3);
    }

    #[test]
    fn test_spark_expires() {
        let mut spark = Spark {
            pos: Vec2::ZERO,
            vel: Vec2::new(60.0, 0.0),
            life: 1.0,
            size: 2.0,
        };
        let mut steps = 0;
        while spark.update(1.0 / 60.0) {
            steps += 1;
        }
        assert!((38..=40).contains(&steps), "steps = {steps}");
        assert!(spark.pos.x > 0.0);
    }
}
