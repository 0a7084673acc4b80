//! Fixed-capacity particle pools
//!
//! Every particle is in exactly one [`ParticleState`]; counts are derived by
//! filtering states, never accumulated, so a transition can only be counted
//! once.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::state::{Particle, ParticleState, Tuning};
use crate::Bounds;
use crate::error::{Result, SimError};

/// What free particles of a pool do while nobody owns them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleBehavior {
    /// Not simulated or drawn (planets only exist while their digit holds them)
    #[default]
    Hidden,
    /// Float around the face until assigned
    Drift,
}

/// Stable reference to one particle of one pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticleHandle {
    pub pool: usize,
    pub index: usize,
}

/// Per-state particle counts of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolCounts {
    pub free: usize,
    pub assigned: usize,
    pub consumed: usize,
    pub freed: usize,
}

impl PoolCounts {
    pub fn total(&self) -> usize {
        self.free + self.assigned + self.consumed + self.freed
    }
}

/// Inset from the face edge for initial idle positions
const SPAWN_INSET: f32 = 50.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    pub id: usize,
    pub name: String,
    pub idle: IdleBehavior,
    particles: Vec<Particle>,
}

impl Pool {
    /// Create `capacity` free particles. `first_id` keeps particle ids unique
    /// across pools.
    pub fn new(
        id: usize,
        name: impl Into<String>,
        capacity: usize,
        idle: IdleBehavior,
        first_id: u32,
        bounds: Bounds,
        rng: &mut Pcg32,
    ) -> Self {
        let particles = (0..capacity)
            .map(|i| {
                let tuning = Tuning::roll(rng);
                let pos = idle_spawn_position(idle, bounds, rng);
                Particle::new(first_id + i as u32, pos, tuning)
            })
            .collect();
        Self {
            id,
            name: name.into(),
            idle,
            particles,
        }
    }

    pub fn capacity(&self) -> usize {
        self.particles.len()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn handle(&self, index: usize) -> ParticleHandle {
        ParticleHandle {
            pool: self.id,
            index,
        }
    }

    pub fn get(&self, handle: ParticleHandle) -> Option<&Particle> {
        if handle.pool != self.id {
            return None;
        }
        self.particles.get(handle.index)
    }

    pub fn get_mut(&mut self, handle: ParticleHandle) -> Option<&mut Particle> {
        if handle.pool != self.id {
            return None;
        }
        self.particles.get_mut(handle.index)
    }

    fn checked_mut(&mut self, handle: ParticleHandle) -> Result<&mut Particle> {
        let pool = self.id;
        self.get_mut(handle).ok_or(SimError::UnknownHandle { pool })
    }

    /// Take the lowest-index free particle and mark it assigned
    pub fn acquire(&mut self) -> Result<ParticleHandle> {
        let index = self
            .particles
            .iter()
            .position(|p| p.state == ParticleState::Free)
            .ok_or(SimError::PoolExhausted { pool: self.id })?;
        self.particles[index].state = ParticleState::Assigned;
        Ok(self.handle(index))
    }

    /// Assigned / consumed → freed. The particle keeps being simulated until culled.
    pub fn release(&mut self, handle: ParticleHandle, life: f32) -> Result<()> {
        let particle = self.checked_mut(handle)?;
        if !particle.state.is_held() {
            return Err(SimError::InvalidTransition {
                action: "release",
                from: particle.state.name(),
            });
        }
        particle.state = ParticleState::Freed { life };
        particle.owner = None;
        particle.attached = false;
        Ok(())
    }

    /// Assigned → consumed. Fails for every other state, so reaching a target
    /// is recorded exactly once.
    pub fn consume(&mut self, handle: ParticleHandle) -> Result<()> {
        let particle = self.checked_mut(handle)?;
        if particle.state != ParticleState::Assigned {
            return Err(SimError::InvalidTransition {
                action: "consume",
                from: particle.state.name(),
            });
        }
        particle.state = ParticleState::Consumed;
        Ok(())
    }

    /// Freed → free, ready for reassignment
    pub fn cull(&mut self, handle: ParticleHandle) -> Result<()> {
        let particle = self.checked_mut(handle)?;
        if !matches!(particle.state, ParticleState::Freed { .. }) {
            return Err(SimError::InvalidTransition {
                action: "cull",
                from: particle.state.name(),
            });
        }
        particle.clear_assignment();
        Ok(())
    }

    pub fn counts(&self) -> PoolCounts {
        let mut counts = PoolCounts::default();
        for p in &self.particles {
            match p.state {
                ParticleState::Free => counts.free += 1,
                ParticleState::Assigned => counts.assigned += 1,
                ParticleState::Consumed => counts.consumed += 1,
                ParticleState::Freed { .. } => counts.freed += 1,
            }
        }
        counts
    }

    /// Every particle back to free, scattered to fresh idle positions
    pub fn reset(&mut self, bounds: Bounds, rng: &mut Pcg32) {
        let idle = self.idle;
        for p in &mut self.particles {
            p.clear_assignment();
            p.pos = idle_spawn_position(idle, bounds, rng);
            p.vel = Vec2::ZERO;
        }
    }
}

fn idle_spawn_position(idle: IdleBehavior, bounds: Bounds, rng: &mut Pcg32) -> Vec2 {
    match idle {
        IdleBehavior::Hidden => bounds.center(),
        IdleBehavior::Drift => {
            let inset_x = SPAWN_INSET.min(bounds.width / 2.0);
            let inset_y = SPAWN_INSET.min(bounds.height / 2.0);
            Vec2::new(
                rng.random_range(inset_x..=bounds.width - inset_x),
                rng.random_range(inset_y..=bounds.height - inset_y),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn pool(capacity: usize) -> Pool {
        let mut rng = Pcg32::seed_from_u64(1);
        Pool::new(
            0,
            "seconds",
            capacity,
            IdleBehavior::Drift,
            0,
            Bounds::default(),
            &mut rng,
        )
    }

    #[test]
    fn test_acquire_lowest_free_until_exhausted() {
        let mut pool = pool(3);
        assert_eq!(pool.acquire().unwrap().index, 0);
        assert_eq!(pool.acquire().unwrap().index, 1);
        assert_eq!(pool.acquire().unwrap().index, 2);
        assert!(matches!(
            pool.acquire(),
            Err(SimError::PoolExhausted { pool: 0 })
        ));
        assert_eq!(pool.counts().assigned, 3);
    }

    #[test]
    fn test_full_lifecycle() {
        let mut pool = pool(2);
        let h = pool.acquire().unwrap();
        pool.consume(h).unwrap();
        assert_eq!(pool.counts().consumed, 1);

        pool.release(h, 255.0).unwrap();
        assert!(matches!(
            pool.get(h).unwrap().state,
            ParticleState::Freed { life } if life == 255.0
        ));
        pool.cull(h).unwrap();
        assert_eq!(pool.get(h).unwrap().state, ParticleState::Free);
        assert_eq!(pool.counts().free, 2);
    }

    #[test]
    fn test_consume_only_once() {
        let mut pool = pool(1);
        let h = pool.acquire().unwrap();
        pool.consume(h).unwrap();
        let err = pool.consume(h).unwrap_err();
        assert!(matches!(
            err,
            SimError::InvalidTransition { action: "consume", from: "consumed" }
        ));
        assert_eq!(pool.counts().consumed, 1);
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let mut pool = pool(1);
        let h = pool.handle(0);
        assert!(pool.release(h, 1.0).is_err());
        assert!(pool.cull(h).is_err());
        assert!(pool.consume(h).is_err());
        let foreign = ParticleHandle { pool: 9, index: 0 };
        assert!(matches!(
            pool.consume(foreign),
            Err(SimError::UnknownHandle { pool: 0 })
        ));
    }

    #[test]
    fn test_counts_always_sum_to_capacity() {
        let mut pool = pool(5);
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        pool.consume(a).unwrap();
        pool.release(b, 10.0).unwrap();
        let counts = pool.counts();
        assert_eq!(counts.total(), pool.capacity());
        assert_eq!((counts.free, counts.assigned, counts.consumed, counts.freed), (3, 0, 1, 1));
    }

    #[test]
    fn test_reset_frees_everything() {
        let mut pool = pool(4);
        let mut rng = Pcg32::seed_from_u64(2);
        for _ in 0..4 {
            let h = pool.acquire().unwrap();
            pool.consume(h).unwrap();
        }
        pool.reset(Bounds::default(), &mut rng);
        assert_eq!(pool.counts().free, 4);
        assert!(pool.particles().iter().all(|p| p.target.is_none()));
    }
}
