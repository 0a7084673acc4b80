//! Body backend: the minimal point-mass capability set the force model needs
//!
//! The simulation only ever creates point masses, pushes forces into them,
//! reads them back and destroys them. Any physics engine offering that can
//! stand in for the bundled [`PointMassWorld`].

use glam::Vec2;

/// Opaque handle to a body owned by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyId(pub u32);

pub trait BodyBackend {
    /// Create a point mass
    fn create(&mut self, pos: Vec2, vel: Vec2) -> BodyId;
    /// Accumulate a force (unit mass: force == acceleration) for the next step
    fn apply_force(&mut self, id: BodyId, force: Vec2);
    fn position(&self, id: BodyId) -> Option<Vec2>;
    fn velocity(&self, id: BodyId) -> Option<Vec2>;
    fn set_position(&mut self, id: BodyId, pos: Vec2);
    fn set_velocity(&mut self, id: BodyId, vel: Vec2);
    /// Remove a body; later calls with this id are ignored
    fn destroy(&mut self, id: BodyId);
    /// Integrate all bodies by `dt` seconds and clear accumulated forces
    fn step(&mut self, dt: f32);
    /// Number of live bodies
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
struct PointMass {
    pos: Vec2,
    vel: Vec2,
    force: Vec2,
}

/// Zero-gravity point masses with linear air drag and semi-implicit Euler
#[derive(Debug, Clone, Default)]
pub struct PointMassWorld {
    bodies: Vec<Option<PointMass>>,
    free_slots: Vec<u32>,
    /// Linear drag coefficient (1/s)
    pub air_drag: f32,
}

impl PointMassWorld {
    pub fn new(air_drag: f32) -> Self {
        Self {
            bodies: Vec::new(),
            free_slots: Vec::new(),
            air_drag,
        }
    }

    fn get(&self, id: BodyId) -> Option<&PointMass> {
        self.bodies.get(id.0 as usize).and_then(|b| b.as_ref())
    }

    fn get_mut(&mut self, id: BodyId) -> Option<&mut PointMass> {
        self.bodies.get_mut(id.0 as usize).and_then(|b| b.as_mut())
    }
}

impl BodyBackend for PointMassWorld {
    fn create(&mut self, pos: Vec2, vel: Vec2) -> BodyId {
        let body = PointMass {
            pos,
            vel,
            force: Vec2::ZERO,
        };
        // Reuse the lowest freed slot for stable ids across resets
        if let Some(slot) = self.free_slots.pop() {
            self.bodies[slot as usize] = Some(body);
            return BodyId(slot);
        }
        self.bodies.push(Some(body));
        BodyId(self.bodies.len() as u32 - 1)
    }

    fn apply_force(&mut self, id: BodyId, force: Vec2) {
        if let Some(body) = self.get_mut(id) {
            body.force += force;
        }
    }

    fn position(&self, id: BodyId) -> Option<Vec2> {
        self.get(id).map(|b| b.pos)
    }

    fn velocity(&self, id: BodyId) -> Option<Vec2> {
        self.get(id).map(|b| b.vel)
    }

    fn set_position(&mut self, id: BodyId, pos: Vec2) {
        if let Some(body) = self.get_mut(id) {
            body.pos = pos;
        }
    }

    fn set_velocity(&mut self, id: BodyId, vel: Vec2) {
        if let Some(body) = self.get_mut(id) {
            body.vel = vel;
        }
    }

    fn destroy(&mut self, id: BodyId) {
        if let Some(slot) = self.bodies.get_mut(id.0 as usize) {
            if slot.take().is_some() {
                self.free_slots.push(id.0);
                // Keep lowest slot at the end so pop() returns it
                self.free_slots.sort_unstable_by(|a, b| b.cmp(a));
            }
        }
    }

    fn step(&mut self, dt: f32) {
        let damping = (1.0 - self.air_drag * dt).clamp(0.0, 1.0);
        for body in self.bodies.iter_mut().flatten() {
            body.vel = (body.vel + body.force * dt) * damping;
            body.pos += body.vel * dt;
            body.force = Vec2::ZERO;
        }
    }

    fn len(&self) -> usize {
        self.bodies.iter().filter(|b| b.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_force_integrates_and_clears() {
        let mut world = PointMassWorld::new(0.0);
        let id = world.create(Vec2::ZERO, Vec2::ZERO);
        world.apply_force(id, Vec2::new(10.0, 0.0));
        world.step(0.5);
        assert_eq!(world.velocity(id), Some(Vec2::new(5.0, 0.0)));
        assert_eq!(world.position(id), Some(Vec2::new(2.5, 0.0)));

        // Force was consumed by the step
        world.step(0.5);
        assert_eq!(world.velocity(id), Some(Vec2::new(5.0, 0.0)));
    }

    #[test]
    fn test_air_drag_slows_bodies() {
        let mut world = PointMassWorld::new(0.6);
        let id = world.create(Vec2::ZERO, Vec2::new(100.0, 0.0));
        for _ in 0..60 {
            world.step(1.0 / 60.0);
        }
        let v = world.velocity(id).unwrap().x;
        assert!(v < 60.0 && v > 50.0, "v = {v}");
    }

    #[test]
    fn test_destroy_and_reuse() {
        let mut world = PointMassWorld::new(0.0);
        let a = world.create(Vec2::ZERO, Vec2::ZERO);
        let b = world.create(Vec2::ONE, Vec2::ZERO);
        world.destroy(a);
        world.destroy(a); // second destroy is a no-op
        assert_eq!(world.len(), 1);
        assert_eq!(world.position(a), None);
        world.apply_force(a, Vec2::ONE); // ignored

        let c = world.create(Vec2::ZERO, Vec2::ZERO);
        assert_eq!(c, a);
        assert_ne!(c, b);
        assert_eq!(world.len(), 2);
    }
}
