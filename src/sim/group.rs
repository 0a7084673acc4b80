//! Groups: one clock field mapped onto slots of a pool
//!
//! A group keeps `slots[i]` filled for every `i < count`. Slots are filled in
//! ascending order and released in descending order. The descending release
//! only undoes the most recently filled slots first so the display shrinks
//! from its tail; nothing else depends on it.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::layout::{self, LayoutStyle, Target};
use super::pool::{ParticleHandle, Pool};
use super::stage::{StageMachine, StageThresholds};
use crate::clock::FieldKind;
use crate::error::{Result, SimError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    /// Field whose value is the number of filled slots
    pub count_field: FieldKind,
    /// Field whose value picks the glyph (glyph layouts only)
    #[serde(default)]
    pub shape_field: Option<FieldKind>,
    /// Index of the pool this group draws from
    pub pool: usize,
    /// Number of slots; values above this are clamped
    pub slots: usize,
    pub layout: LayoutStyle,
    /// Upper bound of the random kick given to released particles (px/s)
    #[serde(default)]
    pub release_speed: f32,
}

/// What a reconcile pass changed
#[derive(Debug, Default)]
pub struct Reconciled {
    /// Newly filled `(slot, handle)` pairs, ascending
    pub acquired: Vec<(usize, ParticleHandle)>,
    /// Released `(slot, handle)` pairs, descending
    pub released: Vec<(usize, ParticleHandle)>,
    /// Slots that stayed empty because the pool ran dry
    pub unfilled: usize,
}

#[derive(Debug, Clone)]
pub struct Group {
    pub id: usize,
    pub config: GroupConfig,
    pub stage: StageMachine,
    slots: Vec<Option<ParticleHandle>>,
    targets: Vec<Target>,
    count: usize,
    shape: Option<u32>,
}

impl Group {
    pub fn new(id: usize, config: GroupConfig, thresholds: StageThresholds) -> Self {
        let slots = vec![None; config.slots];
        Self {
            id,
            config,
            stage: StageMachine::new(thresholds),
            slots,
            targets: Vec::new(),
            count: 0,
            shape: None,
        }
    }

    pub fn pool(&self) -> usize {
        self.config.pool
    }

    pub fn layout_style(&self) -> &LayoutStyle {
        &self.config.layout
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[Option<ParticleHandle>] {
        &self.slots
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn target(&self, slot: usize) -> Option<Target> {
        self.targets.get(slot).copied()
    }

    /// Desired number of filled slots from the last reading
    pub fn count(&self) -> usize {
        self.count
    }

    /// Handles currently held by this group, in slot order
    pub fn held(&self) -> impl Iterator<Item = (usize, ParticleHandle)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, h)| h.map(|h| (slot, h)))
    }

    /// Field that picks the layout shape
    pub fn shape_kind(&self) -> FieldKind {
        self.config.shape_field.unwrap_or(self.config.count_field)
    }

    /// True when the layout for `shape` differs from the current one
    pub fn needs_layout(&self, shape: u32) -> bool {
        self.targets.is_empty() || (!self.config.layout.is_orbit() && self.shape != Some(shape))
    }

    /// Regenerate targets for `shape`. On failure the group falls back to a
    /// ring around the layout anchor and the error is returned for reporting.
    pub fn regenerate(&mut self, origin: Vec2, shape: u32) -> Result<()> {
        let result = layout::layout(&self.config.layout, origin, shape, self.slot_count());
        self.shape = Some(shape);
        match result {
            Ok(targets) => {
                self.targets = targets;
                Ok(())
            }
            Err(err) => {
                self.targets = layout::fallback_ring(&self.config.layout, origin, self.slot_count());
                Err(err)
            }
        }
    }

    /// Bring slot occupancy in line with `value`.
    ///
    /// Empty slots below the count are filled lowest first, including slots
    /// left empty by an earlier exhaustion. Held slots at or above the count
    /// are released highest first.
    pub fn reconcile(&mut self, value: u32, pool: &mut Pool, freed_life: f32) -> Result<Reconciled> {
        self.count = (value as usize).min(self.slot_count());
        let mut out = Reconciled::default();

        for slot in (self.count..self.slot_count()).rev() {
            if let Some(handle) = self.slots[slot].take() {
                pool.release(handle, freed_life)?;
                out.released.push((slot, handle));
            }
        }

        for slot in 0..self.count {
            if self.slots[slot].is_some() {
                continue;
            }
            match pool.acquire() {
                Ok(handle) => {
                    self.slots[slot] = Some(handle);
                    out.acquired.push((slot, handle));
                }
                Err(SimError::PoolExhausted { .. }) => {
                    out.unfilled = self.count - slot - self.count_filled_from(slot);
                    break;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(out)
    }

    fn count_filled_from(&self, slot: usize) -> usize {
        self.slots[slot..self.count].iter().filter(|s| s.is_some()).count()
    }

    /// Drop every slot and target without touching the pool
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.targets.clear();
        self.count = 0;
        self.shape = None;
        self.stage.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bounds;
    use crate::sim::pool::IdleBehavior;
    use crate::sim::state::ParticleState;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn setup(capacity: usize, slots: usize) -> (Group, Pool) {
        let mut rng = Pcg32::seed_from_u64(0);
        let pool = Pool::new(0, "p", capacity, IdleBehavior::Hidden, 0, Bounds::default(), &mut rng);
        let config = GroupConfig {
            name: "seconds".into(),
            count_field: FieldKind::Seconds,
            shape_field: None,
            pool: 0,
            slots,
            layout: LayoutStyle::Orbit {
                offset: Vec2::ZERO,
                radius: 180.0,
                phase: 0.0,
            },
            release_speed: 0.0,
        };
        (Group::new(0, config, StageThresholds::default()), pool)
    }

    #[test]
    fn test_increase_acquires_difference_in_slot_order() {
        let (mut group, mut pool) = setup(60, 60);
        let first = group.reconcile(3, &mut pool, 255.0).unwrap();
        assert_eq!(first.acquired.iter().map(|a| a.0).collect::<Vec<_>>(), vec![0, 1, 2]);

        let second = group.reconcile(7, &mut pool, 255.0).unwrap();
        assert_eq!(second.acquired.len(), 4);
        assert_eq!(second.acquired[0].0, 3);
        assert!(second.released.is_empty());
        assert_eq!(pool.counts().assigned, 7);
    }

    #[test]
    fn test_decrease_releases_descending() {
        let (mut group, mut pool) = setup(60, 60);
        group.reconcile(5, &mut pool, 255.0).unwrap();
        let out = group.reconcile(2, &mut pool, 255.0).unwrap();
        assert_eq!(out.released.iter().map(|r| r.0).collect::<Vec<_>>(), vec![4, 3, 2]);
        assert_eq!(pool.counts().freed, 3);
        assert_eq!(group.held().count(), 2);
    }

    #[test]
    fn test_exhaustion_retries_next_tick() {
        let (mut group, mut pool) = setup(3, 10);
        let out = group.reconcile(5, &mut pool, 255.0).unwrap();
        assert_eq!(out.acquired.len(), 3);
        assert_eq!(out.unfilled, 2);

        // Free one particle elsewhere, then the same value fills a slot
        let (_, handle) = group.held().next().unwrap();
        let slot0 = group.slots[0].take();
        assert_eq!(slot0, Some(handle));
        pool.release(handle, 1.0).unwrap();
        pool.cull(handle).unwrap();

        let retry = group.reconcile(5, &mut pool, 255.0).unwrap();
        assert_eq!(retry.acquired.len(), 1);
        assert_eq!(retry.acquired[0].0, 0);
        assert_eq!(retry.unfilled, 2);
    }

    #[test]
    fn test_value_clamped_to_slots() {
        let (mut group, mut pool) = setup(60, 10);
        group.reconcile(59, &mut pool, 255.0).unwrap();
        assert_eq!(group.count(), 10);
        assert_eq!(pool.counts().assigned, 10);
    }

    #[test]
    fn test_same_value_keeps_consumed() {
        let (mut group, mut pool) = setup(10, 10);
        group.reconcile(4, &mut pool, 255.0).unwrap();
        for (_, h) in group.held().collect::<Vec<_>>() {
            pool.consume(h).unwrap();
        }
        group.regenerate(Vec2::ZERO, 4).unwrap();
        let out = group.reconcile(4, &mut pool, 255.0).unwrap();
        assert!(out.acquired.is_empty() && out.released.is_empty());
        assert!(pool.particles()[..4].iter().all(|p| p.state == ParticleState::Consumed));
    }

    #[test]
    fn test_glyph_fallback_on_regenerate() {
        let (mut group, _) = setup(10, 10);
        group.config.layout = LayoutStyle::Glyph {
            offset: Vec2::ZERO,
            width: 70.0,
            height: 120.0,
        };
        assert!(group.regenerate(Vec2::ZERO, 11).is_err());
        assert_eq!(group.targets().len(), 10);
        assert!(group.regenerate(Vec2::ZERO, 8).is_ok());
        assert!(!group.needs_layout(8));
        assert!(group.needs_layout(3));
    }
}
