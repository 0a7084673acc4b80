//! Fixed timestep simulation
//!
//! The [`Simulator`] owns every pool, group and body. Clock ticks and time
//! source switches are queued as commands and applied at the start of the
//! next step, so a step never observes half-updated digits.

use std::collections::VecDeque;
use std::f32::consts::{FRAC_PI_4, TAU};

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::body::{BodyBackend, BodyId, PointMassWorld};
use super::control::ControlVariable;
use super::forces;
use super::group::Group;
use super::layout::Target;
use super::pool::{IdleBehavior, Pool, PoolCounts};
use super::stage::Stage;
use super::state::{Owner, ParticleState, ParticleView, Spark, SparkView};
use crate::Bounds;
use crate::clock::{ClockField, ClockTime, DigitMapper, FieldKind, ManualClock, SystemClock, TickTimer, TimeSource};
use crate::error::{Result, SimError};
use crate::settings::SimConfig;

/// Events kept when the host never drains them
const MAX_PENDING_EVENTS: usize = 4096;

/// Input for a single step
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Raise the control variable (W)
    pub accelerate: bool,
    /// Lower the control variable (S)
    pub decelerate: bool,
    /// Arrow-key gravity direction, each component in [-1, 1]
    pub gravity: Vec2,
}

/// Observable notifications, drained by the host
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    StageChanged { group: usize, from: Stage, to: Stage },
    Captured { group: usize, slot: usize, particle: u32 },
    Released { group: usize, slot: usize, particle: u32 },
    PoolExhausted { group: usize, pool: usize, unfilled: usize },
    LayoutFallback { group: usize, reason: String },
    MinuteRollover,
    HourRollover,
    DayRollover,
    Reset,
}

enum SimCommand {
    AdvanceDigits,
    SetSource(Box<dyn TimeSource>),
}

pub struct Simulator<B: BodyBackend = PointMassWorld> {
    config: SimConfig,
    bounds: Bounds,
    backend: B,
    pools: Vec<Pool>,
    groups: Vec<Group>,
    mapper: DigitMapper,
    control: ControlVariable,
    source: Box<dyn TimeSource>,
    last_time: Option<ClockTime>,
    /// Next tick reads the new source before advancing it
    source_switched: bool,
    clock_timer: TickTimer,
    accumulator: f32,
    commands: VecDeque<SimCommand>,
    events: VecDeque<SimEvent>,
    sparks: Vec<Spark>,
    rng: Pcg32,
    step_count: u64,
}

impl Simulator<PointMassWorld> {
    /// Simulator over the bundled point-mass backend
    pub fn new(config: SimConfig, source: Box<dyn TimeSource>) -> Result<Self> {
        let backend = PointMassWorld::new(config.air_drag);
        Self::with_backend(config, source, backend)
    }
}

impl<B: BodyBackend> Simulator<B> {
    pub fn with_backend(config: SimConfig, source: Box<dyn TimeSource>, backend: B) -> Result<Self> {
        config.validate()?;

        let mut rng = Pcg32::seed_from_u64(config.seed);
        let bounds = config.bounds;
        let mut first_id = 0u32;
        let pools = config
            .pools
            .iter()
            .enumerate()
            .map(|(id, pc)| {
                let pool = Pool::new(id, pc.name.clone(), pc.capacity, pc.idle, first_id, bounds, &mut rng);
                first_id += pc.capacity as u32;
                pool
            })
            .collect();
        let groups = config
            .groups
            .iter()
            .enumerate()
            .map(|(id, gc)| Group::new(id, gc.clone(), config.stages))
            .collect::<Vec<_>>();
        let mapper = DigitMapper::new(groups.iter().flat_map(|g: &Group| [g.config.count_field, g.shape_kind()]));

        let mut sim = Self {
            control: ControlVariable::new(config.control),
            clock_timer: TickTimer::new(config.tick_period),
            config,
            bounds,
            backend,
            pools,
            groups,
            mapper,
            source,
            last_time: None,
            source_switched: false,
            accumulator: 0.0,
            commands: VecDeque::new(),
            events: VecDeque::new(),
            sparks: Vec::new(),
            rng,
            step_count: 0,
        };
        sim.spawn_idle_bodies();

        log::info!(
            "Simulator ready: {} pools, {} groups, preset {}",
            sim.pools.len(),
            sim.groups.len(),
            sim.config.preset.as_str()
        );
        Ok(sim)
    }

    // ---------------------------------------------------------------------
    // Commands
    // ---------------------------------------------------------------------

    /// Request one logical clock tick (applied at the start of the next step)
    pub fn schedule_clock_tick(&mut self) {
        self.commands.push_back(SimCommand::AdvanceDigits);
    }

    /// Switch to override time starting at `start`
    pub fn set_time_override(&mut self, start: ClockTime) {
        self.commands
            .push_back(SimCommand::SetSource(Box::new(ManualClock::new(start))));
    }

    /// Switch back to local wall-clock time
    pub fn use_system_clock(&mut self) {
        self.commands.push_back(SimCommand::SetSource(Box::new(SystemClock)));
    }

    pub fn set_time_source(&mut self, source: Box<dyn TimeSource>) {
        self.commands.push_back(SimCommand::SetSource(source));
    }

    /// Feed real elapsed time to the internal 1 Hz timer; schedules due ticks.
    /// Hosts with their own timer call [`Self::schedule_clock_tick`] instead.
    pub fn update_clock(&mut self, frame_dt: f32) -> u32 {
        let due = self.clock_timer.update(frame_dt);
        for _ in 0..due {
            self.schedule_clock_tick();
        }
        due
    }

    // ---------------------------------------------------------------------
    // Stepping
    // ---------------------------------------------------------------------

    /// Run as many fixed steps as `frame_dt` allows, capped per frame.
    /// Returns the number of steps taken.
    pub fn advance(&mut self, frame_dt: f32, input: &TickInput) -> u32 {
        let dt = self.config.dt;
        let max_frame = dt * self.config.max_substeps as f32;
        self.accumulator = (self.accumulator + frame_dt.max(0.0)).min(max_frame);

        let mut substeps = 0;
        while self.accumulator >= dt && substeps < self.config.max_substeps {
            self.step(input);
            self.accumulator -= dt;
            substeps += 1;
        }
        substeps
    }

    /// One fixed simulation step
    pub fn step(&mut self, input: &TickInput) {
        let dt = self.config.dt;

        self.drain_commands();
        self.control.update(input.accelerate, input.decelerate, dt);
        self.update_stages();

        let forces = self.compute_forces(input);
        for (body, force) in forces {
            self.backend.apply_force(body, force);
        }
        self.backend.step(dt);

        self.sync_bodies();
        self.capture();
        self.decay_freed();
        self.update_sparks(dt);
        self.step_count += 1;
    }

    /// Exclusive teardown: every particle free, no targets, control back to
    /// its baseline, every stage calm, pending commands dropped.
    pub fn reset(&mut self, bounds: Bounds) {
        for pool in &mut self.pools {
            for particle in pool.particles_mut() {
                if let Some(body) = particle.body.take() {
                    self.backend.destroy(body);
                }
            }
        }

        self.bounds = bounds;
        self.rng = Pcg32::seed_from_u64(self.config.seed);
        for pool in &mut self.pools {
            pool.reset(bounds, &mut self.rng);
        }
        for group in &mut self.groups {
            group.clear();
        }
        self.control.reset();
        self.commands.clear();
        self.events.clear();
        self.sparks.clear();
        self.last_time = None;
        self.source_switched = false;
        self.accumulator = 0.0;
        self.clock_timer.reset();
        self.spawn_idle_bodies();

        self.push_event(SimEvent::Reset);
        log::info!("Simulation reset ({}x{})", bounds.width, bounds.height);
    }

    fn spawn_idle_bodies(&mut self) {
        for pool in &mut self.pools {
            if pool.idle != IdleBehavior::Drift {
                continue;
            }
            for particle in pool.particles_mut() {
                if particle.body.is_none() {
                    particle.body = Some(self.backend.create(particle.pos, particle.vel));
                }
            }
        }
    }

    fn push_event(&mut self, event: SimEvent) {
        if self.events.len() >= MAX_PENDING_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    fn drain_commands(&mut self) {
        while let Some(command) = self.commands.pop_front() {
            match command {
                SimCommand::AdvanceDigits => self.advance_digits(),
                SimCommand::SetSource(source) => {
                    log::info!(
                        "Time source switched to {}",
                        if source.is_override() { "override" } else { "system clock" }
                    );
                    self.source = source;
                    // A jump in time is not a rollover
                    self.last_time = None;
                    self.source_switched = true;
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Clock tick: acquire / release bookkeeping
    // ---------------------------------------------------------------------

    /// One logical tick. The first tick after a source switch shows the
    /// source's start time; later ticks advance it by one second first.
    fn advance_digits(&mut self) {
        if !std::mem::take(&mut self.source_switched) {
            self.source.advance(1);
        }
        let now = self.source.now();

        if let Some(prev) = self.last_time {
            let rollover = prev.rollover_to(&now);
            if rollover.minute {
                self.push_event(SimEvent::MinuteRollover);
            }
            if rollover.hour {
                log::info!("Hour rollover at {}", now);
                self.push_event(SimEvent::HourRollover);
            }
            if rollover.day {
                log::info!("Day rollover");
                self.push_event(SimEvent::DayRollover);
            }
        }
        self.last_time = Some(now);

        let fields = self.mapper.map(&now);
        log::debug!("Clock tick {}", now);
        for index in 0..self.groups.len() {
            self.apply_group(index, &fields);
        }
    }

    fn apply_group(&mut self, index: usize, fields: &[ClockField]) {
        let field_value = |kind: FieldKind| {
            fields
                .iter()
                .find(|f| f.kind == kind)
                .map(|f| f.value)
                .unwrap_or(0)
        };
        let origin = self.bounds.center();
        let shape = field_value(self.groups[index].shape_kind());
        let value = field_value(self.groups[index].config.count_field);

        if self.groups[index].needs_layout(shape) {
            if let Err(err) = self.groups[index].regenerate(origin, shape) {
                log::warn!(
                    "Group {}: {}, using fallback ring",
                    self.groups[index].config.name,
                    err
                );
                self.push_event(SimEvent::LayoutFallback {
                    group: index,
                    reason: err.to_string(),
                });
            }
            self.retarget_held(index);
        }

        let pool_id = self.groups[index].pool();
        let freed_life = self.config.lifecycle.freed_life;
        let result = self.groups[index].reconcile(value, &mut self.pools[pool_id], freed_life);
        let reconciled = match result {
            Ok(r) => r,
            Err(err) => {
                log::error!("Group {} reconcile failed: {}", self.groups[index].config.name, err);
                return;
            }
        };

        let release_speed = self.groups[index].config.release_speed;
        for (slot, handle) in reconciled.released {
            let Some(particle) = self.pools[pool_id].get_mut(handle) else {
                continue;
            };
            if release_speed > 0.0 {
                let angle = self.rng.random_range(0.0..TAU);
                let speed = self.rng.random_range(0.4..=1.0) * release_speed * particle.tuning.speed_mul;
                particle.vel = Vec2::from_angle(angle) * speed;
                if let Some(body) = particle.body {
                    self.backend.set_velocity(body, particle.vel);
                }
            }
            let id = particle.id;
            self.push_event(SimEvent::Released {
                group: index,
                slot,
                particle: id,
            });
        }

        let attached = self.groups[index].stage.stage() != Stage::Breakaway;
        let hidden = self.pools[pool_id].idle == IdleBehavior::Hidden;
        for (slot, handle) in reconciled.acquired {
            let target = self.groups[index].target(slot);
            let Some(particle) = self.pools[pool_id].get_mut(handle) else {
                continue;
            };
            particle.owner = Some(Owner { group: index, slot });
            particle.target = target;
            particle.attached = attached;
            if hidden {
                // Hidden particles only exist while held: appear at the slot
                if let Some(target) = target {
                    particle.pos = target.pos;
                }
                particle.vel = Vec2::ZERO;
                if let Some(old) = particle.body.take() {
                    self.backend.destroy(old);
                }
                particle.body = Some(self.backend.create(particle.pos, particle.vel));
            }
        }

        if reconciled.unfilled > 0 {
            log::warn!(
                "Group {}: pool {} exhausted, {} slots unfilled",
                self.groups[index].config.name,
                pool_id,
                reconciled.unfilled
            );
            self.push_event(SimEvent::PoolExhausted {
                group: index,
                pool: pool_id,
                unfilled: reconciled.unfilled,
            });
        }
    }

    /// Point held particles at their slot's (new) target, in place
    fn retarget_held(&mut self, index: usize) {
        let group = &self.groups[index];
        let pool = &mut self.pools[group.pool()];
        for (slot, handle) in group.held() {
            if let (Some(particle), Some(target)) = (pool.get_mut(handle), group.target(slot)) {
                particle.target = Some(target);
            }
        }
    }

    // ---------------------------------------------------------------------
    // Stages
    // ---------------------------------------------------------------------

    fn update_stages(&mut self) {
        let magnitude = self.control.magnitude();
        for index in 0..self.groups.len() {
            let Some(transition) = self.groups[index].stage.update(magnitude) else {
                continue;
            };
            log::debug!(
                "Group {} stage {} -> {}",
                self.groups[index].config.name,
                transition.from.name(),
                transition.to.name()
            );

            let group = &self.groups[index];
            let pool = &mut self.pools[group.pool()];
            for (_, handle) in group.held() {
                let Some(particle) = pool.get_mut(handle) else {
                    continue;
                };
                if transition.detaches() {
                    particle.attached = false;
                } else if transition.reattaches() {
                    particle.attached = true;
                    let pos = particle.pos;
                    particle.target = particle.target.map(|t| t.reattached_at(pos));
                }
            }

            self.push_event(SimEvent::StageChanged {
                group: index,
                from: transition.from,
                to: transition.to,
            });
        }
    }

    // ---------------------------------------------------------------------
    // Forces
    // ---------------------------------------------------------------------

    /// Net force per body. Collected first and applied afterwards so no
    /// particle sees another's half-updated state.
    fn compute_forces(&mut self, input: &TickInput) -> Vec<(BodyId, Vec2)> {
        let cfg = self.config.forces;
        let bounds = self.bounds;
        let center = bounds.center();
        let control = self.control.value();
        let time = self.step_count as f32 * self.config.dt;
        let mut out = Vec::new();
        let mut skipped = 0usize;

        // Held particles
        for group in &self.groups {
            let stage = group.stage.stage();
            let pool = &self.pools[group.pool()];
            let members: Vec<_> = group
                .held()
                .filter_map(|(slot, h)| pool.get(h).map(|p| (slot, p)))
                .collect();
            let orbit_style = group.layout_style().is_orbit();

            for &(slot, p) in &members {
                let Some(body) = p.body else { continue };
                let mut force = Vec2::ZERO;

                if p.attached {
                    match p.target {
                        Some(Target {
                            orbit: Some(orbit), ..
                        }) => {
                            force += forces::orbit_constraint(
                                p.pos,
                                p.vel,
                                orbit.center,
                                orbit.radius,
                                cfg.orbit_stiffness,
                                cfg.orbit_damping,
                            );
                            // Agitated orbits get per-slot speed variance so planets collide
                            let variance = if stage == Stage::Agitated {
                                0.7 + slot as f32 * 0.15 + (time * 4.8 + slot as f32).sin() * 0.3
                            } else {
                                1.0
                            };
                            let magnitude = control * cfg.tangential_gain * variance * p.tuning.force_mul;
                            force += forces::tangential(p.pos, orbit.center, magnitude);
                        }
                        Some(target) => {
                            force += forces::seek(p.pos, target.pos, cfg.seek_gain * p.tuning.force_mul);
                        }
                        None => {}
                    }
                } else {
                    let jitter = self.rng.random_range(-FRAC_PI_4..FRAC_PI_4);
                    force += forces::momentum(p.pos, p.vel, center, control, jitter, &cfg);
                    force += forces::containment(p.pos, bounds, cfg.containment_margin, cfg.containment_strength);
                }

                if orbit_style {
                    for &(other_slot, other) in &members {
                        if other_slot == slot || !other.pos.is_finite() || !other.vel.is_finite() {
                            continue;
                        }
                        force += match stage {
                            Stage::Calm => forces::spacing(
                                p.pos,
                                other.pos,
                                cfg.spacing_distance,
                                cfg.spacing_strength,
                            ),
                            Stage::Agitated | Stage::Breakaway => {
                                forces::separation(p.pos, p.vel, other.pos, other.vel, &cfg)
                            }
                        };
                    }
                }

                if force.is_finite() {
                    out.push((body, force));
                } else {
                    skipped += 1;
                }
            }
        }

        // Idle and freed particles of drifting pools
        let idle_positions: Vec<Vec2> = self
            .pools
            .iter()
            .filter(|pool| pool.idle == IdleBehavior::Drift)
            .flat_map(|pool| pool.particles())
            .filter(|p| !p.state.is_held())
            .map(|p| p.pos)
            .filter(|pos| pos.is_finite())
            .collect();
        let has_gravity = input.gravity != Vec2::ZERO;

        for pool in &mut self.pools {
            if pool.idle != IdleBehavior::Drift {
                continue;
            }
            for p in pool.particles_mut() {
                if p.state.is_held() {
                    continue;
                }
                let Some(body) = p.body else { continue };
                let mut force = if has_gravity {
                    forces::field_gravity(input.gravity, cfg.field_gravity, p.tuning.gravity_mul)
                } else {
                    let turn = self.rng.random_range(-p.tuning.drift_turn..=p.tuning.drift_turn);
                    let (drift, heading) =
                        forces::drift(p.tuning.drift_heading, turn, p.tuning.drift_strength);
                    p.tuning.drift_heading = heading;
                    drift
                };
                for &other in &idle_positions {
                    force += forces::repulsion(p.pos, other, cfg.repulsion_distance, cfg.repulsion_strength);
                }
                force += forces::containment(p.pos, bounds, cfg.containment_margin, cfg.containment_strength);

                if force.is_finite() {
                    out.push((body, force));
                } else {
                    skipped += 1;
                }
            }
        }

        if skipped > 0 {
            log::warn!("Skipped {} particles with non-finite forces", skipped);
        }
        out
    }

    /// Mirror backend state into particles and clamp speeds
    fn sync_bodies(&mut self) {
        let cfg = self.config.forces;
        let center = self.bounds.center();
        for pool in &mut self.pools {
            for p in pool.particles_mut() {
                let Some(body) = p.body else { continue };
                let (Some(pos), Some(vel)) = (self.backend.position(body), self.backend.velocity(body)) else {
                    continue;
                };
                if !pos.is_finite() || !vel.is_finite() {
                    // Park a blown-up body at its target so it cannot poison neighbours
                    let park = p.target.map(|t| t.pos).unwrap_or(center);
                    log::warn!("Particle {} left finite space, parked at {:?}", p.id, park);
                    self.backend.set_position(body, park);
                    self.backend.set_velocity(body, Vec2::ZERO);
                    p.pos = park;
                    p.vel = Vec2::ZERO;
                    continue;
                }
                p.pos = pos;
                p.vel = vel;

                let max_speed = if p.state.is_held() {
                    cfg.max_speed
                } else {
                    cfg.idle_max_speed
                } * p.tuning.speed_mul;
                if let Some(clamped) = forces::clamp_speed(vel, max_speed) {
                    p.vel = clamped;
                    self.backend.set_velocity(body, clamped);
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Assigned -> Consumed for glyph particles within the capture distance.
    /// The state flip is the only record, so a capture counts once.
    fn capture(&mut self) {
        let capture_distance = self.config.lifecycle.capture_distance;
        let mut captured = Vec::new();
        for group in &self.groups {
            if group.layout_style().is_orbit() {
                continue;
            }
            let pool = &mut self.pools[group.pool()];
            for (slot, handle) in group.held() {
                let reached = pool.get(handle).is_some_and(|p| {
                    p.state == ParticleState::Assigned
                        && p.attached
                        && p.target
                            .is_some_and(|t| t.pos.distance(p.pos) < capture_distance)
                });
                if reached && pool.consume(handle).is_ok() {
                    let id = pool.get(handle).map(|p| p.id).unwrap_or_default();
                    captured.push(SimEvent::Captured {
                        group: group.id,
                        slot,
                        particle: id,
                    });
                }
            }
        }
        for event in captured {
            self.push_event(event);
        }
    }

    /// Age freed particles and return them to the pool when spent or gone
    fn decay_freed(&mut self) {
        let decay = self.config.lifecycle.freed_life_decay;
        let margin = self.config.lifecycle.cull_margin;
        let bounds = self.bounds;

        for pool in &mut self.pools {
            let hidden = pool.idle == IdleBehavior::Hidden;
            for index in 0..pool.capacity() {
                let handle = pool.handle(index);
                let particle = &mut pool.particles_mut()[index];
                let ParticleState::Freed { life } = &mut particle.state else {
                    continue;
                };
                *life -= decay;
                let offscreen = hidden && !bounds.contains_with_margin(particle.pos, margin);
                if *life > 0.0 && !offscreen {
                    continue;
                }

                if hidden {
                    if let Some(body) = particle.body.take() {
                        self.backend.destroy(body);
                    }
                }
                if let Err(err) = pool.cull(handle) {
                    log::error!("Cull failed: {}", err);
                }
            }
        }
    }

    fn update_sparks(&mut self, dt: f32) {
        self.sparks.retain_mut(|s| s.update(dt));

        let cfg = self.config.sparks;
        if !cfg.enabled {
            return;
        }
        let chance = (cfg.rate * dt).clamp(0.0, 1.0);
        for group in &self.groups {
            if group.stage.stage() == Stage::Calm {
                continue;
            }
            let pool = &self.pools[group.pool()];
            for (_, handle) in group.held() {
                if self.sparks.len() >= cfg.max {
                    return;
                }
                let Some(p) = pool.get(handle) else { continue };
                if !self.rng.random_bool(chance as f64) {
                    continue;
                }
                let angle = self.rng.random_range(0.0..TAU);
                let speed = cfg.speed * self.rng.random_range(0.5..1.0);
                self.sparks.push(Spark {
                    pos: p.pos,
                    vel: p.vel * 0.5 + Vec2::from_angle(angle) * speed,
                    life: 1.0,
                    size: self.rng.random_range(1.0..4.0),
                });
            }
        }
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Visible particles for the render sink
    pub fn views(&self) -> Vec<ParticleView> {
        let freed_life = self.config.lifecycle.freed_life.max(f32::EPSILON);
        let mut views = Vec::new();
        for pool in &self.pools {
            for p in pool.particles() {
                let alpha = match p.state {
                    ParticleState::Free if pool.idle == IdleBehavior::Hidden => continue,
                    ParticleState::Freed { life } => (life / freed_life).clamp(0.0, 1.0),
                    _ => 1.0,
                };
                let group = p.owner.map(|o| o.group);
                let stage = group
                    .and_then(|g| self.groups.get(g))
                    .map(|g| g.stage.stage())
                    .unwrap_or_default();
                views.push(ParticleView {
                    id: p.id,
                    pos: p.pos,
                    vel: p.vel,
                    state: p.state,
                    group,
                    stage,
                    alpha,
                });
            }
        }
        views
    }

    pub fn sparks(&self) -> Vec<SparkView> {
        self.sparks.iter().map(Spark::view).collect()
    }

    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        self.events.drain(..).collect()
    }

    /// Slots of `group` whose particle was captured and still sits on its
    /// target. A captured particle sent to a new glyph stays `Consumed` but
    /// is not counted until it arrives.
    pub fn filled_count(&self, group: usize) -> usize {
        let Some(group) = self.groups.get(group) else {
            return 0;
        };
        let pool = &self.pools[group.pool()];
        let capture_distance = self.config.lifecycle.capture_distance;
        group
            .held()
            .filter(|&(_, h)| {
                pool.get(h).is_some_and(|p| {
                    p.state == ParticleState::Consumed
                        && p.target
                            .is_some_and(|t| t.pos.distance(p.pos) < capture_distance)
                })
            })
            .count()
    }

    pub fn pool_counts(&self, pool: usize) -> Result<PoolCounts> {
        self.pools
            .get(pool)
            .map(Pool::counts)
            .ok_or(SimError::UnknownHandle { pool })
    }

    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn stage(&self, group: usize) -> Option<Stage> {
        self.groups.get(group).map(|g| g.stage.stage())
    }

    pub fn control(&self) -> f32 {
        self.control.value()
    }

    /// Time of the last clock tick
    pub fn time(&self) -> Option<ClockTime> {
        self.last_time
    }

    pub fn is_override(&self) -> bool {
        self.source.is_override()
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{PoolConfig, Preset};
    use crate::sim::group::GroupConfig;
    use crate::sim::layout::LayoutStyle;

    fn at(h: u32, m: u32, s: u32) -> Box<dyn TimeSource> {
        Box::new(ManualClock::new(ClockTime::new(h, m, s).unwrap()))
    }

    /// One seconds group over a 60-particle pool
    fn seconds_config(capacity: usize, idle: IdleBehavior, layout: LayoutStyle) -> SimConfig {
        let mut config = SimConfig::from_preset(Preset::DigitGrid);
        config.pools = vec![PoolConfig {
            name: "seconds".into(),
            capacity,
            idle,
        }];
        config.groups = vec![GroupConfig {
            name: "seconds".into(),
            count_field: FieldKind::Seconds,
            shape_field: Some(FieldKind::SecondsTens),
            pool: 0,
            slots: 60,
            layout,
            release_speed: 30.0,
        }];
        config.sparks.enabled = false;
        config
    }

    fn orbit() -> LayoutStyle {
        LayoutStyle::Orbit {
            offset: Vec2::ZERO,
            radius: 180.0,
            phase: 0.0,
        }
    }

    fn glyph() -> LayoutStyle {
        LayoutStyle::Glyph {
            offset: Vec2::ZERO,
            width: 80.0,
            height: 140.0,
        }
    }

    fn tick(sim: &mut Simulator) {
        sim.schedule_clock_tick();
        sim.step(&TickInput::default());
    }

    fn assert_capacity(sim: &Simulator) {
        for pool in sim.pools() {
            assert_eq!(pool.counts().total(), pool.capacity());
        }
    }

    #[test]
    fn test_five_ticks_five_particles() {
        let config = seconds_config(60, IdleBehavior::Drift, glyph());
        let mut sim = Simulator::new(config, at(0, 0, 0)).unwrap();
        for _ in 0..5 {
            tick(&mut sim);
            assert_capacity(&sim);
        }
        let counts = sim.pool_counts(0).unwrap();
        assert_eq!(counts.assigned + counts.consumed, 5);
        assert_eq!(sim.time().unwrap().to_string(), "00:00:05");
    }

    #[test]
    fn test_minute_rollover_frees_and_culls() {
        let config = seconds_config(60, IdleBehavior::Drift, glyph());
        let mut sim = Simulator::new(config, at(0, 0, 58)).unwrap();
        tick(&mut sim);
        let counts = sim.pool_counts(0).unwrap();
        assert_eq!(counts.assigned + counts.consumed, 59);

        for _ in 0..300 {
            sim.step(&TickInput::default());
        }
        sim.drain_events();

        // 00:00:59 -> 00:01:00
        tick(&mut sim);
        let events = sim.drain_events();
        assert!(events.contains(&SimEvent::MinuteRollover));
        let counts = sim.pool_counts(0).unwrap();
        assert_eq!(counts.freed, 59);
        assert_eq!(counts.assigned + counts.consumed, 0);

        // Life 255 at 3 per step: gone within 85 steps, counting the tick step
        for _ in 0..84 {
            sim.step(&TickInput::default());
            assert_capacity(&sim);
        }
        assert_eq!(sim.pool_counts(0).unwrap().free, 60);
    }

    #[test]
    fn test_release_in_descending_slot_order() {
        let config = seconds_config(60, IdleBehavior::Hidden, orbit());
        let mut sim = Simulator::new(config, at(0, 0, 3)).unwrap();
        tick(&mut sim);
        sim.drain_events();
        sim.set_time_override(ClockTime::new(0, 0, 1).unwrap());
        tick(&mut sim);

        let slots: Vec<usize> = sim
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                SimEvent::Released { slot, .. } => Some(slot),
                _ => None,
            })
            .collect();
        // 00:00:04 -> override start 00:00:01 keeps slot 0
        assert_eq!(slots, vec![3, 2, 1]);
    }

    #[test]
    fn test_capture_counts_once() {
        let config = seconds_config(60, IdleBehavior::Drift, glyph());
        let mut sim = Simulator::new(config, at(0, 0, 0)).unwrap();
        tick(&mut sim);

        let mut captures = 0;
        for _ in 0..1800 {
            sim.step(&TickInput::default());
            captures += sim
                .drain_events()
                .iter()
                .filter(|e| matches!(e, SimEvent::Captured { .. }))
                .count();
        }
        assert_eq!(captures, 1);
        assert_eq!(sim.filled_count(0), 1);
        assert_eq!(sim.pool_counts(0).unwrap().consumed, 1);
    }

    #[test]
    fn test_retargeted_particle_counts_filled_only_on_arrival() {
        let config = seconds_config(60, IdleBehavior::Drift, glyph());
        let mut sim = Simulator::new(config, at(0, 0, 0)).unwrap();
        tick(&mut sim);
        for _ in 0..1800 {
            sim.step(&TickInput::default());
        }
        assert_eq!(sim.filled_count(0), 1);
        sim.drain_events();

        // Same as a glyph change moving the slot's target
        let particle = sim.pools[0].particles_mut().iter_mut().find(|p| p.state.is_held()).unwrap();
        let moved = particle.target.unwrap().pos + Vec2::new(0.0, -60.0);
        particle.target = Some(Target::point(moved));
        assert_eq!(sim.filled_count(0), 0);
        assert_eq!(sim.pool_counts(0).unwrap().consumed, 1);

        for _ in 0..1800 {
            sim.step(&TickInput::default());
        }
        assert_eq!(sim.filled_count(0), 1);
        // Arriving again is not a second capture
        assert!(!sim.drain_events().iter().any(|e| matches!(e, SimEvent::Captured { .. })));
    }

    #[test]
    fn test_pool_exhaustion_recovers() {
        let config = seconds_config(3, IdleBehavior::Hidden, orbit());
        let mut sim = Simulator::new(config, at(0, 0, 58)).unwrap();
        tick(&mut sim);
        let events = sim.drain_events();
        assert!(events.contains(&SimEvent::PoolExhausted {
            group: 0,
            pool: 0,
            unfilled: 56
        }));
        assert_eq!(sim.pool_counts(0).unwrap().assigned, 3);

        // Rollover releases, culling returns them, next tick refills
        tick(&mut sim);
        for _ in 0..90 {
            sim.step(&TickInput::default());
        }
        assert_eq!(sim.pool_counts(0).unwrap().free, 3);
        tick(&mut sim);
        assert_eq!(sim.pool_counts(0).unwrap().assigned, 1);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let config = SimConfig::from_preset(Preset::DigitGrid);
        let mut sim = Simulator::new(config, at(12, 34, 56)).unwrap();
        tick(&mut sim);
        for _ in 0..30 {
            sim.step(&TickInput::default());
        }

        sim.reset(Bounds::default());
        let first = sim.views();
        let first_bodies = sim.backend().len();
        sim.reset(Bounds::default());
        assert_eq!(sim.views(), first);
        assert_eq!(sim.backend().len(), first_bodies);

        for pool in sim.pools() {
            assert_eq!(pool.counts().free, pool.capacity());
            assert!(pool.particles().iter().all(|p| p.target.is_none()));
        }
        assert!(sim.groups().iter().all(|g| g.targets().is_empty()));
        assert_eq!(sim.control(), sim.config().control.baseline);
        assert_eq!(sim.drain_events(), vec![SimEvent::Reset]);
    }

    #[test]
    fn test_breakaway_detaches_once_and_reattaches() {
        let config = seconds_config(60, IdleBehavior::Hidden, orbit());
        let mut sim = Simulator::new(config, at(0, 0, 9)).unwrap();
        tick(&mut sim);

        let speed_up = TickInput {
            accelerate: true,
            ..Default::default()
        };
        let mut breakaways = 0;
        for _ in 0..900 {
            sim.step(&speed_up);
            breakaways += sim
                .drain_events()
                .iter()
                .filter(|e| matches!(e, SimEvent::StageChanged { to: Stage::Breakaway, .. }))
                .count();
        }
        assert_eq!(breakaways, 1);
        assert_eq!(sim.stage(0), Some(Stage::Breakaway));
        assert!(sim.pools()[0].particles().iter().filter(|p| p.state.is_held()).all(|p| !p.attached));

        for _ in 0..600 {
            sim.step(&TickInput::default());
        }
        assert_eq!(sim.stage(0), Some(Stage::Calm));
        for p in sim.pools()[0].particles().iter().filter(|p| p.state.is_held()) {
            assert!(p.attached);
            let target = p.target.unwrap();
            let orbit = target.orbit.unwrap();
            assert!((target.pos.distance(orbit.center) - orbit.radius).abs() < 1e-2);
        }
    }

    #[test]
    fn test_deterministic_with_same_seed() {
        let run = || {
            let mut sim = Simulator::new(SimConfig::from_preset(Preset::Planets), at(10, 59, 50)).unwrap();
            let input = TickInput {
                accelerate: true,
                ..Default::default()
            };
            for i in 0..240 {
                if i % 60 == 0 {
                    sim.schedule_clock_tick();
                }
                sim.step(&input);
            }
            sim.views()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_non_finite_particle_is_isolated() {
        let config = seconds_config(60, IdleBehavior::Hidden, orbit());
        let mut sim = Simulator::new(config, at(0, 0, 4)).unwrap();
        tick(&mut sim);
        let input = TickInput::default();
        assert_eq!(sim.compute_forces(&input).len(), 5);

        sim.pools[0].particles_mut()[0].pos = Vec2::NAN;
        let bad = sim.pools[0].particles()[0].body.unwrap();
        let forces = sim.compute_forces(&input);
        // Only the broken particle loses its force; neighbours keep theirs
        assert_eq!(forces.len(), 4);
        assert!(forces.iter().all(|&(body, f)| body != bad && f.is_finite()));

        sim.step(&input);

        for p in sim.pools()[0].particles().iter().filter(|p| p.state.is_held()) {
            assert!(p.pos.is_finite() && p.vel.is_finite());
        }
    }

    #[test]
    fn test_blown_up_body_is_parked_at_target() {
        let config = seconds_config(60, IdleBehavior::Hidden, orbit());
        let mut sim = Simulator::new(config, at(0, 0, 0)).unwrap();
        tick(&mut sim);

        let body = sim.pools[0].particles()[0].body.unwrap();
        sim.backend.set_position(body, Vec2::new(f32::INFINITY, 0.0));
        sim.step(&TickInput::default());

        let p = &sim.pools()[0].particles()[0];
        assert_eq!(p.pos, p.target.unwrap().pos);
        assert_eq!(p.vel, Vec2::ZERO);
        assert_eq!(sim.backend().position(body), Some(p.pos));
    }

    #[test]
    fn test_source_switch_and_override() {
        let config = seconds_config(60, IdleBehavior::Hidden, orbit());
        let mut sim = Simulator::new(config, Box::new(SystemClock)).unwrap();
        assert!(!sim.is_override());
        sim.set_time_override(ClockTime::new(23, 59, 58).unwrap());
        tick(&mut sim);
        assert!(sim.is_override());
        // The first tick shows the chosen start time itself
        assert_eq!(sim.time(), Some(ClockTime::new(23, 59, 58).unwrap()));
        assert_eq!(sim.pool_counts(0).unwrap().assigned, 58);
        // Switching sources is not a rollover
        let events = sim.drain_events();
        assert!(!events.contains(&SimEvent::MinuteRollover));
        assert!(!events.contains(&SimEvent::DayRollover));

        tick(&mut sim);
        assert_eq!(sim.time(), Some(ClockTime::new(23, 59, 59).unwrap()));
        tick(&mut sim);
        assert_eq!(sim.time(), Some(ClockTime::MIDNIGHT));
        assert!(sim.drain_events().contains(&SimEvent::DayRollover));
        assert_eq!(sim.pool_counts(0).unwrap().assigned, 0);
    }

    #[test]
    fn test_advance_fixed_timestep() {
        let config = seconds_config(60, IdleBehavior::Hidden, orbit());
        let dt = config.dt;
        let max = config.max_substeps;
        let mut sim = Simulator::new(config, at(0, 0, 0)).unwrap();
        assert_eq!(sim.advance(dt * 3.5, &TickInput::default()), 3);
        // A long stall is capped instead of spiralling
        assert!(sim.advance(10.0, &TickInput::default()) <= max);
        assert_eq!(sim.update_clock(2.5), 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = SimConfig::default();
        config.pools.clear();
        assert!(matches!(
            Simulator::new(config, at(0, 0, 0)),
            Err(SimError::InvalidConfig(_))
        ));
    }
}
