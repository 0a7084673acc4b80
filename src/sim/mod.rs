//! Deterministic simulation module
//!
//! All particle logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by pool index, then particle index)
//! - No rendering or platform dependencies

pub mod body;
pub mod control;
pub mod forces;
pub mod glyph;
pub mod group;
pub mod layout;
pub mod pool;
pub mod stage;
pub mod state;
pub mod tick;

pub use body::{BodyBackend, BodyId, PointMassWorld};
pub use control::{ControlConfig, ControlVariable};
pub use forces::ForceConfig;
pub use group::{Group, GroupConfig};
pub use layout::{LayoutStyle, Orbit, Target};
pub use pool::{IdleBehavior, ParticleHandle, Pool, PoolCounts};
pub use stage::{Stage, StageMachine, StageThresholds, StageTransition};
pub use state::{Particle, ParticleState, ParticleView, Spark, SparkView};
pub use tick::{SimEvent, Simulator, TickInput};
