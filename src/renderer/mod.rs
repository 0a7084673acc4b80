//! Rendering boundary
//!
//! The simulator never draws. Each frame the host builds a [`Frame`] from
//! the simulator's views and hands it to a [`RenderSink`].

pub mod palette;
pub mod shapes;

#[cfg(target_arch = "wasm32")]
pub mod canvas;

#[cfg(target_arch = "wasm32")]
pub use canvas::CanvasSink;
pub use shapes::{Dot, DrawStyle, draw_list};

use crate::Bounds;
use crate::clock::ClockTime;
use crate::error::Result;
use crate::sim::{BodyBackend, ParticleView, Simulator, SparkView};

/// Everything a sink needs to draw one frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub bounds: Bounds,
    pub particles: Vec<ParticleView>,
    pub sparks: Vec<SparkView>,
    /// Time shown, if the clock has ticked yet
    pub time: Option<ClockTime>,
    pub control: f32,
}

impl Frame {
    pub fn capture<B: BodyBackend>(sim: &Simulator<B>) -> Self {
        Self {
            bounds: sim.bounds(),
            particles: sim.views(),
            sparks: sim.sparks(),
            time: sim.time(),
            control: sim.control(),
        }
    }
}

/// Consumer of rendered frames
pub trait RenderSink {
    fn render(&mut self, frame: &Frame) -> Result<()>;

    /// Called when the face is resized
    fn resize(&mut self, _bounds: Bounds) {}
}
