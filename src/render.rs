//! Per-frame extension points run by the render loop after the primary draw.
//!
//! - [`PostProcessStage`] is an effect pass run with the draw-pass frame delta
//! - [`FrameHook`] is a caller callback without arguments
//! - [`TimeStepSink`] is the ambient interpolation system stepped once per frame
//! - [`FrameInstrumentation`] is an optional performance counter
//!

use instant::Duration;

use crate::clock::Clock;

/// A full-screen effect invoked once per frame, in registration order.
///
/// Stages are created and configured by the caller; the loop only calls
/// [`PostProcessStage::render`] with the time since the previous frame.
pub trait PostProcessStage {
    fn render(&mut self, delta: Duration) -> anyhow::Result<()>;
}

impl<F> PostProcessStage for F
where
    F: FnMut(Duration) -> anyhow::Result<()>,
{
    fn render(&mut self, delta: Duration) -> anyhow::Result<()> {
        self(delta)
    }
}

/// Caller-supplied per-frame callback.
pub type FrameHook = Box<dyn FnMut()>;

/// An interpolation system the loop advances by one global step per frame.
pub trait TimeStepSink {
    fn step(&mut self);
}

/// Time step sink for setups without tweening.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTimeStep;

impl TimeStepSink for NoTimeStep {
    fn step(&mut self) {}
}

pub trait FrameInstrumentation {
    /// Called once at the end of every frame.
    fn update(&mut self);
}

/// Frame-rate counter. Keeps its own clock so attaching it never changes the
/// deltas seen by animation or post-processing.
#[derive(Debug, Clone)]
pub struct FrameStats {
    clock: Clock,
    report_interval: Duration,
    frames: u32,
    accumulated: Duration,
    fps: f32,
    frame_ms: f32,
}

impl FrameStats {
    pub fn new(report_interval: Duration) -> Self {
        Self {
            clock: Clock::new(),
            report_interval,
            frames: 0,
            accumulated: Duration::ZERO,
            fps: 0.0,
            frame_ms: 0.0,
        }
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn frame_ms(&self) -> f32 {
        self.frame_ms
    }

    /// Count one frame that took `dt`.
    pub fn record(&mut self, dt: Duration) {
        self.frames += 1;
        self.accumulated += dt;
        if self.accumulated >= self.report_interval && !self.accumulated.is_zero() {
            let secs = self.accumulated.as_secs_f32();
            self.fps = self.frames as f32 / secs;
            self.frame_ms = secs * 1000.0 / self.frames as f32;
            log::info!("{:.1} fps ({:.2} ms/frame)", self.fps, self.frame_ms);
            self.frames = 0;
            self.accumulated = Duration::ZERO;
        }
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl FrameInstrumentation for FrameStats {
    fn update(&mut self) {
        let dt = self.clock.delta();
        self.record(dt);
    }
}
