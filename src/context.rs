//! Host surface binding, the paired GPU/overlay render surface and configuration.
//!
//! A host is a rectangular display region (a window, a canvas container).
//! The orchestrator layers two children onto it: the GPU drawing surface and
//! a transparent overlay at offset (0, 0) that captures pointer input. Both
//! always share the same pixel size.

use std::sync::Arc;

use cgmath::{Deg, Point3};
use instant::Duration;
use winit::{
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    window::Window,
};

use crate::{
    camera::{Camera, InputEvent, PointerButton},
    data_structures::scene::Scene,
};

/// Children the orchestrator appends to its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceLayer {
    Gpu,
    Overlay,
    Instrumentation,
}

pub trait HostSurface {
    /// Current size in device pixels.
    fn size(&self) -> (u32, u32);

    fn append_layer(&mut self, layer: SurfaceLayer);
}

/// The GPU drawing surface: renders the scene through the camera.
pub trait GpuSurface {
    fn resize(&mut self, width: u32, height: u32);

    fn render(&mut self, scene: &Scene, camera: &Camera) -> anyhow::Result<()>;
}

/// A winit window acting as host.
#[derive(Debug)]
pub struct WindowHost {
    window: Arc<Window>,
    layers: Vec<SurfaceLayer>,
}

impl WindowHost {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            layers: Vec::new(),
        }
    }

    pub fn layers(&self) -> &[SurfaceLayer] {
        &self.layers
    }
}

impl HostSurface for WindowHost {
    fn size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    fn append_layer(&mut self, layer: SurfaceLayer) {
        log::debug!("window {:?}: layer {:?} attached", self.window.id(), layer);
        self.layers.push(layer);
    }
}

/// Transparent layer above the GPU surface. Input is captured here so that
/// overlay content stays interactive.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLayer {
    width: u32,
    height: u32,
    offset: (i32, i32),
}

impl OverlayLayer {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            offset: (0, 0),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn offset(&self) -> (i32, i32) {
        self.offset
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Translate a window event into overlay input, relative to the overlay origin.
    pub fn capture(&self, event: &WindowEvent) -> Option<InputEvent> {
        let button = |button: &MouseButton| match button {
            MouseButton::Left => PointerButton::Primary,
            MouseButton::Right => PointerButton::Secondary,
            _ => PointerButton::Other,
        };
        match event {
            WindowEvent::CursorMoved { position, .. } => Some(InputEvent::PointerMoved {
                x: position.x - self.offset.0 as f64,
                y: position.y - self.offset.1 as f64,
            }),
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: b,
                ..
            } => Some(InputEvent::PointerDown(button(b))),
            WindowEvent::MouseInput {
                state: ElementState::Released,
                button: b,
                ..
            } => Some(InputEvent::PointerUp(button(b))),
            WindowEvent::MouseWheel { delta, .. } => Some(InputEvent::Wheel(match delta {
                MouseScrollDelta::LineDelta(_, y) => *y,
                // ~one line per 100 px
                MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
            })),
            _ => None,
        }
    }
}

/// GPU surface and overlay, always resized together.
pub struct RenderSurface {
    gpu: Box<dyn GpuSurface>,
    overlay: OverlayLayer,
    width: u32,
    height: u32,
}

impl RenderSurface {
    pub(crate) fn new(gpu: Box<dyn GpuSurface>, overlay: OverlayLayer, width: u32, height: u32) -> Self {
        Self {
            gpu,
            overlay,
            width,
            height,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn overlay(&self) -> &OverlayLayer {
        &self.overlay
    }

    pub(crate) fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.gpu.resize(width, height);
        self.overlay.resize(width, height);
    }

    pub(crate) fn draw(&mut self, scene: &Scene, camera: &Camera) -> anyhow::Result<()> {
        self.gpu.render(scene, camera)
    }
}

/// Construction-time settings. Defaults match a small product-viewer setup:
/// narrow 20° field of view, camera three units back on +z.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub fovy: Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
    pub camera_position: Point3<f32>,
    pub camera_target: Point3<f32>,
    pub clear_colour: wgpu::Color,
    /// Composite the GPU surface over the host background.
    pub transparent: bool,
    pub stats_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            fovy: Deg(20.0),
            znear: 0.1,
            zfar: 5.0 * 1000.0,
            camera_position: Point3::new(0.0, 0.0, 3.0),
            camera_target: Point3::new(0.0, 0.0, 0.0),
            clear_colour: wgpu::Color::TRANSPARENT,
            transparent: true,
            stats_interval: Duration::from_secs(1),
        }
    }
}
