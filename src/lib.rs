//! stage-ngin
//!
//! A real-time 3D scene orchestration layer. It owns a render surface (GPU
//! surface plus input-capturing overlay), a camera and its controller, a scene
//! root, and a render loop that advances animation mixers, post-processing
//! stages, caller hooks, tweening and frame instrumentation in a fixed order
//! every frame. Rasterization, asset formats and gesture math stay behind
//! small traits.
//!
//! High-level modules
//! - `camera`: perspective camera, overlay input events and the controller seam
//! - `clock`: consuming monotonic delta clock
//! - `context`: host surface binding, GPU/overlay surface pairing and configuration
//! - `data_structures`: scene container, clips, mixers and the animation driver
//! - `error`: error taxonomy
//! - `flow`: the render loop state machine and the winit event loop driver
//! - `gpu`: wgpu implementation of the GPU surface
//! - `orchestrator`: the composition root tying everything together
//! - `pipelines`: render pipelines owned by the GPU surface (debug lines)
//! - `render`: post-process stages, frame hooks, time step sinks, instrumentation
//! - `resources`: asynchronous asset loading with progress reporting
//! - `tween`: the default tweening system
//!

pub mod camera;
pub mod clock;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod gpu;
pub mod orchestrator;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod tween;

pub use error::{Error, Result};
pub use orchestrator::SceneOrchestrator;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use winit::dpi::PhysicalSize;
pub use winit::event::WindowEvent;
