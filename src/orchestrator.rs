//! The composition root.
//!
//! A [`SceneOrchestrator`] owns one clock, one render surface (GPU surface plus
//! overlay), one camera with its controller, the scene, and the mixer, stage
//! and hook collections the render loop iterates. Construction order is fixed:
//! scene, camera, GPU surface, overlay, controller.

use std::{cell::RefCell, rc::Rc};

use winit::event::WindowEvent;

use crate::{
    camera::{Camera, CameraController, InputEvent, OrbitController, Projection},
    clock::Clock,
    context::{GpuSurface, HostSurface, OrchestratorConfig, OverlayLayer, RenderSurface, SurfaceLayer},
    data_structures::{
        animation::{AnimationClip, AnimationDriver, AnimationTarget, TargetRef},
        scene::{AxesHelper, Scene},
    },
    error::{Error, Result},
    flow::{Frame, FrameScheduler, LoopState, RenderLoop},
    render::{FrameHook, FrameInstrumentation, FrameStats, NoTimeStep, PostProcessStage, TimeStepSink},
    resources::{Asset, AssetLoader},
};

pub struct OrchestratorBuilder {
    host: Box<dyn HostSurface>,
    gpu: Box<dyn GpuSurface>,
    scheduler: Box<dyn FrameScheduler>,
    config: OrchestratorConfig,
    controller: Option<Box<dyn CameraController>>,
    time_step: Option<Box<dyn TimeStepSink>>,
    loader: Option<AssetLoader>,
}

impl OrchestratorBuilder {
    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn controller(mut self, controller: impl CameraController + 'static) -> Self {
        self.controller = Some(Box::new(controller));
        self
    }

    /// The ambient interpolation system stepped once per tick.
    pub fn time_step(mut self, time_step: impl TimeStepSink + 'static) -> Self {
        self.time_step = Some(Box::new(time_step));
        self
    }

    pub fn loader(mut self, loader: AssetLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn build(self) -> Result<SceneOrchestrator> {
        let Self {
            mut host,
            mut gpu,
            scheduler,
            config,
            controller,
            time_step,
            loader,
        } = self;

        let (width, height) = host.size();
        if width == 0 || height == 0 {
            return Err(Error::UninitializedSurface { width, height });
        }

        let scene = Scene::new();

        let projection = Projection::new(width, height, config.fovy, config.znear, config.zfar);
        let camera = Camera::new(config.camera_position, config.camera_target, projection);

        gpu.resize(width, height);
        host.append_layer(SurfaceLayer::Gpu);

        let overlay = OverlayLayer::new(width, height);
        host.append_layer(SurfaceLayer::Overlay);
        let surface = RenderSurface::new(gpu, overlay, width, height);

        let controller = controller.unwrap_or_else(|| Box::new(OrbitController::default()));

        log::info!("orchestrator ready at {}x{}", width, height);
        Ok(SceneOrchestrator {
            host,
            config,
            scene,
            camera,
            surface,
            controller,
            clock: Clock::new(),
            animations: AnimationDriver::new(),
            stages: Vec::new(),
            hooks: Vec::new(),
            time_step: time_step.unwrap_or_else(|| Box::new(NoTimeStep)),
            instrumentation: None,
            scheduler,
            render_loop: RenderLoop::new(),
            loader: loader.unwrap_or_default(),
        })
    }
}

pub struct SceneOrchestrator {
    host: Box<dyn HostSurface>,
    config: OrchestratorConfig,
    scene: Scene,
    camera: Camera,
    surface: RenderSurface,
    controller: Box<dyn CameraController>,
    clock: Clock,
    animations: AnimationDriver,
    stages: Vec<Box<dyn PostProcessStage>>,
    hooks: Vec<FrameHook>,
    time_step: Box<dyn TimeStepSink>,
    instrumentation: Option<Box<dyn FrameInstrumentation>>,
    scheduler: Box<dyn FrameScheduler>,
    render_loop: RenderLoop,
    loader: AssetLoader,
}

impl SceneOrchestrator {
    /// Start building an orchestrator on `host`. Nothing is created until
    /// [`OrchestratorBuilder::build`].
    pub fn builder(
        host: impl HostSurface + 'static,
        gpu: impl GpuSurface + 'static,
        scheduler: impl FrameScheduler + 'static,
    ) -> OrchestratorBuilder {
        OrchestratorBuilder {
            host: Box::new(host),
            gpu: Box::new(gpu),
            scheduler: Box::new(scheduler),
            config: OrchestratorConfig::default(),
            controller: None,
            time_step: None,
            loader: None,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Move or re-aim the camera. The projection is kept in sync with the
    /// surface by the orchestrator.
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn surface(&self) -> &RenderSurface {
        &self.surface
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn animations(&self) -> &AnimationDriver {
        &self.animations
    }

    pub fn state(&self) -> LoopState {
        self.render_loop.state()
    }

    pub fn render_loop(&self) -> &RenderLoop {
        &self.render_loop
    }

    pub fn add_debug_axes(&mut self, size: f32) {
        self.scene.add(Box::new(AxesHelper::new(size)));
    }

    /// Attach the default frame-rate counter. Calling it again is a no-op.
    pub fn attach_frame_instrumentation(&mut self) {
        let interval = self.config.stats_interval;
        self.attach_frame_instrumentation_with(FrameStats::new(interval));
    }

    /// Attach custom instrumentation unless some is already attached.
    pub fn attach_frame_instrumentation_with(&mut self, instrumentation: impl FrameInstrumentation + 'static) {
        if self.instrumentation.is_some() {
            return;
        }
        self.instrumentation = Some(Box::new(instrumentation));
        self.host.append_layer(SurfaceLayer::Instrumentation);
    }

    pub fn has_frame_instrumentation(&self) -> bool {
        self.instrumentation.is_some()
    }

    pub fn loader(&self) -> AssetLoader {
        self.loader.clone()
    }

    /// Load an asset bundle. The future does not borrow the orchestrator; the
    /// loop keeps ticking while it is pending.
    pub fn load_asset<P>(&self, url: &str, on_progress: P) -> impl Future<Output = Result<Asset>> + use<P>
    where
        P: FnMut(f32) + Send + 'static,
    {
        self.loader.load(url, on_progress)
    }

    /// Loop `name` from `clips` on `target`. Returns `false` without side
    /// effects when no clip has exactly that name.
    pub fn play_animation<T>(&mut self, target: Rc<RefCell<T>>, clips: &[AnimationClip], name: &str) -> bool
    where
        T: AnimationTarget + 'static,
    {
        let target: TargetRef = target;
        self.animations.play(target, clips, name)
    }

    /// Append a post-process stage. Stages run after the draw, in insertion order.
    pub fn add_post_process_stage(&mut self, stage: impl PostProcessStage + 'static) {
        self.stages.push(Box::new(stage));
    }

    pub fn post_process_stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Append a hook run once per frame after post-processing.
    pub fn add_frame_hook(&mut self, hook: impl FnMut() + 'static) {
        self.hooks.push(Box::new(hook));
    }

    pub fn frame_hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// Start the loop and run the first tick immediately. Repeated calls are
    /// ignored, so there is never more than one scheduling chain.
    pub fn run(&mut self) -> Result<()> {
        if self.render_loop.start() {
            self.tick()
        } else {
            Ok(())
        }
    }

    pub fn stop(&mut self) {
        self.render_loop.stop();
    }

    /// Execute one frame. The host calls this whenever a requested frame is due.
    pub fn tick(&mut self) -> Result<()> {
        let frame = Frame {
            surface: &mut self.surface,
            scene: &self.scene,
            camera: &self.camera,
            scheduler: self.scheduler.as_ref(),
            clock: &mut self.clock,
            animations: &mut self.animations,
            stages: &mut self.stages,
            hooks: &mut self.hooks,
            time_step: self.time_step.as_mut(),
            instrumentation: self.instrumentation.as_deref_mut(),
        };
        self.render_loop.tick(frame)
    }

    /// Resize GPU surface and overlay together and follow with the camera aspect.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::warn!("ignoring resize to {}x{}", width, height);
            return;
        }
        self.surface.resize(width, height);
        self.camera.projection.resize(width, height);
    }

    /// Feed overlay input to the camera controller.
    pub fn handle_input(&mut self, event: &InputEvent) -> bool {
        self.controller.handle_input(&mut self.camera, event)
    }

    /// Capture a window event on the overlay and forward it to the controller.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match self.surface.overlay().capture(event) {
            Some(input) => self.handle_input(&input),
            None => false,
        }
    }
}
