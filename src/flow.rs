//! Render loop and application event loop.
//!
//! [`RenderLoop`] is a three-state machine (`Idle -> Running -> Stopped`).
//! While running, every tick executes this fixed sequence:
//!
//! 1. Sample the frame delta from the loop's own clock (post-processing only)
//! 2. Draw the scene through the camera onto the GPU surface
//! 3. Request the next frame from the host scheduler
//! 4. Sample the orchestrator clock and advance every animation mixer
//! 5. Run post-process stages in registration order with the frame delta
//! 6. Run frame hooks in registration order
//! 7. Step the ambient time step sink (tweening) once
//! 8. Update frame instrumentation, if attached
//!
//! The two clocks of steps 1 and 4 are independent. Stages see
//! the draw cadence, mixers see the orchestrator clock.
//!
//! Because step 3 happens before the rest of the frame's work, a failing step
//! ends only the current tick. The error is logged and returned; the next tick
//! is already on its way.
//!
//! [`run`] drives a [`SceneOrchestrator`] from a winit event loop, where the
//! frame scheduler is `Window::request_redraw` and a tick runs on every
//! `RedrawRequested`.

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::{Window, WindowId},
};

use crate::{
    camera::Camera,
    clock::Clock,
    context::{OrchestratorConfig, RenderSurface, WindowHost},
    data_structures::{animation::AnimationDriver, scene::Scene},
    error::{Error, Result},
    gpu::WgpuSurface,
    orchestrator::SceneOrchestrator,
    render::{FrameHook, FrameInstrumentation, PostProcessStage, TimeStepSink},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

/// The host's "next visual frame" primitive.
pub trait FrameScheduler {
    fn request_frame(&self);
}

impl FrameScheduler for Arc<Window> {
    fn request_frame(&self) {
        self.request_redraw();
    }
}

/// Everything one tick touches, borrowed from the orchestrator.
pub struct Frame<'a> {
    pub surface: &'a mut RenderSurface,
    pub scene: &'a Scene,
    pub camera: &'a Camera,
    pub scheduler: &'a dyn FrameScheduler,
    pub clock: &'a mut Clock,
    pub animations: &'a mut AnimationDriver,
    pub stages: &'a mut [Box<dyn PostProcessStage>],
    pub hooks: &'a mut [FrameHook],
    pub time_step: &'a mut (dyn TimeStepSink + 'static),
    pub instrumentation: Option<&'a mut (dyn FrameInstrumentation + 'static)>,
}

#[derive(Debug)]
pub struct RenderLoop {
    state: LoopState,
    frame_clock: Clock,
    ticks: u64,
    failed_ticks: u64,
}

impl RenderLoop {
    pub fn new() -> Self {
        Self {
            state: LoopState::Idle,
            frame_clock: Clock::new(),
            ticks: 0,
            failed_ticks: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn failed_ticks(&self) -> u64 {
        self.failed_ticks
    }

    /// `Idle -> Running`. Returns `false` (and changes nothing) in any other state.
    pub fn start(&mut self) -> bool {
        match self.state {
            LoopState::Idle => {
                self.state = LoopState::Running;
                self.frame_clock = Clock::started();
                log::info!("render loop running");
                true
            }
            LoopState::Running => {
                log::warn!("render loop is already running, ignoring run()");
                false
            }
            LoopState::Stopped => {
                log::warn!("render loop was stopped, ignoring run()");
                false
            }
        }
    }

    /// Any state `-> Stopped`. Frames already requested from the host turn into no-ops.
    pub fn stop(&mut self) {
        if self.state != LoopState::Stopped {
            log::info!("render loop stopped after {} ticks", self.ticks);
        }
        self.state = LoopState::Stopped;
    }

    /// Run one tick. Does nothing unless running.
    pub fn tick(&mut self, frame: Frame<'_>) -> Result<()> {
        if self.state != LoopState::Running {
            return Ok(());
        }
        self.ticks += 1;

        let frame_delta = self.frame_clock.delta();
        let drawn = frame.surface.draw(frame.scene, frame.camera);
        frame.scheduler.request_frame();

        let result = drawn.and_then(|()| {
            let mixer_delta = frame.clock.delta();
            frame.animations.update(mixer_delta);
            for stage in frame.stages.iter_mut() {
                stage.render(frame_delta)?;
            }
            for hook in frame.hooks.iter_mut() {
                hook();
            }
            frame.time_step.step();
            if let Some(instrumentation) = frame.instrumentation {
                instrumentation.update();
            }
            Ok(())
        });

        result.map_err(|e| {
            self.failed_ticks += 1;
            log::error!("tick {} failed: {:#}", self.ticks, e);
            Error::Tick(e)
        })
    }
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new()
    }
}

/// Work finished off the loop thread, applied between ticks.
pub type Deferred = Box<dyn FnOnce(&mut SceneOrchestrator) + Send>;

pub(crate) enum LoopEvent {
    #[allow(dead_code)]
    SurfaceReady(WgpuSurface),
    Deferred(Deferred),
}

/// Runs futures (asset loads) and hands their results back to the loop.
#[derive(Clone)]
pub struct Spawner {
    proxy: EventLoopProxy<LoopEvent>,
    #[cfg(not(target_arch = "wasm32"))]
    handle: tokio::runtime::Handle,
}

impl Spawner {
    #[cfg(not(target_arch = "wasm32"))]
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = Deferred> + Send + 'static,
    {
        let proxy = self.proxy.clone();
        self.handle.spawn(async move {
            let deferred = future.await;
            if proxy.send_event(LoopEvent::Deferred(deferred)).is_err() {
                log::warn!("event loop closed before deferred work could be applied");
            }
        });
    }

    #[cfg(target_arch = "wasm32")]
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = Deferred> + 'static,
    {
        let proxy = self.proxy.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let deferred = future.await;
            if proxy.send_event(LoopEvent::Deferred(deferred)).is_err() {
                log::warn!("event loop closed before deferred work could be applied");
            }
        });
    }
}

struct App<F> {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<LoopEvent>,
    config: OrchestratorConfig,
    setup: Option<F>,
    window: Option<Arc<Window>>,
    orchestrator: Option<SceneOrchestrator>,
}

impl<F> App<F>
where
    F: FnOnce(&mut SceneOrchestrator, &Spawner) -> anyhow::Result<()>,
{
    fn spawner(&self) -> Spawner {
        Spawner {
            proxy: self.proxy.clone(),
            #[cfg(not(target_arch = "wasm32"))]
            handle: self.async_runtime.handle().clone(),
        }
    }

    fn start(&mut self, surface: WgpuSurface) -> anyhow::Result<()> {
        let window = self
            .window
            .clone()
            .ok_or_else(|| anyhow::anyhow!("surface is ready but no window exists"))?;
        let mut orchestrator = SceneOrchestrator::builder(
            WindowHost::new(window.clone()),
            surface,
            window,
        )
        .config(self.config.clone())
        .build()?;
        if let Some(setup) = self.setup.take() {
            setup(&mut orchestrator, &self.spawner())?;
        }
        // a failed first tick has already scheduled the next one
        let _ = orchestrator.run();
        self.orchestrator = Some(orchestrator);
        Ok(())
    }
}

impl<F> ApplicationHandler<LoopEvent> for App<F>
where
    F: FnOnce(&mut SceneOrchestrator, &Spawner) -> anyhow::Result<()>,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("stage-ngin");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("could not create a window: {}", e);
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window.clone());

        let config = self.config.clone();
        let init_future = async move { WgpuSurface::new(window, &config).await };

        #[cfg(not(target_arch = "wasm32"))]
        {
            let started = self
                .async_runtime
                .block_on(init_future)
                .map_err(anyhow::Error::from)
                .and_then(|surface| self.start(surface));
            if let Err(e) = started {
                log::error!("initialization failed: {:#}", e);
                event_loop.exit();
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match init_future.await {
                    Ok(surface) => {
                        if proxy.send_event(LoopEvent::SurfaceReady(surface)).is_err() {
                            log::error!("event loop closed during initialization");
                        }
                    }
                    Err(e) => log::error!("initialization failed: {}", e),
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: LoopEvent) {
        match event {
            LoopEvent::SurfaceReady(surface) => {
                if let Err(e) = self.start(surface) {
                    log::error!("initialization failed: {:#}", e);
                    event_loop.exit();
                }
            }
            LoopEvent::Deferred(deferred) => match self.orchestrator.as_mut() {
                Some(orchestrator) => deferred(orchestrator),
                None => log::warn!("deferred work arrived before initialization, dropping it"),
            },
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(orchestrator) = self.orchestrator.as_mut() else {
            return;
        };
        match event {
            WindowEvent::CloseRequested => {
                orchestrator.stop();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => orchestrator.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                // failures are logged by the loop and do not stop it
                let _ = orchestrator.tick();
            }
            event => {
                orchestrator.handle_window_event(&event);
            }
        }
    }
}

/// Open a window, build the orchestrator on it, hand it to `setup` and run the
/// loop until the window closes.
pub fn run<F>(config: OrchestratorConfig, setup: F) -> anyhow::Result<()>
where
    F: FnOnce(&mut SceneOrchestrator, &Spawner) -> anyhow::Result<()> + 'static,
{
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop: EventLoop<LoopEvent> = EventLoop::with_user_event().build()?;
    let mut app = App {
        #[cfg(not(target_arch = "wasm32"))]
        async_runtime: tokio::runtime::Runtime::new()?,
        proxy: event_loop.create_proxy(),
        config,
        setup: Some(setup),
        window: None,
        orchestrator: None,
    };
    event_loop.run_app(&mut app)?;
    Ok(())
}
