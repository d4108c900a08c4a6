#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use stage_ngin::{
    SceneOrchestrator,
    camera::Camera,
    cgmath::Vector3,
    context::{GpuSurface, HostSurface, SurfaceLayer},
    data_structures::{
        animation::{AnimationClip, AnimationTarget, Channel, Sample},
        scene::Scene,
    },
    flow::FrameScheduler,
    render::{FrameInstrumentation, TimeStepSink},
    resources::animation::Keyframes,
};

/// Shared, ordered record of everything the fakes observed.
#[derive(Clone, Default)]
pub(crate) struct EventLog(Rc<RefCell<Vec<String>>>);

impl EventLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.borrow().iter().filter(|e| *e == entry).count()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

pub(crate) struct RecordingHost {
    pub size: (u32, u32),
    pub layers: Rc<RefCell<Vec<SurfaceLayer>>>,
    pub log: EventLog,
}

impl HostSurface for RecordingHost {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn append_layer(&mut self, layer: SurfaceLayer) {
        self.log.push(format!("layer:{:?}", layer));
        self.layers.borrow_mut().push(layer);
    }
}

pub(crate) struct RecordingGpu {
    pub log: EventLog,
    pub size: Rc<Cell<(u32, u32)>>,
    pub fail_next: Rc<Cell<bool>>,
}

impl GpuSurface for RecordingGpu {
    fn resize(&mut self, width: u32, height: u32) {
        self.log.push(format!("gpu-resize:{}x{}", width, height));
        self.size.set((width, height));
    }

    fn render(&mut self, _: &Scene, _: &Camera) -> anyhow::Result<()> {
        self.log.push("draw");
        if self.fail_next.replace(false) {
            anyhow::bail!("device lost");
        }
        Ok(())
    }
}

pub(crate) struct CountingScheduler {
    pub log: EventLog,
    pub requests: Rc<Cell<u32>>,
}

impl FrameScheduler for CountingScheduler {
    fn request_frame(&self) {
        self.log.push("schedule");
        self.requests.set(self.requests.get() + 1);
    }
}

pub(crate) struct LoggingStep(pub EventLog);

impl TimeStepSink for LoggingStep {
    fn step(&mut self) {
        self.0.push("step");
    }
}

pub(crate) struct LoggingStats(pub EventLog);

impl FrameInstrumentation for LoggingStats {
    fn update(&mut self) {
        self.0.push("stats");
    }
}

/// Animation target that logs every applied sample.
pub(crate) struct LoggingTarget {
    pub log: EventLog,
    pub samples: Vec<(usize, Sample)>,
}

impl LoggingTarget {
    pub fn shared(log: EventLog) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            log,
            samples: Vec::new(),
        }))
    }
}

impl AnimationTarget for LoggingTarget {
    fn apply(&mut self, node: usize, sample: Sample, _: f32) {
        self.log.push("mixer");
        self.samples.push((node, sample));
    }
}

/// Everything a test needs to poke at an orchestrator from the outside.
pub(crate) struct Harness {
    pub log: EventLog,
    pub layers: Rc<RefCell<Vec<SurfaceLayer>>>,
    pub gpu_size: Rc<Cell<(u32, u32)>>,
    pub fail_next_draw: Rc<Cell<bool>>,
    pub requests: Rc<Cell<u32>>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            log: EventLog::default(),
            layers: Rc::new(RefCell::new(Vec::new())),
            gpu_size: Rc::new(Cell::new((0, 0))),
            fail_next_draw: Rc::new(Cell::new(false)),
            requests: Rc::new(Cell::new(0)),
        }
    }

    pub fn orchestrator(&self, width: u32, height: u32) -> stage_ngin::Result<SceneOrchestrator> {
        self.builder(width, height).build()
    }

    pub fn builder(&self, width: u32, height: u32) -> stage_ngin::orchestrator::OrchestratorBuilder {
        let host = RecordingHost {
            size: (width, height),
            layers: self.layers.clone(),
            log: self.log.clone(),
        };
        let gpu = RecordingGpu {
            log: self.log.clone(),
            size: self.gpu_size.clone(),
            fail_next: self.fail_next_draw.clone(),
        };
        let scheduler = CountingScheduler {
            log: self.log.clone(),
            requests: self.requests.clone(),
        };
        SceneOrchestrator::builder(host, gpu, scheduler)
    }
}

/// A one-second clip moving node 0 along +x.
pub(crate) fn clip(name: &str) -> AnimationClip {
    AnimationClip::new(
        name,
        vec![Channel::new(
            0,
            vec![0.0, 1.0],
            Keyframes::Translation(vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0)]),
        )],
    )
}
