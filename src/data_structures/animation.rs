//! Animation clips, mixers and the driver that advances them every frame.
//!
//! A mixer is bound to one target and owns the actions playing on it. The
//! [`AnimationDriver`] owns all mixers and advances them by a shared delta.
//! Bindings are never removed; they live as long as the driver.

use std::{
    cell::RefCell,
    ops::{Add, Mul},
    rc::Rc,
};

use cgmath::{InnerSpace, One, VectorSpace};
use instant::Duration;

use crate::resources::animation::Keyframes;

/// Local transform of a node: position, rotation and scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    /// Blend `sample` into this transform with the given weight.
    pub fn apply(&mut self, sample: Sample, weight: f32) {
        match sample {
            Sample::Translation(v) => self.position = self.position.lerp(v, weight),
            Sample::Rotation(q) => self.rotation = self.rotation.slerp(q, weight),
            Sample::Scale(v) => self.scale = self.scale.lerp(v, weight),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// One sampled property of one node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Sample {
    Translation(cgmath::Vector3<f32>),
    Rotation(cgmath::Quaternion<f32>),
    Scale(cgmath::Vector3<f32>),
}

/// How values between two keyframes are computed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    /// Lerp, slerp for rotations.
    #[default]
    Linear,
    /// Hold the previous keyframe until the next one.
    Step,
    /// Hermite spline. Keyframes are stored as `(in-tangent, value, out-tangent)` triples.
    CubicSpline,
}

impl Interpolation {
    fn stride(self) -> usize {
        match self {
            Interpolation::CubicSpline => 3,
            _ => 1,
        }
    }
}

/// Keyframes for one property of one node.
#[derive(Clone, Debug, PartialEq)]
pub struct Channel {
    pub node: usize,
    pub timestamps: Vec<f32>,
    pub keyframes: Keyframes,
    pub interpolation: Interpolation,
}

impl Channel {
    pub fn new(node: usize, timestamps: Vec<f32>, keyframes: Keyframes) -> Self {
        Self {
            node,
            timestamps,
            keyframes,
            interpolation: Interpolation::Linear,
        }
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Number of keyframes, not stored values.
    pub fn len(&self) -> usize {
        self.timestamps
            .len()
            .min(self.keyframes.len() / self.interpolation.stride())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample at `time`. Clamps outside the key range.
    pub fn sample(&self, time: f32) -> Option<Sample> {
        let last = self.len().checked_sub(1)?;
        let (i0, i1, f, dt) = if time <= self.timestamps[0] {
            (0, 0, 0.0, 0.0)
        } else if time >= self.timestamps[last] {
            (last, last, 0.0, 0.0)
        } else {
            let i1 = self.timestamps[..=last].partition_point(|&t| t <= time);
            let i0 = i1 - 1;
            let (t0, t1) = (self.timestamps[i0], self.timestamps[i1]);
            let dt = t1 - t0;
            let f = if dt > 0.0 { (time - t0) / dt } else { 0.0 };
            (i0, i1, f, dt)
        };
        let span = Span { i0, i1, f, dt };
        match &self.keyframes {
            Keyframes::Translation(v) => Some(Sample::Translation(
                span.interpolate(v, self.interpolation, |a, b, f| a.lerp(b, f)),
            )),
            Keyframes::Scale(v) => Some(Sample::Scale(
                span.interpolate(v, self.interpolation, |a, b, f| a.lerp(b, f)),
            )),
            Keyframes::Rotation(q) => Some(Sample::Rotation(
                span.interpolate(q, self.interpolation, |a, b, f| a.slerp(b, f))
                    .normalize(),
            )),
            Keyframes::Other => None,
        }
    }
}

/// Position of a sample time between two keyframes.
struct Span {
    i0: usize,
    i1: usize,
    /// Normalized position in `[0, 1]`.
    f: f32,
    /// Keyframe interval in seconds.
    dt: f32,
}

impl Span {
    fn interpolate<T>(&self, values: &[T], interpolation: Interpolation, linear: impl Fn(T, T, f32) -> T) -> T
    where
        T: Copy + Add<Output = T> + Mul<f32, Output = T>,
    {
        let Span { i0, i1, f, dt } = *self;
        match interpolation {
            Interpolation::Step => values[i0],
            Interpolation::Linear => linear(values[i0], values[i1], f),
            Interpolation::CubicSpline => {
                let (v0, out0) = (values[3 * i0 + 1], values[3 * i0 + 2]);
                let (in1, v1) = (values[3 * i1], values[3 * i1 + 1]);
                let (f2, f3) = (f * f, f * f * f);
                v0 * (2.0 * f3 - 3.0 * f2 + 1.0)
                    + out0 * ((f3 - 2.0 * f2 + f) * dt)
                    + v1 * (-2.0 * f3 + 3.0 * f2)
                    + in1 * ((f3 - f2) * dt)
            }
        }
    }
}

/// A named, pre-authored animation.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub channels: Vec<Channel>,
}

impl AnimationClip {
    /// The duration is the last keyframe time over all channels.
    pub fn new(name: impl Into<String>, channels: Vec<Channel>) -> Self {
        let duration = channels
            .iter()
            .filter_map(|channel| channel.timestamps.last().copied())
            .fold(0.0, f32::max);
        Self {
            name: name.into(),
            duration,
            channels,
        }
    }

    /// Exact, case-sensitive name lookup.
    pub fn find_by_name<'a>(clips: &'a [AnimationClip], name: &str) -> Option<&'a AnimationClip> {
        clips.iter().find(|clip| clip.name == name)
    }
}

/// Receives sampled values from a mixer.
pub trait AnimationTarget {
    fn apply(&mut self, node: usize, sample: Sample, weight: f32);
}

pub type TargetRef = Rc<RefCell<dyn AnimationTarget>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopMode {
    Once,
    Repeat,
}

/// A clip scheduled on a mixer.
#[derive(Clone, Debug)]
pub struct AnimationAction {
    clip: AnimationClip,
    pub time: f32,
    pub weight: f32,
    pub time_scale: f32,
    pub loop_mode: LoopMode,
    playing: bool,
}

impl AnimationAction {
    fn new(clip: AnimationClip) -> Self {
        Self {
            clip,
            time: 0.0,
            weight: 1.0,
            time_scale: 1.0,
            loop_mode: LoopMode::Repeat,
            playing: false,
        }
    }

    pub fn clip(&self) -> &AnimationClip {
        &self.clip
    }

    pub fn play(&mut self) -> &mut Self {
        self.playing = true;
        self
    }

    pub fn stop(&mut self) -> &mut Self {
        self.playing = false;
        self.time = 0.0;
        self
    }

    pub fn is_running(&self) -> bool {
        self.playing
    }

    fn advance(&mut self, dt: f32) {
        if !self.playing {
            return;
        }
        self.time += dt * self.time_scale;
        let duration = self.clip.duration;
        match self.loop_mode {
            LoopMode::Repeat if duration > 0.0 => self.time = self.time.rem_euclid(duration),
            LoopMode::Repeat => self.time = 0.0,
            LoopMode::Once if self.time >= duration => {
                self.time = duration;
                self.playing = false;
            }
            LoopMode::Once => (),
        }
    }
}

/// Advances actions and writes their samples into one target.
pub struct AnimationMixer {
    target: TargetRef,
    actions: Vec<AnimationAction>,
    time: f32,
}

impl AnimationMixer {
    pub fn new(target: TargetRef) -> Self {
        Self {
            target,
            actions: Vec::new(),
            time: 0.0,
        }
    }

    /// The action for `clip`, created on first request.
    pub fn clip_action(&mut self, clip: &AnimationClip) -> &mut AnimationAction {
        let idx = match self.actions.iter().position(|a| a.clip.name == clip.name) {
            Some(idx) => idx,
            None => {
                self.actions.push(AnimationAction::new(clip.clone()));
                self.actions.len() - 1
            }
        };
        &mut self.actions[idx]
    }

    pub fn actions(&self) -> &[AnimationAction] {
        &self.actions
    }

    /// Total time this mixer has been advanced by.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn update(&mut self, dt: f32) {
        self.time += dt;
        let mut target = self.target.borrow_mut();
        for action in self.actions.iter_mut() {
            let was_running = action.is_running();
            action.advance(dt);
            if !was_running {
                continue;
            }
            for channel in &action.clip.channels {
                if let Some(sample) = channel.sample(action.time) {
                    target.apply(channel.node, sample, action.weight);
                }
            }
        }
    }
}

/// Owns one mixer per `play` request and advances all of them each frame.
#[derive(Default)]
pub struct AnimationDriver {
    mixers: Vec<AnimationMixer>,
}

impl AnimationDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `name` on `target`, looping. Unknown names are a no-op and return
    /// `false`. Repeated calls for the same target add independent mixers.
    pub fn play(&mut self, target: TargetRef, clips: &[AnimationClip], name: &str) -> bool {
        let Some(clip) = AnimationClip::find_by_name(clips, name) else {
            log::debug!("animation `{}` not found among {} clips", name, clips.len());
            return false;
        };
        let mut mixer = AnimationMixer::new(target);
        mixer.clip_action(clip).play();
        self.mixers.push(mixer);
        log::debug!("playing animation `{}` ({} mixers)", name, self.mixers.len());
        true
    }

    pub fn update(&mut self, delta: Duration) {
        let dt = delta.as_secs_f32();
        self.mixers.iter_mut().for_each(|mixer| mixer.update(dt));
    }

    pub fn is_playing(&self, name: &str) -> bool {
        self.mixers
            .iter()
            .flat_map(|mixer| mixer.actions())
            .any(|action| action.clip.name == name && action.is_running())
    }

    pub fn mixers(&self) -> &[AnimationMixer] {
        &self.mixers
    }

    pub fn len(&self) -> usize {
        self.mixers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mixers.is_empty()
    }
}
