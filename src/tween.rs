//! Tweening: scalar interpolations stepped once per frame.
//!
//! [`TweenGroup`] is the [`TimeStepSink`] the render loop advances after the
//! frame hooks. Keep an `Rc<RefCell<TweenGroup>>` handle to add tweens while
//! the loop runs.
//!
//! ```ignore
//! let tweens = Rc::new(RefCell::new(TweenGroup::new()));
//! let orchestrator = SceneOrchestrator::builder(host, gpu, scheduler)
//!     .time_step(tweens.clone())
//!     .build()?;
//! tweens.borrow_mut().add(Tween::new(0.0, 1.0, Duration::from_millis(600)).ease(Ease::OutCubic));
//! ```

use std::{cell::RefCell, mem, rc::Rc};

use instant::Duration;

use crate::{clock::Clock, render::TimeStepSink};

/// How to map tween progress into a normalized [0,1] parameter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Ease {
    Linear,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
}

impl Ease {
    #[inline]
    pub fn sample(self, x: f32) -> f32 {
        let t = x.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::InQuad => t * t,
            Ease::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Ease::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) * 0.5
                }
            }
            Ease::InCubic => t * t * t,
            Ease::OutCubic => 1.0 - (1.0 - t).powi(3),
            Ease::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) * 0.5
                }
            }
        }
    }
}

pub struct Tween {
    from: f32,
    to: f32,
    duration: Duration,
    delay: Duration,
    ease: Ease,
    elapsed: Duration,
    on_update: Option<Box<dyn FnMut(f32)>>,
    on_complete: Option<Box<dyn FnOnce()>>,
}

impl Tween {
    pub fn new(from: f32, to: f32, duration: Duration) -> Self {
        Self {
            from,
            to,
            duration,
            delay: Duration::ZERO,
            ease: Ease::Linear,
            elapsed: Duration::ZERO,
            on_update: None,
            on_complete: None,
        }
    }

    pub fn ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn on_update(mut self, f: impl FnMut(f32) + 'static) -> Self {
        self.on_update = Some(Box::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl FnOnce() + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    pub fn value(&self) -> f32 {
        let active = self.elapsed.saturating_sub(self.delay);
        let progress = if self.duration.is_zero() {
            1.0
        } else {
            active.as_secs_f32() / self.duration.as_secs_f32()
        };
        self.from + (self.to - self.from) * self.ease.sample(progress)
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.delay + self.duration
    }

    /// Returns `false` once the tween has completed.
    fn advance(&mut self, dt: Duration) -> bool {
        self.elapsed += dt;
        if self.elapsed < self.delay {
            return true;
        }
        let value = self.value();
        if let Some(on_update) = self.on_update.as_mut() {
            on_update(value);
        }
        if self.is_finished() {
            if let Some(on_complete) = self.on_complete.take() {
                on_complete();
            }
            return false;
        }
        true
    }
}

/// All running tweens, advanced together by their own clock.
#[derive(Default)]
pub struct TweenGroup {
    clock: Clock,
    tweens: Vec<Tween>,
}

impl TweenGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, tween: Tween) {
        self.tweens.push(tween);
    }

    pub fn len(&self) -> usize {
        self.tweens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tweens.is_empty()
    }

    /// Advance by an explicit delta; finished tweens are dropped.
    pub fn advance(&mut self, dt: Duration) {
        self.tweens.retain_mut(|tween| tween.advance(dt));
    }

    /// Advance a shared group without holding its borrow while callbacks run,
    /// so `on_update` and `on_complete` may add tweens through the same handle.
    pub fn advance_shared(group: &Rc<RefCell<Self>>, dt: Duration) {
        let mut running = mem::take(&mut group.borrow_mut().tweens);
        running.retain_mut(|tween| tween.advance(dt));
        let mut group = group.borrow_mut();
        // tweens added by callbacks start on the next step
        running.append(&mut group.tweens);
        group.tweens = running;
    }
}

impl TimeStepSink for TweenGroup {
    fn step(&mut self) {
        let dt = self.clock.delta();
        self.advance(dt);
    }
}

impl TimeStepSink for Rc<RefCell<TweenGroup>> {
    fn step(&mut self) {
        let dt = self.borrow_mut().clock.delta();
        TweenGroup::advance_shared(self, dt);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn ease_endpoints() {
        for ease in [Ease::Linear, Ease::InQuad, Ease::OutQuad, Ease::InOutQuad, Ease::InCubic, Ease::OutCubic, Ease::InOutCubic] {
            assert_eq!(ease.sample(0.0), 0.0);
            assert!((ease.sample(1.0) - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn tween_reports_values_and_completes() {
        let last = Rc::new(Cell::new(f32::NAN));
        let done = Rc::new(Cell::new(false));
        let (l, d) = (last.clone(), done.clone());
        let mut group = TweenGroup::new();
        group.add(
            Tween::new(0.0, 10.0, Duration::from_millis(100))
                .on_update(move |v| l.set(v))
                .on_complete(move || d.set(true)),
        );
        group.advance(Duration::from_millis(50));
        assert!((last.get() - 5.0).abs() < 1e-4);
        assert!(!done.get());
        group.advance(Duration::from_millis(60));
        assert_eq!(last.get(), 10.0);
        assert!(done.get());
        assert!(group.is_empty());
    }

    #[test]
    fn delayed_tween_waits() {
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let mut group = TweenGroup::new();
        group.add(
            Tween::new(0.0, 1.0, Duration::from_millis(10))
                .delay(Duration::from_millis(20))
                .on_update(move |_| c.set(c.get() + 1)),
        );
        group.advance(Duration::from_millis(10));
        assert_eq!(calls.get(), 0);
        group.advance(Duration::from_millis(15));
        assert_eq!(calls.get(), 1);
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn callbacks_can_chain_through_the_shared_handle() {
        let tweens = Rc::new(RefCell::new(TweenGroup::new()));
        let chained = Rc::new(Cell::new(0.0));
        let (handle, value) = (tweens.clone(), chained.clone());
        tweens.borrow_mut().add(Tween::new(0.0, 1.0, Duration::ZERO).on_complete(move || {
            let value = value.clone();
            handle
                .borrow_mut()
                .add(Tween::new(10.0, 20.0, Duration::from_millis(100)).on_update(move |v| value.set(v)));
        }));

        // the first step completes the zero-length tween, which queues the next one
        let mut sink = tweens.clone();
        sink.step();
        assert_eq!(tweens.borrow().len(), 1);
        assert_eq!(chained.get(), 0.0);

        TweenGroup::advance_shared(&tweens, Duration::from_millis(50));
        assert!((chained.get() - 15.0).abs() < 1e-4);
        TweenGroup::advance_shared(&tweens, Duration::from_millis(60));
        assert_eq!(chained.get(), 20.0);
        assert!(tweens.borrow().is_empty());
    }

    #[test]
    fn update_callback_can_read_the_group() {
        let tweens = Rc::new(RefCell::new(TweenGroup::new()));
        let seen = Rc::new(Cell::new(usize::MAX));
        let (handle, len) = (tweens.clone(), seen.clone());
        tweens.borrow_mut().add(
            Tween::new(0.0, 1.0, Duration::from_millis(100)).on_update(move |_| len.set(handle.borrow().len())),
        );
        TweenGroup::advance_shared(&tweens, Duration::from_millis(10));
        // the running tween is detached while its callback runs
        assert_eq!(seen.get(), 0);
        assert_eq!(tweens.borrow().len(), 1);
    }
}
