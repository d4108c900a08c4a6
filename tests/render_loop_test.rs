use std::{cell::RefCell, rc::Rc, thread, time::Duration};

use stage_ngin::{Error, flow::LoopState};

use crate::common::test_utils::{Harness, LoggingStats, LoggingStep, LoggingTarget, clip};

mod common;

#[test]
fn tick_runs_steps_in_fixed_order() {
    let harness = Harness::new();
    let mut orchestrator = harness
        .builder(320, 240)
        .time_step(LoggingStep(harness.log.clone()))
        .build()
        .unwrap();
    orchestrator.attach_frame_instrumentation_with(LoggingStats(harness.log.clone()));

    let target = LoggingTarget::shared(harness.log.clone());
    assert!(orchestrator.play_animation(target, &[clip("Walk")], "Walk"));
    for i in 0..2 {
        let log = harness.log.clone();
        orchestrator.add_post_process_stage(move |_: Duration| -> anyhow::Result<()> {
            log.push(format!("stage{}", i));
            Ok(())
        });
    }
    for i in 0..2 {
        let log = harness.log.clone();
        orchestrator.add_frame_hook(move || log.push(format!("hook{}", i)));
    }
    harness.log.clear();

    orchestrator.run().unwrap();

    assert_eq!(
        harness.log.entries(),
        vec![
            "draw", "schedule", "mixer", "stage0", "stage1", "hook0", "hook1", "step", "stats",
        ]
    );
}

#[test]
fn stages_and_hooks_run_in_registration_order() {
    const N: usize = 7;
    let harness = Harness::new();
    let mut orchestrator = harness.orchestrator(320, 240).unwrap();
    let stage_log = Rc::new(RefCell::new(Vec::new()));
    let hook_log = Rc::new(RefCell::new(Vec::new()));
    for i in 0..N {
        let stage_log = stage_log.clone();
        orchestrator.add_post_process_stage(move |_: Duration| -> anyhow::Result<()> {
            stage_log.borrow_mut().push(i);
            Ok(())
        });
        let hook_log = hook_log.clone();
        orchestrator.add_frame_hook(move || hook_log.borrow_mut().push(i));
    }
    assert_eq!(orchestrator.post_process_stage_count(), N);
    assert_eq!(orchestrator.frame_hook_count(), N);

    orchestrator.run().unwrap();
    let expected: Vec<usize> = (0..N).collect();
    assert_eq!(*stage_log.borrow(), expected);
    assert_eq!(*hook_log.borrow(), expected);

    orchestrator.tick().unwrap();
    let twice: Vec<usize> = (0..N).chain(0..N).collect();
    assert_eq!(*stage_log.borrow(), twice);
    assert_eq!(*hook_log.borrow(), twice);
}

#[test]
fn all_stages_see_the_same_frame_delta() {
    let harness = Harness::new();
    let mut orchestrator = harness.orchestrator(320, 240).unwrap();
    let deltas = Rc::new(RefCell::new(Vec::new()));
    for _ in 0..3 {
        let deltas = deltas.clone();
        orchestrator.add_post_process_stage(move |dt: Duration| -> anyhow::Result<()> {
            // stages taking time must not shift the delta of later stages
            thread::sleep(Duration::from_millis(2));
            deltas.borrow_mut().push(dt);
            Ok(())
        });
    }
    orchestrator.run().unwrap();
    thread::sleep(Duration::from_millis(10));
    deltas.borrow_mut().clear();
    orchestrator.tick().unwrap();

    let deltas = deltas.borrow();
    assert_eq!(deltas.len(), 3);
    assert!(deltas.iter().all(|dt| *dt == deltas[0]));
    assert!(deltas[0] >= Duration::from_millis(10));
}

#[test]
fn mixer_time_adds_up_to_wall_time() {
    const TICKS: u32 = 5;
    let harness = Harness::new();
    let mut orchestrator = harness.orchestrator(320, 240).unwrap();
    let target = LoggingTarget::shared(harness.log.clone());
    orchestrator.play_animation(target, &[clip("Idle")], "Idle");

    let started = std::time::Instant::now();
    orchestrator.run().unwrap();
    for _ in 0..TICKS {
        thread::sleep(Duration::from_millis(5));
        orchestrator.tick().unwrap();
    }
    let wall = started.elapsed().as_secs_f32();

    let mixer_time = orchestrator.animations().mixers()[0].time();
    assert!(mixer_time >= TICKS as f32 * 0.005 - 1e-4, "{}", mixer_time);
    assert!(mixer_time <= wall + 1e-4, "{} > {}", mixer_time, wall);
}

#[test]
fn run_is_idempotent() {
    let harness = Harness::new();
    let mut orchestrator = harness.orchestrator(320, 240).unwrap();
    assert_eq!(orchestrator.state(), LoopState::Idle);

    orchestrator.run().unwrap();
    orchestrator.run().unwrap();
    orchestrator.run().unwrap();

    assert_eq!(orchestrator.state(), LoopState::Running);
    assert_eq!(harness.requests.get(), 1);
    assert_eq!(harness.log.count("draw"), 1);
    assert_eq!(orchestrator.render_loop().ticks(), 1);
}

#[test]
fn ticks_before_run_and_after_stop_do_nothing() {
    let harness = Harness::new();
    let mut orchestrator = harness.orchestrator(320, 240).unwrap();
    let hooks = Rc::new(RefCell::new(0));
    let counter = hooks.clone();
    orchestrator.add_frame_hook(move || *counter.borrow_mut() += 1);

    orchestrator.tick().unwrap();
    assert_eq!(*hooks.borrow(), 0);
    assert_eq!(harness.requests.get(), 0);

    orchestrator.run().unwrap();
    orchestrator.tick().unwrap();
    assert_eq!(*hooks.borrow(), 2);

    orchestrator.stop();
    assert_eq!(orchestrator.state(), LoopState::Stopped);
    orchestrator.tick().unwrap();
    orchestrator.run().unwrap();
    assert_eq!(*hooks.borrow(), 2);
    assert_eq!(harness.requests.get(), 2);
    assert_eq!(orchestrator.state(), LoopState::Stopped);
}

#[test]
fn failing_stage_ends_the_tick_but_not_the_loop() {
    let harness = Harness::new();
    let mut orchestrator = harness.orchestrator(320, 240).unwrap();
    let fail = Rc::new(RefCell::new(true));
    let should_fail = fail.clone();
    orchestrator.add_post_process_stage(move |_: Duration| -> anyhow::Result<()> {
        if should_fail.replace(false) {
            anyhow::bail!("bloom pass exploded");
        }
        Ok(())
    });
    let hooks = Rc::new(RefCell::new(0));
    let counter = hooks.clone();
    orchestrator.add_frame_hook(move || *counter.borrow_mut() += 1);

    match orchestrator.run() {
        Err(Error::Tick(e)) => assert!(e.to_string().contains("bloom")),
        other => panic!("expected a tick failure, got {:?}", other),
    }
    // the next frame was requested before the stage failed
    assert_eq!(harness.requests.get(), 1);
    assert_eq!(*hooks.borrow(), 0);
    assert_eq!(orchestrator.state(), LoopState::Running);

    orchestrator.tick().unwrap();
    assert_eq!(harness.requests.get(), 2);
    assert_eq!(*hooks.borrow(), 1);
    assert_eq!(orchestrator.render_loop().failed_ticks(), 1);
}

#[test]
fn failing_draw_still_schedules_the_next_frame() {
    let harness = Harness::new();
    let mut orchestrator = harness.orchestrator(320, 240).unwrap();
    let hooks = Rc::new(RefCell::new(0));
    let counter = hooks.clone();
    orchestrator.add_frame_hook(move || *counter.borrow_mut() += 1);

    harness.fail_next_draw.set(true);
    assert!(matches!(orchestrator.run(), Err(Error::Tick(_))));
    assert_eq!(
        harness.log.entries()[3..],
        ["draw".to_string(), "schedule".to_string()]
    );
    assert_eq!(*hooks.borrow(), 0);

    orchestrator.tick().unwrap();
    assert_eq!(*hooks.borrow(), 1);
}
