use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_abs_diff_eq;
use vizij_animation_timer::{
    AnimationTimer, Direction, FrameScheduler, FrameSource, ManualClock, TimerEvent, TimerMode,
    TimerStatus,
};

const FRAME_MS: f64 = 16.0;

type Frames = Rc<FrameScheduler<ManualClock>>;
type Log = Rc<RefCell<Vec<TimerEvent>>>;

fn setup(duration_ms: f64) -> (Frames, AnimationTimer, Log) {
    let frames = Rc::new(FrameScheduler::new(ManualClock::new()));
    let timer = AnimationTimer::new(frames.clone());
    timer.duration(duration_ms).expect("valid duration");

    let log: Log = Rc::new(RefCell::new(Vec::new()));
    for name in ["tick", "stop", "loop", "bounce"] {
        let log = log.clone();
        timer.on(name, move |event| log.borrow_mut().push(event.clone()));
    }
    (frames, timer, log)
}

fn ticks(log: &Log) -> Vec<f64> {
    log.borrow().iter().filter_map(TimerEvent::progress).collect()
}

fn names(log: &Log) -> Vec<String> {
    log.borrow().iter().map(|e| e.name().to_string()).collect()
}

fn count(log: &Log, name: &str) -> usize {
    log.borrow().iter().filter(|e| e.name() == name).count()
}

/// Run frames until the timer goes idle or `limit_ms` passes.
fn run_until_idle(frames: &Frames, timer: &AnimationTimer, limit_ms: f64) {
    while timer.is_active() && frames.now() < limit_ms {
        frames.advance(FRAME_MS);
    }
}

#[test]
fn play_ends_with_exact_one_then_single_stop() {
    let (frames, timer, log) = setup(200.0);
    timer.play();
    assert_eq!(timer.mode(), TimerMode::PlayOnce);

    run_until_idle(&frames, &timer, 10_000.0);

    let progress = ticks(&log);
    assert!(progress.len() >= 10, "expected many ticks, got {}", progress.len());
    assert!(progress.windows(2).all(|w| w[0] < w[1]), "ticks must increase");
    assert!(progress.iter().all(|p| (0.0..=1.0).contains(p)));
    assert_eq!(*progress.last().unwrap(), 1.0);

    let events = log.borrow();
    assert_eq!(count(&log, "stop"), 1);
    // Terminal tick precedes stop, and stop is the last event.
    assert_eq!(events[events.len() - 2].progress(), Some(1.0));
    let stop_at = events.last().and_then(TimerEvent::timestamp).unwrap();
    assert!(
        (200.0..200.0 + FRAME_MS).contains(&stop_at),
        "stop at {stop_at}"
    );
    assert_eq!(timer.mode(), TimerMode::Idle);
    assert!(frames.is_empty());
}

#[test]
fn play_tick_carries_frame_delta() {
    let (frames, timer, log) = setup(100.0);
    timer.play();
    frames.advance(10.0);
    frames.advance(25.0);

    let events = log.borrow();
    assert_eq!(
        events[0],
        TimerEvent::Tick {
            progress: 0.1,
            delta_ms: 10.0
        }
    );
    assert_eq!(
        events[1],
        TimerEvent::Tick {
            progress: 0.35,
            delta_ms: 25.0
        }
    );
}

#[test]
fn play_overshoot_is_clamped() {
    let (frames, timer, log) = setup(100.0);
    timer.play();
    frames.advance(90.0);
    frames.advance(90.0);

    assert_eq!(ticks(&log), vec![0.9, 1.0]);
    assert_eq!(count(&log, "stop"), 1);
    // Nothing further once stopped.
    frames.advance(90.0);
    assert_eq!(ticks(&log).len(), 2);
}

#[test]
fn reverse_decreases_to_zero() {
    let (frames, timer, log) = setup(200.0);
    timer.reverse();
    assert_eq!(timer.direction(), Direction::Backward);

    run_until_idle(&frames, &timer, 10_000.0);

    let progress = ticks(&log);
    assert!(progress.len() >= 10);
    assert!(progress.windows(2).all(|w| w[0] > w[1]), "ticks must decrease");
    assert!(progress[0] > 0.9);
    assert_eq!(*progress.last().unwrap(), 0.0);
    assert_eq!(count(&log, "stop"), 1);
}

#[test]
fn loop_stopped_at_440ms_emits_four_loops() {
    let (frames, timer, log) = setup(100.0);
    timer.loop_forward();

    while frames.now() < 440.0 {
        frames.advance(10.0);
    }
    timer.stop();

    assert_eq!(count(&log, "loop"), 4);
    assert_eq!(count(&log, "stop"), 1);
    assert_eq!(log.borrow().last().map(TimerEvent::name), Some("stop"));
}

#[test]
fn loop_count_matches_elapsed_cycles() {
    for duration in [50.0, 100.0, 130.0, 333.0] {
        let (frames, timer, log) = setup(duration);
        timer.loop_forward();
        let total = 2_000.0;
        while frames.now() < total {
            frames.advance(FRAME_MS);
        }
        let expected = (frames.now() / duration).floor() as i64;
        let loops = count(&log, "loop") as i64;
        assert!(
            (loops - expected).abs() <= 1,
            "duration {duration}: {loops} loops, expected about {expected}"
        );
        assert_eq!(count(&log, "stop"), 0, "loop never stops on its own");
    }
}

#[test]
fn loop_progress_resets_at_each_loop_event() {
    let (frames, timer, log) = setup(100.0);
    timer.loop_forward();
    for _ in 0..40 {
        frames.advance(FRAME_MS);
    }

    let events = log.borrow();
    let mut previous: Option<f64> = None;
    let mut after_loop = false;
    for event in events.iter() {
        match event {
            TimerEvent::Loop { .. } => after_loop = true,
            TimerEvent::Tick { progress, .. } => {
                if let Some(prev) = previous {
                    if after_loop {
                        assert!(*progress < prev, "wrap must restart near zero");
                        assert!(*progress < 0.2);
                    } else {
                        assert!(*progress > prev, "progress must grow within a cycle");
                    }
                }
                previous = Some(*progress);
                after_loop = false;
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}

#[test]
fn loop_reverse_runs_backward_each_cycle() {
    let (frames, timer, log) = setup(100.0);
    timer.loop_reverse();
    assert_eq!(timer.mode(), TimerMode::Loop);
    assert_eq!(timer.direction(), Direction::Backward);

    for _ in 0..20 {
        frames.advance(FRAME_MS);
    }

    let events = log.borrow();
    let mut previous: Option<f64> = None;
    let mut after_loop = false;
    for event in events.iter() {
        match event {
            TimerEvent::Loop { .. } => after_loop = true,
            TimerEvent::Tick { progress, .. } => {
                if let Some(prev) = previous {
                    if after_loop {
                        assert!(*progress > prev);
                    } else {
                        assert!(*progress < prev);
                    }
                }
                previous = Some(*progress);
                after_loop = false;
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert_eq!(count(&log, "loop"), 3);
}

#[test]
fn bounce_alternates_direction_at_each_bounce() {
    let (frames, timer, log) = setup(100.0);
    timer.bounce();
    assert_eq!(timer.mode(), TimerMode::Bounce);

    let mut directions = vec![timer.direction()];
    let mut seen_bounces = 0;
    for _ in 0..60 {
        frames.advance(FRAME_MS);
        let bounces = count(&log, "bounce");
        if bounces != seen_bounces {
            assert_eq!(bounces, seen_bounces + 1, "one flip per wrap");
            seen_bounces = bounces;
            directions.push(timer.direction());
        }
    }
    assert!(seen_bounces >= 8);
    assert!(directions.windows(2).all(|w| w[0] != w[1]));

    // Within each segment between bounces progress moves monotonically in
    // that segment's direction.
    let events = log.borrow();
    let mut direction = Direction::Forward;
    let mut previous: Option<f64> = None;
    for event in events.iter() {
        match event {
            TimerEvent::Bounce { .. } => {
                direction = direction.flipped();
                previous = None;
            }
            TimerEvent::Tick { progress, .. } => {
                if let Some(prev) = previous {
                    match direction {
                        Direction::Forward => assert!(*progress > prev),
                        Direction::Backward => assert!(*progress < prev),
                    }
                }
                previous = Some(*progress);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}

#[test]
fn bounce_tick_after_flip_uses_new_direction() {
    let (frames, timer, log) = setup(100.0);
    timer.bounce();
    frames.advance(60.0);
    frames.advance(60.0);

    let events = log.borrow();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].progress(), Some(0.6));
    assert_eq!(events[1], TimerEvent::Bounce { at: 120.0 });
    let progress = events[2].progress().unwrap();
    assert!((progress - 0.8).abs() < 1e-9, "got {progress}");
}

#[test]
fn duration_change_applies_on_next_frame() {
    let (frames, timer, log) = setup(1000.0);
    timer.play();
    frames.advance(100.0);
    timer.duration("200ms").unwrap();
    frames.advance(16.0);

    let progress = ticks(&log);
    assert_eq!(progress[0], 0.1);
    assert!((progress[1] - 0.58).abs() < 1e-9);
}

#[test]
fn bounce_handler_sees_direction_of_finished_cycle() {
    let (frames, timer, log) = setup(100.0);
    let seen: Rc<RefCell<Vec<TimerStatus>>> = Rc::new(RefCell::new(Vec::new()));

    let weak = timer.downgrade();
    let record = log.clone();
    let statuses = seen.clone();
    timer.on("bounce", move |event| {
        record.borrow_mut().push(event.clone());
        if let Some(timer) = weak.upgrade() {
            assert_eq!(timer.direction(), timer.state().direction);
            statuses.borrow_mut().push(timer.state());
        }
    });

    timer.bounce();
    for _ in 0..4 {
        frames.advance(60.0);
    }

    let expected = |direction| TimerStatus {
        mode: TimerMode::Bounce,
        direction,
        paused: false,
    };
    assert_eq!(
        *seen.borrow(),
        vec![expected(Direction::Forward), expected(Direction::Backward)]
    );
    assert_eq!(timer.direction(), Direction::Forward);

    assert_eq!(
        names(&log),
        vec!["tick", "bounce", "tick", "tick", "bounce", "tick"]
    );
    let progress = ticks(&log);
    assert_abs_diff_eq!(progress[0], 0.6, epsilon = 1e-9);
    assert_abs_diff_eq!(progress[1], 0.8, epsilon = 1e-9);
    assert_abs_diff_eq!(progress[2], 0.2, epsilon = 1e-9);
    assert_abs_diff_eq!(progress[3], 0.4, epsilon = 1e-9);
    let at: Vec<f64> = log.borrow().iter().filter_map(TimerEvent::timestamp).collect();
    assert_eq!(at, vec![120.0, 240.0]);
}

#[test]
fn loop_handler_reads_state_then_restarts_with_play() {
    let (frames, timer, log) = setup(100.0);
    let seen: Rc<RefCell<Vec<TimerStatus>>> = Rc::new(RefCell::new(Vec::new()));

    let weak = timer.downgrade();
    let record = log.clone();
    let statuses = seen.clone();
    timer.on("loop", move |event| {
        record.borrow_mut().push(event.clone());
        if let Some(timer) = weak.upgrade() {
            statuses.borrow_mut().push(timer.state());
            timer.play();
        }
    });

    timer.loop_forward();
    frames.advance(60.0);
    frames.advance(60.0);
    assert_eq!(timer.mode(), TimerMode::PlayOnce);
    assert_eq!(frames.len(), 1, "looping subscription released");

    run_until_idle(&frames, &timer, 10_000.0);

    assert_eq!(
        *seen.borrow(),
        vec![TimerStatus {
            mode: TimerMode::Loop,
            direction: Direction::Forward,
            paused: false,
        }]
    );
    let mut expected = vec!["tick", "loop", "tick"];
    expected.extend(["tick"; 7]);
    expected.push("stop");
    assert_eq!(names(&log), expected);

    let progress = ticks(&log);
    assert_abs_diff_eq!(progress[0], 0.6, epsilon = 1e-9);
    // Trailing tick of the looping session, then the fresh run.
    assert_abs_diff_eq!(progress[1], 0.2, epsilon = 1e-9);
    assert_eq!(progress[2], 0.16);
    assert_eq!(*progress.last().unwrap(), 1.0);
}

#[test]
fn bounce_handler_restart_keeps_new_direction() {
    let (frames, timer, log) = setup(100.0);

    let weak = timer.downgrade();
    let record = log.clone();
    timer.on("bounce", move |event| {
        record.borrow_mut().push(event.clone());
        if let Some(timer) = weak.upgrade() {
            assert_eq!(timer.direction(), Direction::Forward);
            timer.reverse();
        }
    });

    timer.bounce();
    frames.advance(60.0);
    frames.advance(60.0);

    // The flip applies to the finished session only.
    assert_eq!(timer.mode(), TimerMode::PlayOnce);
    assert_eq!(timer.direction(), Direction::Backward);
    assert_eq!(names(&log), vec!["tick", "bounce", "tick"]);
    assert_abs_diff_eq!(ticks(&log)[1], 0.8, epsilon = 1e-9);

    frames.advance(16.0);
    assert_abs_diff_eq!(ticks(&log)[2], 0.84, epsilon = 1e-9);
    assert_eq!(count(&log, "bounce"), 1);
}
