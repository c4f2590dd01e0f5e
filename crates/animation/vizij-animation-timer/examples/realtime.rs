//! Drive a timer from the wall clock at roughly 60 Hz.
//!
//! Run with `RUST_LOG=vizij_animation_timer=debug` to see session logging.

use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::Result;
use vizij_animation_timer::{AnimationTimer, FrameScheduler, SystemClock, TimerEvent};

fn main() -> Result<()> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let frames = Rc::new(FrameScheduler::new(SystemClock::new()));
    let timer = AnimationTimer::new(frames.clone());
    let started = Instant::now();

    let bounces = Rc::new(std::cell::Cell::new(0u32));
    let weak = timer.downgrade();
    let count = bounces.clone();
    timer
        .duration("200ms")?
        .on("tick", |event| {
            if let TimerEvent::Tick { progress, delta_ms } = event {
                let bar = "#".repeat((progress * 40.0).round() as usize);
                println!("{bar:<40} {progress:.3} (+{delta_ms:.1} ms)");
            }
        })
        .on("bounce", move |_| {
            count.set(count.get() + 1);
            if count.get() == 3 {
                if let Some(timer) = weak.upgrade() {
                    timer.stop();
                }
            }
        })
        .on("stop", move |event| {
            println!(
                "stopped at {:.1} ms (wall {:?})",
                event.timestamp().unwrap_or_default(),
                started.elapsed()
            );
        });

    timer.play();
    while timer.is_active() {
        std::thread::sleep(Duration::from_millis(16));
        frames.tick();
    }

    timer.bounce();
    while timer.is_active() {
        std::thread::sleep(Duration::from_millis(16));
        frames.tick();
    }
    println!("bounced {} times", bounces.get());
    Ok(())
}
