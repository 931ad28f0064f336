//! Profiling timers and the frame rate log.

use std::{
    fmt,
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

use itertools::Itertools;

/// Accumulates the time spent in one pipeline stage.
///
/// Formatting the timer with `{}` prints the average since it was last formatted and starts a new
/// measurement window.
pub struct Timer {
    name: &'static str,
    window: Mutex<Window>,
}

#[derive(Default)]
struct Window {
    spent: Duration,
    runs: u32,
}

impl Timer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            window: Mutex::default(),
        }
    }

    /// Runs `f` and records how long it took.
    pub fn time<T>(&self, f: impl FnOnce() -> T) -> T {
        let _guard = self.start();
        f()
    }

    /// Starts a measurement that ends when the returned guard is dropped.
    pub fn start(&self) -> TimerGuard<'_> {
        TimerGuard {
            timer: self,
            started: Instant::now(),
        }
    }

    fn record(&self, spent: Duration) {
        let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        window.spent += spent;
        window.runs += 1;
    }
}

impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Window { spent, runs } =
            std::mem::take(&mut *self.window.lock().unwrap_or_else(PoisonError::into_inner));
        let avg_ms = match runs {
            0 => 0.0,
            n => spent.as_secs_f32() * 1000.0 / n as f32,
        };
        write!(f, "{}: {runs}x{avg_ms:.01}ms", self.name)
    }
}

/// Returned by [`Timer::start`].
pub struct TimerGuard<'a> {
    timer: &'a Timer,
    started: Instant,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.timer.record(self.started.elapsed());
    }
}

/// Logs the frame rate of a loop once per second.
pub struct FpsCounter {
    name: &'static str,
    frames: u32,
    since: Instant,
}

impl FpsCounter {
    const INTERVAL: Duration = Duration::from_secs(1);

    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            frames: 0,
            since: Instant::now(),
        }
    }

    /// Counts a frame. Once a second, logs the frame rate followed by `timers`.
    ///
    /// `timers` is only formatted when a line is logged, which also resets [`Timer`]s.
    pub fn tick_with<I>(&mut self, timers: I)
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        if let Some(fps) = self.count_frame(Instant::now()) {
            log::debug!("{}: {fps} FPS ({})", self.name, timers.into_iter().join(", "));
        }
    }

    /// Returns the number of frames in the window that ended at `now`, if one did.
    fn count_frame(&mut self, now: Instant) -> Option<u32> {
        self.frames += 1;
        if now.duration_since(self.since) < Self::INTERVAL {
            return None;
        }
        let frames = std::mem::take(&mut self.frames);
        self.since = now;
        Some(frames)
    }
}
