//! Animation phases and the fixed-rate frame scheduler

use std::f32::consts::TAU;
use std::time::{Duration, Instant};

pub const DEFAULT_ROTATION_PERIOD: Duration = Duration::from_secs(60);
pub const DEFAULT_PULSE_PERIOD: Duration = Duration::from_secs(3);
pub const DEFAULT_SHIMMER_PERIOD: Duration = Duration::from_secs(4);
pub const DEFAULT_FPS: u32 = 60;

/// Phase values for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Phases {
    /// Automatic globe rotation in radians, [0, TAU).
    pub rotation: f32,
    /// Shared pulse progress, [0, 1).
    pub pulse: f32,
    /// Atmosphere shimmer, [0, 1).
    pub shimmer: f32,
}

/// `(elapsed / period) mod 1`, kept strictly below 1.
fn cycle_fraction(elapsed: Duration, period: Duration) -> f32 {
    if period.is_zero() {
        return 0.0;
    }
    let frac = (elapsed.as_secs_f64() / period.as_secs_f64()).fract() as f32;
    if frac >= 1.0 { 0.0 } else { frac }
}

/// Effective pulse position of an arc with offset `arc_phase`.
#[inline]
pub fn pulse_fraction(pulse: f32, arc_phase: f32) -> f32 {
    let frac = (pulse + arc_phase).rem_euclid(1.0);
    if frac >= 1.0 { 0.0 } else { frac }
}

/// Three periodic counters derived from wall-clock time.
pub struct AnimationClock {
    started: Instant,
    rotation_period: Duration,
    pulse_period: Duration,
    shimmer_period: Duration,
    paused_at: Option<Instant>,
    paused_total: Duration,
}

impl AnimationClock {
    pub fn new(started: Instant, rotation_period: Duration, pulse_period: Duration) -> Self {
        Self {
            started,
            rotation_period,
            pulse_period,
            shimmer_period: DEFAULT_SHIMMER_PERIOD,
            paused_at: None,
            paused_total: Duration::ZERO,
        }
    }

    pub fn with_shimmer_period(mut self, period: Duration) -> Self {
        self.shimmer_period = period;
        self
    }

    /// Animated time at `now`, excluding paused spans.
    pub fn elapsed(&self, now: Instant) -> Duration {
        let until = self.paused_at.unwrap_or(now).max(self.started);
        until.duration_since(self.started).saturating_sub(self.paused_total)
    }

    pub fn phases_at(&self, now: Instant) -> Phases {
        let elapsed = self.elapsed(now);
        Phases {
            rotation: cycle_fraction(elapsed, self.rotation_period) * TAU,
            pulse: cycle_fraction(elapsed, self.pulse_period),
            shimmer: cycle_fraction(elapsed, self.shimmer_period),
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn toggle_pause(&mut self, now: Instant) {
        match self.paused_at.take() {
            Some(since) => self.paused_total += now.saturating_duration_since(since),
            None => self.paused_at = Some(now),
        }
    }
}

/// Fixed-rate tick source for the render loop.
///
/// Missed deadlines are skipped rather than replayed, so a slow frame never
/// causes a burst of catch-up frames.
pub struct FrameScheduler {
    interval: Duration,
    next_deadline: Instant,
    ticks: u64,
    running: bool,
}

impl FrameScheduler {
    pub fn start(fps: u32, now: Instant) -> Self {
        let interval = Duration::from_nanos(1_000_000_000 / fps.clamp(1, 240) as u64);
        tracing::debug!(fps, "frame scheduler started");
        Self {
            interval,
            next_deadline: now + interval,
            ticks: 0,
            running: true,
        }
    }

    #[cfg(test)]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[cfg(test)]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Time left before the next tick is due.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.next_deadline.saturating_duration_since(now)
    }

    /// Record a tick at `now` and schedule the next deadline.
    /// Returns false once the scheduler has been stopped.
    pub fn advance(&mut self, now: Instant) -> bool {
        if !self.running {
            return false;
        }
        self.ticks += 1;
        self.next_deadline += self.interval;
        if self.next_deadline <= now {
            let behind = now.duration_since(self.next_deadline);
            let skipped = (behind.as_nanos() / self.interval.as_nanos()) as u32 + 1;
            self.next_deadline += self.interval * skipped;
        }
        true
    }

    /// Sleep until the next deadline, then tick.
    pub fn wait_next(&mut self) -> bool {
        if !self.running {
            return false;
        }
        let wait = self.remaining(Instant::now());
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
        self.advance(Instant::now())
    }

    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            tracing::debug!(ticks = self.ticks, "frame scheduler stopped");
        }
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
