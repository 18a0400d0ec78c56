use std::thread;
use std::time::{Duration, Instant};

/// Fixed-rate frame loop timing. A frame that overruns by more than one
/// period resets the schedule instead of bursting to catch up.
#[derive(Debug)]
pub struct FramePacer {
    period: Duration,
    next_deadline: Option<Instant>,
}

impl FramePacer {
    pub fn new(fps: u32) -> Self {
        Self {
            period: Duration::from_secs_f64(1.0 / fps.max(1) as f64),
            next_deadline: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Time to sleep at `now` before the next frame is due, advancing the
    /// schedule by one period.
    pub fn schedule(&mut self, now: Instant) -> Duration {
        let deadline = match self.next_deadline {
            Some(deadline) if now <= deadline + self.period => deadline,
            _ => now,
        };
        self.next_deadline = Some(deadline + self.period);
        deadline.saturating_duration_since(now)
    }

    pub fn wait(&mut self) {
        let sleep_for = self.schedule(Instant::now());
        if !sleep_for.is_zero() {
            thread::sleep(sleep_for);
        }
    }
}
