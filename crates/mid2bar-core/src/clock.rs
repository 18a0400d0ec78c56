use mid2bar_ports::types::Seconds;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ClockState {
    Stopped,
    Playing,
    Paused,
    Finished,
}

/// Song position driven by elapsed wall time, scaled by the playback time
/// scale and clamped to the song duration.
#[derive(Clone, Debug)]
pub struct PlaybackClock {
    state: ClockState,
    position: Seconds,
    duration: Seconds,
    time_scale: f64,
}

impl PlaybackClock {
    pub fn new(duration: Seconds, time_scale: f64) -> Self {
        Self {
            state: ClockState::Stopped,
            position: 0.0,
            duration: duration.max(0.0),
            time_scale: if time_scale > 0.0 { time_scale } else { 1.0 },
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn now(&self) -> Seconds {
        self.position
    }

    pub fn duration(&self) -> Seconds {
        self.duration
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    pub fn is_playing(&self) -> bool {
        self.state == ClockState::Playing
    }

    pub fn is_finished(&self) -> bool {
        self.state == ClockState::Finished
    }

    /// 0..=1 through the song.
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 {
            (self.position / self.duration).min(1.0)
        } else {
            0.0
        }
    }

    pub fn play(&mut self) {
        self.position = 0.0;
        self.state = ClockState::Playing;
    }

    pub fn pause(&mut self) {
        if self.state == ClockState::Playing {
            self.state = ClockState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if matches!(self.state, ClockState::Paused | ClockState::Stopped) {
            self.state = ClockState::Playing;
        }
    }

    pub fn restart(&mut self) {
        self.play();
    }

    /// Moves to `seconds` (clamped) keeping the play/pause state. Seeking a
    /// finished song leaves it paused at the new position.
    pub fn seek_to(&mut self, seconds: Seconds) {
        let target = if seconds.is_finite() { seconds } else { 0.0 };
        self.position = target.clamp(0.0, self.duration);
        if self.state == ClockState::Finished {
            self.state = ClockState::Paused;
        }
    }

    pub fn seek_ratio(&mut self, ratio: f64) {
        let ratio = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 };
        self.seek_to(ratio * self.duration);
    }

    /// Advances by `elapsed` wall seconds. Returns true on the call that
    /// reaches the end of the song.
    pub fn advance(&mut self, elapsed: Seconds) -> bool {
        if self.state != ClockState::Playing || !(elapsed > 0.0) || !elapsed.is_finite() {
            return false;
        }
        self.position += elapsed * self.time_scale;
        if self.position >= self.duration {
            self.position = self.duration;
            self.state = ClockState::Finished;
            return true;
        }
        false
    }
}
