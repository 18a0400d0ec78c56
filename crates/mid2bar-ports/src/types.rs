use serde::{Deserialize, Serialize};
use std::fmt;

pub type Tick = i64; // MIDI ticks, monotonic in a track
pub type Seconds = f64; // playback timeline, 0 = song start

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub String);

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AudioInputDevice {
    pub id: DeviceId,
    pub name: String,
    pub default_config: AudioConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate_hz: u32,
    pub channels: u16,
    /// Frames delivered per capture callback. The port re-blocks device
    /// buffers so that every callback sees exactly this many mono frames.
    pub block_size_frames: u32,
}

/// Music volume on the 0..=100 scale used by the settings file. Decoded
/// values are clamped like [`Volume100::new`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "i32")]
pub struct Volume100(pub u8);

impl From<i32> for Volume100 {
    fn from(value: i32) -> Self {
        Self::new(value)
    }
}

impl Volume100 {
    pub fn new(value: i32) -> Self {
        Self(value.clamp(0, 100) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn step(self, delta: i32) -> Self {
        Self::new(self.0 as i32 + delta)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
