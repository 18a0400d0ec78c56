//! Tables produced by the external converters (MIDI-to-table, lyric timing).
//! The core consumes them as-is.

use crate::types::{Seconds, Tick};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoteRow {
    pub id: u32,
    pub start_seconds: Seconds,
    pub end_seconds: Seconds,
    pub octave: i32,
    pub note_name: String,
    pub pitch: u8,
    pub channel: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerRow {
    pub id: u32,
    pub tick: Tick,
    pub time_seconds: Seconds,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Seconds,
    pub end: Seconds,
}

/// `[start, end, x_from, x_to]`: the wipe edge moves from `x_from` to `x_to`
/// over `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WipeKeyframe(pub Seconds, pub Seconds, pub f64, pub f64);

impl WipeKeyframe {
    pub fn start(&self) -> Seconds {
        self.0
    }

    pub fn end(&self) -> Seconds {
        self.1
    }

    pub fn x_from(&self) -> f64 {
        self.2
    }

    pub fn x_to(&self) -> f64 {
        self.3
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LyricLayerRow {
    pub start: Seconds,
    pub end: Seconds,
    pub x: f64,
    pub y: f64,
    pub x_wipes: Vec<WipeKeyframe>,
    #[serde(default)]
    pub clip_up: f64,
    #[serde(default)]
    pub clip_bottom: f64,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LyricLineRow {
    #[serde(default)]
    pub fade_in: Option<TimeWindow>,
    #[serde(default)]
    pub fade_out: Option<TimeWindow>,
    pub background_main_lyric: LyricLayerRow,
    pub front_main_lyric: LyricLayerRow,
    pub background_ruby: LyricLayerRow,
    pub front_ruby: LyricLayerRow,
}
