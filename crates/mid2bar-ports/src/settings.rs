use serde::{Deserialize, Serialize};

pub const DEFAULT_NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum SettingsError {
    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Player options. JSON keys follow the settings file naming
/// (`PREVIEW_TIME`, `MIC_INPUT_DELAY`, ...). Missing keys take the defaults
/// below; keys that only concern rendering are ignored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct PlayerSettings {
    // frame loop / playback
    pub screen_fps: u32,
    pub playback_time_scale: f64,
    pub default_volume: i32,
    pub display_title_duration: f64,

    // bar area
    pub bar_area_top: f64,
    pub bar_area_width: f64,
    pub bar_area_height: f64,
    pub bar_area_left: f64,
    pub display_pitch_range_min: i32,
    pub hide_now_bar_when_no_notes: bool,
    pub bar_auto_play: bool,
    pub bar_auto_play_channels: Vec<u8>,
    pub bar_passed_count_animation_time: f64,

    // page timing
    pub preview_time: f64,
    pub remain_time: f64,
    pub fade_time: f64,
    pub lag_time: f64,

    // scoring
    pub pitch_match_score_ratio: f64,
    pub pitch_accuracy_score_ratio: f64,

    // pitch detection / mic alignment
    pub rms_threshold: f32,
    pub mic_input_delay: f64,
    pub mic_input_offset: f64,
    pub mic_input_pitch_tolerance: f64,
    pub mic_input_note_connect_duration: f64,
    pub mic_input_margin: f64,
    pub default_sample_rate: u32,
    pub default_block_size: u32,
    pub default_channels: u16,
    pub note_names: Vec<String>,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            screen_fps: 60,
            playback_time_scale: 1.0,
            default_volume: 80,
            display_title_duration: 2.0,
            bar_area_top: 50.0,
            bar_area_width: 1720.0,
            bar_area_height: 250.0,
            bar_area_left: 100.0,
            display_pitch_range_min: 23,
            hide_now_bar_when_no_notes: true,
            bar_auto_play: true,
            bar_auto_play_channels: vec![0, 1, 2],
            bar_passed_count_animation_time: 0.8,
            preview_time: 2.0,
            remain_time: 3.0,
            fade_time: 0.5,
            lag_time: 0.3,
            pitch_match_score_ratio: 0.3,
            pitch_accuracy_score_ratio: 0.7,
            rms_threshold: 0.02,
            mic_input_delay: 0.17,
            mic_input_offset: 0.2,
            mic_input_pitch_tolerance: 0.8,
            mic_input_note_connect_duration: 0.1,
            mic_input_margin: 0.01,
            default_sample_rate: 44_100,
            default_block_size: 4096,
            default_channels: 1,
            note_names: DEFAULT_NOTE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PlayerSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.screen_fps == 0 {
            return Err(invalid("SCREEN_FPS", "must be > 0"));
        }
        if !(self.playback_time_scale > 0.0) {
            return Err(invalid("PLAYBACK_TIME_SCALE", "must be > 0"));
        }
        if self.default_sample_rate == 0 {
            return Err(invalid("DEFAULT_SAMPLE_RATE", "must be > 0"));
        }
        if self.default_block_size < 4 {
            return Err(invalid("DEFAULT_BLOCK_SIZE", "must be >= 4"));
        }
        if self.default_channels == 0 {
            return Err(invalid("DEFAULT_CHANNELS", "must be > 0"));
        }
        if !(self.mic_input_note_connect_duration > 0.0) {
            return Err(invalid("MIC_INPUT_NOTE_CONNECT_DURATION", "must be > 0"));
        }
        if !(self.bar_area_width > 0.0) || !(self.bar_area_height > 0.0) {
            return Err(invalid("BAR_AREA_WIDTH/BAR_AREA_HEIGHT", "must be > 0"));
        }
        for (key, value) in [
            ("PREVIEW_TIME", self.preview_time),
            ("REMAIN_TIME", self.remain_time),
            ("FADE_TIME", self.fade_time),
            ("LAG_TIME", self.lag_time),
            ("MIC_INPUT_MARGIN", self.mic_input_margin),
            ("MIC_INPUT_PITCH_TOLERANCE", self.mic_input_pitch_tolerance),
        ] {
            if !(value >= 0.0) {
                return Err(invalid(key, "must be >= 0"));
            }
        }
        if self.note_names.len() != 12 {
            return Err(invalid(
                "NOTE_NAMES",
                format!("expected 12 names, got {}", self.note_names.len()),
            ));
        }
        Ok(())
    }

    /// `PITCH_MATCH_SCORE_RATIO + PITCH_ACCURACY_SCORE_RATIO`; the weighted
    /// score only reads as 0..=100 when this is 1.
    pub fn score_ratio_sum(&self) -> f64 {
        self.pitch_match_score_ratio + self.pitch_accuracy_score_ratio
    }
}

fn invalid(key: &'static str, reason: impl Into<String>) -> SettingsError {
    SettingsError::Invalid {
        key,
        reason: reason.into(),
    }
}
