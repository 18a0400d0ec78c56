use crate::pitch_log::PitchLog;
use mid2bar_domain_timeline::{Note, NoteEffects};
use mid2bar_ports::settings::PlayerSettings;
use mid2bar_ports::types::Seconds;
use serde::{Deserialize, Serialize};

/// A trailing sub-interval shorter than this share of the step is folded
/// into the one before it.
pub const REMAINDER_MERGE_FRACTION: f64 = 1.0;
const SPLIT_EPSILON: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MicNoteType {
    Match,
    MatchAll,
    Unmatch,
}

/// What the singer is believed to have produced over `[start, end]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MicNote {
    pub start: Seconds,
    pub end: Seconds,
    /// Quantized semitone.
    pub pitch: i32,
    /// Averaged estimate before quantization.
    pub pitch_org: f64,
    pub channel: u8,
    pub kind: MicNoteType,
    pub effects: NoteEffects,
}

impl MicNote {
    pub fn duration(&self) -> Seconds {
        (self.end - self.start).max(0.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AlignerConfig {
    pub channel: u8,
    pub delay: Seconds,
    pub margin: Seconds,
    pub connect_duration: Seconds,
    pub pitch_tolerance: f64,
}

impl AlignerConfig {
    pub fn from_settings(settings: &PlayerSettings, channel: u8) -> Self {
        Self {
            channel,
            delay: settings.mic_input_delay,
            margin: settings.mic_input_margin,
            connect_duration: settings.mic_input_note_connect_duration,
            pitch_tolerance: settings.mic_input_pitch_tolerance,
        }
    }
}

/// Cuts `[start, end]` into `step`-long intervals. A short trailing remainder
/// is merged into the previous interval; an empty range yields nothing.
pub fn split_range(start: Seconds, end: Seconds, step: Seconds) -> Vec<(Seconds, Seconds)> {
    if !(end > start) {
        return Vec::new();
    }
    if !(step > 0.0) {
        return vec![(start, end)];
    }

    let count = (((end - start) / step) - SPLIT_EPSILON).ceil().max(1.0) as usize;
    let mut edges: Vec<Seconds> = (0..count).map(|i| start + i as f64 * step).collect();
    edges.push(end);

    let n = edges.len();
    if n >= 3 && edges[n - 1] - edges[n - 2] < step * REMAINDER_MERGE_FRACTION - SPLIT_EPSILON {
        edges.remove(n - 2);
    }

    edges.windows(2).map(|w| (w[0], w[1])).collect()
}

/// `diff` wrapped into the pitch-class interval (-6, 6].
pub fn circular_pitch_diff(diff: f64) -> f64 {
    let r = diff.rem_euclid(12.0);
    if r > 6.0 {
        r - 12.0
    } else {
        r
    }
}

/// Snaps to `target` within `tolerance`, otherwise rounds to the nearest
/// semitone (ties to even).
pub fn quantize_pitch(input: f64, target: i32, tolerance: f64) -> i32 {
    if (input - target as f64).abs() <= tolerance {
        target
    } else {
        input.round_ties_even() as i32
    }
}

/// Turns the pitch log into [`MicNote`]s against the target channel's notes.
/// Repeated calls with a growing log only ever append notes or extend the
/// last one, and end up where a single call over the full log would.
#[derive(Clone, Debug)]
pub struct MicNoteAligner {
    config: AlignerConfig,
    mic_notes: Vec<MicNote>,
}

impl MicNoteAligner {
    pub fn new(config: AlignerConfig) -> Self {
        Self {
            config,
            mic_notes: Vec::new(),
        }
    }

    pub fn config(&self) -> AlignerConfig {
        self.config
    }

    pub fn set_channel(&mut self, channel: u8) {
        self.config.channel = channel;
        self.mic_notes.clear();
    }

    pub fn mic_notes(&self) -> &[MicNote] {
        &self.mic_notes
    }

    pub fn reset(&mut self) {
        self.mic_notes.clear();
    }

    /// Aligns every target note that has started by `now - delay`. Returns
    /// true when the mic notes changed.
    pub fn update(&mut self, now: Seconds, notes: &[Note], log: &PitchLog) -> bool {
        if log.is_empty() {
            return false;
        }
        let cutoff = now - self.config.delay;
        let channel = self.config.channel;
        let mut changed = false;

        for note in notes
            .iter()
            .filter(|n| n.channel == channel && n.start <= cutoff)
        {
            changed |= self.align_note(note, cutoff, log);
        }
        changed
    }

    /// Sub-intervals whose sample window can still receive samples are left
    /// for a later call.
    fn align_note(&mut self, note: &Note, cutoff: Seconds, log: &PitchLog) -> bool {
        let cfg = self.config;
        if let Some(last) = self.mic_notes.last() {
            if last.end >= note.end {
                return false;
            }
        }
        if log.window(note.start - cfg.margin, note.end + cfg.margin).is_empty() {
            return false;
        }

        let target = note.pitch as i32;
        let intervals = split_range(note.start, note.end, cfg.connect_duration);
        let last_idx = intervals.len().saturating_sub(1);
        let multi = intervals.len() > 1;
        let mut changed = false;

        let latest = log.last().map_or(f64::NEG_INFINITY, |s| s.time);

        for (j, &(sub_start, sub_end)) in intervals.iter().enumerate() {
            let window_end = sub_end + cfg.margin;
            if window_end > cutoff && window_end >= latest {
                break;
            }
            let samples = log.window(sub_start - cfg.margin, sub_end + cfg.margin);
            let input = if samples.is_empty() {
                None
            } else {
                let sum: f64 = samples
                    .iter()
                    .map(|s| circular_pitch_diff(s.pitch - target as f64))
                    .sum();
                Some(sum / samples.len() as f64 + target as f64)
            };
            let quantized = input.map(|p| quantize_pitch(p, target, cfg.pitch_tolerance));

            if let (Some(q), Some(last)) = (quantized, self.mic_notes.last_mut()) {
                if multi && j > 0 && last.pitch == q && last.end >= sub_start - SPLIT_EPSILON {
                    if sub_end > last.end {
                        last.end = sub_end;
                        changed = true;
                    }
                    let completes = j == last_idx && last.start == note.start && q == target;
                    if completes && last.kind != MicNoteType::MatchAll {
                        last.kind = MicNoteType::MatchAll;
                        last.effects = note.effects;
                        changed = true;
                    }
                    continue;
                }
            }

            let (Some(input), Some(q)) = (input, quantized) else {
                continue;
            };
            if input <= 0.0 {
                continue;
            }
            if self.mic_notes.last().map_or(false, |last| last.end > sub_start) {
                continue;
            }

            let (kind, effects) = if q != target {
                (MicNoteType::Unmatch, NoteEffects::NONE)
            } else if multi {
                (MicNoteType::Match, NoteEffects::NONE)
            } else {
                (MicNoteType::MatchAll, note.effects)
            };
            self.mic_notes.push(MicNote {
                start: sub_start,
                end: sub_end,
                pitch: q,
                pitch_org: input,
                channel: cfg.channel,
                kind,
                effects,
            });
            changed = true;
        }
        changed
    }
}
