use crate::model::{Note, NoteEffect, NoteType};
use mid2bar_ports::tables::NoteRow;
use mid2bar_ports::types::Seconds;
use serde::{Deserialize, Serialize};

/// Pitch range assumed when the track has no notes.
pub const FALLBACK_PITCH_RANGE: (u8, u8) = (60, 84);
/// Notes at or above this percentile of duration get the `long` effect.
pub const LONG_NOTE_PERCENTILE: f64 = 90.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchRange {
    pub min: u8,
    pub max: u8,
}

impl PitchRange {
    pub fn span(&self) -> i32 {
        self.max as i32 - self.min as i32
    }
}

/// Vertical pitch window of the bar area. The span is always odd, so the
/// bar lanes are symmetric around the centre line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayPitchRange {
    pub min: i32,
    pub max: i32,
}

impl DisplayPitchRange {
    pub fn from_pitch_range(range: PitchRange, minimum_span: i32) -> Self {
        let span = range.span();
        let (mut min, mut max) = (range.min as i32, range.max as i32);
        if span < minimum_span {
            let delta = (minimum_span - span).div_euclid(2) + 1;
            max += delta;
            min -= delta;
        }
        if (max - min).rem_euclid(2) != 1 {
            max += 1;
        }
        Self { min, max }
    }

    pub fn span(&self) -> i32 {
        self.max - self.min
    }

    /// Height of one bar for a bar area `area_height` pixels tall.
    pub fn bar_height(&self, area_height: f64) -> f64 {
        let lanes = (self.span() - 1).max(1) as f64;
        area_height / lanes * 2.0
    }
}

/// The authored notes with their derived type and effect tags.
#[derive(Clone, Debug)]
pub struct NoteTimeline {
    notes: Vec<Note>,
    pitch_range: PitchRange,
    display_range: DisplayPitchRange,
}

impl NoteTimeline {
    pub fn from_rows(rows: &[NoteRow], display_pitch_range_min: i32) -> Self {
        let notes = rows.iter().map(Note::from).collect();
        Self::from_notes(notes, display_pitch_range_min)
    }

    /// Orders notes by start time (stable) and derives `kind` and `effects`
    /// from the whole set.
    pub fn from_notes(mut notes: Vec<Note>, display_pitch_range_min: i32) -> Self {
        notes.sort_by(|a, b| a.start.total_cmp(&b.start));

        let pitch_range = match (
            notes.iter().map(|n| n.pitch).min(),
            notes.iter().map(|n| n.pitch).max(),
        ) {
            (Some(min), Some(max)) => PitchRange { min, max },
            _ => PitchRange {
                min: FALLBACK_PITCH_RANGE.0,
                max: FALLBACK_PITCH_RANGE.1,
            },
        };

        let durations: Vec<Seconds> = notes.iter().map(|n| n.end - n.start).collect();
        let long_note_threshold = percentile(&durations, LONG_NOTE_PERCENTILE);
        let half_span = pitch_range.span() as f64 / 2.0;

        for idx in 0..notes.len() {
            let pitch = notes[idx].pitch;
            notes[idx].kind = if pitch == pitch_range.max {
                NoteType::Max
            } else if pitch == pitch_range.min {
                NoteType::Min
            } else {
                NoteType::Normal
            };

            if pitch_range.span() > 0 {
                if let Some(next) = notes.get(idx + 1) {
                    let jump = next.pitch as f64 - pitch as f64;
                    if jump >= half_span {
                        notes[idx].effects.insert(NoteEffect::Up);
                    } else if jump <= -half_span {
                        notes[idx].effects.insert(NoteEffect::Down);
                    }
                }
            }

            if notes[idx].end - notes[idx].start >= long_note_threshold {
                notes[idx].effects.insert(NoteEffect::Long);
            }
        }

        let display_range =
            DisplayPitchRange::from_pitch_range(pitch_range, display_pitch_range_min);

        Self {
            notes,
            pitch_range,
            display_range,
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn pitch_range(&self) -> PitchRange {
        self.pitch_range
    }

    pub fn display_range(&self) -> DisplayPitchRange {
        self.display_range
    }

    /// End of the last note, 0 when empty.
    pub fn end_time(&self) -> Seconds {
        self.notes.iter().map(|n| n.end).fold(0.0, f64::max)
    }
}

/// Linear-interpolated percentile (`q` in 0..=100). Infinite for an empty
/// slice, so no note qualifies.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::INFINITY;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
