use crate::aligner::{MicNote, MicNoteType};
use mid2bar_domain_timeline::{Note, NoteEffect, NoteEffects, PitchRange};
use mid2bar_ports::types::Seconds;
use serde::{Deserialize, Serialize};

/// Tallies of notes that have scrolled past the playhead.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassedNoteCounts {
    pub normal: u32,
    pub max: u32,
    pub min: u32,
    pub up: u32,
    pub down: u32,
    pub long: u32,
}

impl PassedNoteCounts {
    /// Fully matched mic notes whose pass animation has finished by `t`.
    pub fn from_mic_notes(
        mic_notes: &[MicNote],
        range: PitchRange,
        t: Seconds,
        animation_time: Seconds,
    ) -> Self {
        let passed = mic_notes
            .iter()
            .filter(|m| m.kind == MicNoteType::MatchAll && m.end + animation_time <= t)
            .map(|m| (m.pitch, m.effects));
        Self::tally(passed, range)
    }

    /// Auto-played notes on `channels` whose pass animation has finished by
    /// `t`.
    pub fn from_auto_play(
        notes: &[Note],
        range: PitchRange,
        t: Seconds,
        lag_time: Seconds,
        animation_time: Seconds,
        channels: &[u8],
    ) -> Self {
        let passed = notes
            .iter()
            .filter(|n| n.end + lag_time + animation_time <= t && channels.contains(&n.channel))
            .map(|n| (n.pitch as i32, n.effects));
        Self::tally(passed, range)
    }

    fn tally(passed: impl Iterator<Item = (i32, NoteEffects)>, range: PitchRange) -> Self {
        let mut counts = Self::default();
        let mut total = 0u32;
        for (pitch, effects) in passed {
            total += 1;
            if pitch == range.max as i32 {
                counts.max += 1;
            }
            if pitch == range.min as i32 {
                counts.min += 1;
            }
            for effect in effects.iter() {
                match effect {
                    NoteEffect::Up => counts.up += 1,
                    NoteEffect::Down => counts.down += 1,
                    NoteEffect::Long => counts.long += 1,
                }
            }
        }
        counts.normal = total.saturating_sub(counts.max + counts.min);
        counts
    }
}
