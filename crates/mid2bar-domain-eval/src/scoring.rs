use crate::aligner::MicNote;
use mid2bar_domain_timeline::{Note, Page};
use mid2bar_ports::settings::PlayerSettings;
use mid2bar_ports::types::Seconds;
use serde::{Deserialize, Serialize};

/// Pitch error (semitones) at which a mic note earns no accuracy credit.
pub const ACCURACY_ZERO_DIFF: f64 = 6.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoteScore {
    pub note_id: u32,
    pub duration: Seconds,
    pub match_ratio: f64,
    pub pitch_accuracy: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageScore {
    pub number_of_notes: usize,
    pub start_time: Seconds,
    pub end_time: Seconds,
    pub duration: Seconds,
    /// 0..=100
    pub pitch_match: f64,
    /// 0..=100
    pub pitch_accuracy: f64,
    pub weighted_score: f64,
    pub notes: Vec<NoteScore>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoringConfig {
    pub channel: u8,
    pub match_ratio: f64,
    pub accuracy_ratio: f64,
}

impl ScoringConfig {
    pub fn from_settings(settings: &PlayerSettings, channel: u8) -> Self {
        Self {
            channel,
            match_ratio: settings.pitch_match_score_ratio,
            accuracy_ratio: settings.pitch_accuracy_score_ratio,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> ScoringConfig {
        self.config
    }

    pub fn set_channel(&mut self, channel: u8) {
        self.config.channel = channel;
    }

    /// Scores every page from scratch.
    pub fn score_pages(&self, pages: &[Page], mic_notes: &[MicNote]) -> Vec<PageScore> {
        pages
            .iter()
            .map(|page| self.score_page(page, mic_notes))
            .collect()
    }

    pub fn score_page(&self, page: &Page, mic_notes: &[MicNote]) -> PageScore {
        let page_mic: Vec<&MicNote> =
            mic_notes_in(page.start_time, page.end_time, mic_notes).collect();
        let notes: Vec<NoteScore> = page
            .notes
            .iter()
            .map(|pn| &pn.note)
            .filter(|n| n.channel == self.config.channel)
            .map(|n| score_note(n, &page_mic))
            .collect();

        let total_weight: f64 = notes.iter().map(|n| n.duration).sum();
        let (pitch_match, pitch_accuracy) = if total_weight > 0.0 {
            (
                notes.iter().map(|n| n.match_ratio * n.duration).sum::<f64>() / total_weight
                    * 100.0,
                notes.iter().map(|n| n.pitch_accuracy * n.duration).sum::<f64>() / total_weight
                    * 100.0,
            )
        } else {
            (0.0, 0.0)
        };

        PageScore {
            number_of_notes: notes.len(),
            start_time: page.start_time,
            end_time: page.end_time,
            duration: page.duration(),
            pitch_match,
            pitch_accuracy,
            weighted_score: self.config.match_ratio * pitch_match
                + self.config.accuracy_ratio * pitch_accuracy,
            notes,
        }
    }
}

/// Mic notes touching `[start, end]`.
pub fn mic_notes_in<'a>(
    start: Seconds,
    end: Seconds,
    mic_notes: &'a [MicNote],
) -> impl Iterator<Item = &'a MicNote> + 'a {
    mic_notes
        .iter()
        .filter(move |m| start <= m.end && m.start <= end)
}

pub fn score_note(note: &Note, mic_notes: &[&MicNote]) -> NoteScore {
    let duration = note.duration();
    let mut score = NoteScore {
        note_id: note.id,
        duration,
        match_ratio: 0.0,
        pitch_accuracy: 0.0,
    };
    if duration <= 0.0 {
        return score;
    }

    let mut total_overlap = 0.0;
    let mut equal_overlap = 0.0;
    let mut weighted_accuracy = 0.0;
    for mic in mic_notes {
        let overlap = (note.end.min(mic.end) - note.start.max(mic.start)).max(0.0);
        if overlap <= 0.0 {
            continue;
        }
        total_overlap += overlap;
        if mic.pitch == note.pitch as i32 {
            equal_overlap += overlap;
        }
        weighted_accuracy += mic_accuracy(mic) * overlap;
    }
    if total_overlap <= 0.0 {
        return score;
    }

    score.match_ratio = (equal_overlap / duration).clamp(0.0, 1.0);
    score.pitch_accuracy = (weighted_accuracy / total_overlap).clamp(0.0, 1.0);
    score
}

fn mic_accuracy(mic: &MicNote) -> f64 {
    let diff = (mic.pitch_org - mic.pitch as f64).abs();
    if diff >= ACCURACY_ZERO_DIFF {
        0.0
    } else {
        (ACCURACY_ZERO_DIFF - diff) / ACCURACY_ZERO_DIFF
    }
}

/// Headline scores at a point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    /// Mean over finished pages with notes.
    pub total: f64,
    /// The most recently finished page.
    pub page: f64,
    /// The page under the playhead.
    pub now: f64,
}

impl ScoreSummary {
    pub fn at(scores: &[PageScore], t: Seconds) -> Self {
        let finished: Vec<&PageScore> = scores
            .iter()
            .filter(|s| s.end_time < t && s.number_of_notes > 0)
            .collect();
        let total = if finished.is_empty() {
            0.0
        } else {
            finished.iter().map(|s| s.weighted_score).sum::<f64>() / finished.len() as f64
        };
        let page = finished.last().map_or(0.0, |s| s.weighted_score);
        let now = scores
            .iter()
            .filter(|s| s.start_time <= t && t < s.end_time)
            .last()
            .map_or(0.0, |s| s.weighted_score);

        Self { total, page, now }
    }
}
