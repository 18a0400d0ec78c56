use mid2bar_ports::types::Seconds;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PitchSample {
    pub time: Seconds,
    /// Fractional MIDI pitch.
    pub pitch: f64,
    pub octave: i32,
    pub name: String,
}

/// Append-only, strictly time-ordered record of detected pitches.
#[derive(Clone, Debug, Default)]
pub struct PitchLog {
    samples: Vec<PitchSample>,
}

impl PitchLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false (and drops the sample) unless it is strictly later than
    /// the last accepted one.
    pub fn push(&mut self, sample: PitchSample) -> bool {
        if !sample.time.is_finite() || !sample.pitch.is_finite() {
            return false;
        }
        if let Some(last) = self.samples.last() {
            if sample.time <= last.time {
                return false;
            }
        }
        self.samples.push(sample);
        true
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn samples(&self) -> &[PitchSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<&PitchSample> {
        self.samples.last()
    }

    /// Samples with `from <= time <= to`.
    pub fn window(&self, from: Seconds, to: Seconds) -> &[PitchSample] {
        let lo = self.samples.partition_point(|s| s.time < from);
        let hi = self.samples.partition_point(|s| s.time <= to);
        if lo >= hi {
            return &[];
        }
        &self.samples[lo..hi]
    }
}
