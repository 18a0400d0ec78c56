use realfft::num_complex::Complex32;
use realfft::{RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const A4_FREQUENCY_HZ: f64 = 440.0;
pub const A4_MIDI: f64 = 69.0;

/// Result of analysing one captured block.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BlockAnalysis {
    pub frequency: Option<f64>,
    pub peak_magnitude: Option<f64>,
    /// RMS of the raw (zero-padded, unwindowed) block.
    pub rms: f32,
}

/// Dominant-frequency estimator for fixed-size blocks: Hann window, real FFT,
/// argmax over the magnitude spectrum and parabolic peak refinement.
pub struct BlockAnalyzer {
    sample_rate: u32,
    block_size: usize,
    rms_threshold: f32,
    window: Vec<f32>,
    fft: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
    magnitudes: Vec<f64>,
}

impl BlockAnalyzer {
    pub fn new(sample_rate: u32, block_size: usize, rms_threshold: f32) -> Self {
        let block_size = block_size.max(2);
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(block_size);
        let spectrum = fft.make_output_vec();
        let scratch = fft.make_scratch_vec();
        let bins = spectrum.len();

        Self {
            sample_rate,
            block_size,
            rms_threshold,
            window: hann_window(block_size),
            fft,
            input: vec![0.0; block_size],
            spectrum,
            scratch,
            magnitudes: vec![0.0; bins],
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Short blocks are zero-padded, long ones truncated to the block size.
    pub fn analyze(&mut self, block: &[f32]) -> BlockAnalysis {
        let used = block.len().min(self.block_size);
        let mut sum_sq = 0.0f64;
        for sample in &block[..used] {
            sum_sq += (*sample as f64) * (*sample as f64);
        }
        let rms = (sum_sq / self.block_size as f64).sqrt() as f32;

        if !(rms >= self.rms_threshold) {
            return BlockAnalysis {
                frequency: None,
                peak_magnitude: None,
                rms,
            };
        }

        for (idx, slot) in self.input.iter_mut().enumerate() {
            let sample = if idx < used { block[idx] } else { 0.0 };
            *slot = sample * self.window[idx];
        }

        if let Err(err) =
            self.fft
                .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)
        {
            log::debug!("fft failed: {err}");
            return BlockAnalysis {
                frequency: None,
                peak_magnitude: None,
                rms,
            };
        }

        for (mag, bin) in self.magnitudes.iter_mut().zip(self.spectrum.iter()) {
            *mag = bin.norm() as f64;
        }
        self.magnitudes[0] = 0.0;

        let peak = argmax(&self.magnitudes);
        if peak == 0 {
            return BlockAnalysis {
                frequency: None,
                peak_magnitude: None,
                rms,
            };
        }

        let (refined, magnitude) = parabolic_interpolation(&self.magnitudes, peak);
        BlockAnalysis {
            frequency: Some(refined * self.sample_rate as f64 / self.block_size as f64),
            peak_magnitude: Some(magnitude),
            rms,
        }
    }
}

/// Symmetric Hann window (both end points are zero).
pub fn hann_window(len: usize) -> Vec<f32> {
    if len <= 1 {
        return vec![1.0; len];
    }
    let denom = (len - 1) as f64;
    (0..len)
        .map(|n| (0.5 - 0.5 * (2.0 * std::f64::consts::PI * n as f64 / denom).cos()) as f32)
        .collect()
}

/// Index of the first maximum; 0 for an empty slice.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (idx, value) in values.iter().enumerate() {
        if *value > values[best] {
            best = idx;
        }
    }
    best
}

/// Fractional peak position and height from the quadratic through the peak
/// bin and its neighbours. Edge bins and flat neighbourhoods are returned
/// unrefined.
pub fn parabolic_interpolation(magnitudes: &[f64], peak: usize) -> (f64, f64) {
    if peak == 0 || peak + 1 >= magnitudes.len() {
        return (peak as f64, magnitudes.get(peak).copied().unwrap_or(0.0));
    }
    let alpha = magnitudes[peak - 1];
    let beta = magnitudes[peak];
    let gamma = magnitudes[peak + 1];
    let denom = alpha - 2.0 * beta + gamma;
    if denom == 0.0 {
        return (peak as f64, beta);
    }
    let p = 0.5 * (alpha - gamma) / denom;
    (peak as f64 + p, beta - 0.25 * (alpha - gamma) * p)
}

pub fn frequency_to_midi(frequency: f64) -> Option<f64> {
    if !(frequency > 0.0) || !frequency.is_finite() {
        return None;
    }
    Some(A4_MIDI + 12.0 * (frequency / A4_FREQUENCY_HZ).log2())
}

/// Pitch-class name and octave of the nearest semitone (MIDI 60 is C4).
pub fn midi_to_note(midi: f64, note_names: &[String]) -> (String, i32) {
    let semitone = midi.round_ties_even() as i64;
    let name = note_names
        .get(semitone.rem_euclid(12) as usize)
        .cloned()
        .unwrap_or_default();
    (name, semitone.div_euclid(12) as i32 - 1)
}

/// The detector's latest reading, replaced as a whole after every block.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PitchEstimate {
    pub frequency: Option<f64>,
    /// Calibrated MIDI pitch.
    pub midi: Option<f64>,
    /// Name with octave, e.g. `A4`.
    pub note_name: Option<String>,
    pub octave: Option<i32>,
    pub rms: f32,
    pub peak_magnitude: Option<f64>,
    /// Seconds since the detector started.
    pub timestamp: f64,
}

impl PitchEstimate {
    pub fn from_analysis(
        analysis: &BlockAnalysis,
        midi_offset: f64,
        note_names: &[String],
        timestamp: f64,
    ) -> Self {
        let midi = analysis
            .frequency
            .and_then(frequency_to_midi)
            .map(|m| m + midi_offset);
        let (note_name, octave) = match midi {
            Some(m) => {
                let (name, octave) = midi_to_note(m, note_names);
                (Some(format!("{name}{octave}")), Some(octave))
            }
            None => (None, None),
        };

        Self {
            frequency: analysis.frequency,
            midi,
            note_name,
            octave,
            rms: analysis.rms,
            peak_magnitude: analysis.peak_magnitude,
            timestamp,
        }
    }

    /// Loud enough and pitched.
    pub fn is_voiced(&self, rms_threshold: f32) -> bool {
        self.rms >= rms_threshold && self.midi.is_some()
    }
}
