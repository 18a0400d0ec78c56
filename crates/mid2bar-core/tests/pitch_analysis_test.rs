use approx::assert_abs_diff_eq;
use mid2bar_core::{
    frequency_to_midi, hann_window, midi_to_note, parabolic_interpolation, BlockAnalysis,
    BlockAnalyzer, PitchEstimate,
};
use mid2bar_ports::settings::DEFAULT_NOTE_NAMES;
use pretty_assertions::assert_eq;

fn names() -> Vec<String> {
    DEFAULT_NOTE_NAMES.iter().map(|s| s.to_string()).collect()
}

fn sine(frequency: f64, sample_rate: u32, len: usize, amplitude: f32) -> Vec<f32> {
    (0..len)
        .map(|n| {
            let t = n as f64 / sample_rate as f64;
            amplitude * (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
        })
        .collect()
}

#[test]
fn silence_has_no_frequency() {
    let mut analyzer = BlockAnalyzer::new(44_100, 4096, 0.02);
    let analysis = analyzer.analyze(&vec![0.0; 4096]);
    assert_eq!(analysis.frequency, None);
    assert_eq!(analysis.peak_magnitude, None);
    assert_eq!(analysis.rms, 0.0);
}

#[test]
fn quiet_block_is_gated_by_rms() {
    let mut analyzer = BlockAnalyzer::new(44_100, 4096, 0.02);
    let analysis = analyzer.analyze(&sine(440.0, 44_100, 4096, 0.01));
    assert!(analysis.rms < 0.02);
    assert_eq!(analysis.frequency, None);
}

#[test]
fn sine_is_detected_near_its_pitch() {
    let mut analyzer = BlockAnalyzer::new(44_100, 4096, 0.02);
    let analysis = analyzer.analyze(&sine(440.0, 44_100, 4096, 0.5));

    let frequency = analysis.frequency.expect("pitched block");
    let midi = frequency_to_midi(frequency).expect("positive frequency");
    assert_abs_diff_eq!(midi, 69.0, epsilon = 0.15);
    assert_abs_diff_eq!(analysis.rms, 0.5 / 2f32.sqrt(), epsilon = 0.01);
    assert!(analysis.peak_magnitude.unwrap_or_default() > 0.0);
}

#[test]
fn short_blocks_are_zero_padded() {
    let mut analyzer = BlockAnalyzer::new(44_100, 4096, 0.02);
    let full = analyzer.analyze(&sine(440.0, 44_100, 4096, 0.5));
    let half = analyzer.analyze(&sine(440.0, 44_100, 2048, 0.5));
    assert!(half.rms < full.rms);
    assert!(half.frequency.is_some());
}

#[test]
fn hann_window_is_symmetric_with_zero_ends() {
    let window = hann_window(5);
    let expected = [0.0, 0.5, 1.0, 0.5, 0.0];
    for (value, want) in window.iter().zip(expected) {
        assert_abs_diff_eq!(*value, want, epsilon = 1e-6);
    }
    assert_eq!(hann_window(1), vec![1.0]);
    assert!(hann_window(0).is_empty());
}

#[test]
fn parabolic_interpolation_refines_asymmetric_peaks() {
    assert_eq!(parabolic_interpolation(&[0.0, 1.0, 3.0, 1.0, 0.0], 2), (2.0, 3.0));

    let (position, height) = parabolic_interpolation(&[0.0, 2.0, 4.0, 3.0, 0.0], 2);
    assert_abs_diff_eq!(position, 2.0 + 1.0 / 6.0, epsilon = 1e-12);
    assert_abs_diff_eq!(height, 4.0 + 1.0 / 24.0, epsilon = 1e-12);

    // edge bins are not refined
    assert_eq!(parabolic_interpolation(&[5.0, 1.0], 0), (0.0, 5.0));
}

#[test]
fn note_names_follow_scientific_pitch() {
    let names = names();
    assert_eq!(midi_to_note(69.4, &names), ("A".to_string(), 4));
    assert_eq!(midi_to_note(60.0, &names), ("C".to_string(), 4));
    assert_eq!(midi_to_note(59.6, &names), ("C".to_string(), 4));
    assert_eq!(midi_to_note(11.0, &names), ("B".to_string(), -1));
    assert_eq!(frequency_to_midi(0.0), None);
    assert_abs_diff_eq!(frequency_to_midi(440.0).unwrap_or_default(), 69.0, epsilon = 1e-12);
}

#[test]
fn estimate_applies_the_calibration_offset() {
    let analysis = BlockAnalysis {
        frequency: Some(440.0),
        peak_magnitude: Some(10.0),
        rms: 0.3,
    };
    let estimate = PitchEstimate::from_analysis(&analysis, 0.2, &names(), 1.5);

    assert_abs_diff_eq!(estimate.midi.unwrap_or_default(), 69.2, epsilon = 1e-9);
    assert_eq!(estimate.note_name.as_deref(), Some("A4"));
    assert_eq!(estimate.octave, Some(4));
    assert_eq!(estimate.timestamp, 1.5);
    assert!(estimate.is_voiced(0.02));
    assert!(!estimate.is_voiced(0.5));
    assert!(!PitchEstimate::default().is_voiced(0.0));
}
