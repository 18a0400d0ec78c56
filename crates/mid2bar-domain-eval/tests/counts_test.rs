use mid2bar_domain_eval::{MicNote, MicNoteType, PassedNoteCounts};
use mid2bar_domain_timeline::{Note, NoteEffect, NoteEffects, NoteType, PitchRange};
use pretty_assertions::assert_eq;

const RANGE: PitchRange = PitchRange { min: 55, max: 72 };

fn effects(list: &[NoteEffect]) -> NoteEffects {
    let mut out = NoteEffects::NONE;
    for e in list {
        out.insert(*e);
    }
    out
}

fn mic(end: f64, pitch: i32, kind: MicNoteType, fx: &[NoteEffect]) -> MicNote {
    MicNote {
        start: end - 0.5,
        end,
        pitch,
        pitch_org: pitch as f64,
        channel: 0,
        kind,
        effects: effects(fx),
    }
}

fn note(end: f64, pitch: u8, channel: u8, fx: &[NoteEffect]) -> Note {
    Note {
        id: 0,
        start: end - 0.5,
        end,
        pitch,
        octave: 4,
        name: String::new(),
        channel,
        kind: NoteType::Normal,
        effects: effects(fx),
    }
}

#[test]
fn only_finished_full_matches_are_counted() {
    let mics = vec![
        mic(1.0, 72, MicNoteType::MatchAll, &[NoteEffect::Up]),
        mic(2.0, 60, MicNoteType::MatchAll, &[NoteEffect::Long]),
        mic(2.5, 55, MicNoteType::Match, &[]),
        mic(9.0, 60, MicNoteType::MatchAll, &[]),
    ];
    let counts = PassedNoteCounts::from_mic_notes(&mics, RANGE, 3.0, 0.8);
    assert_eq!(
        counts,
        PassedNoteCounts {
            normal: 1,
            max: 1,
            min: 0,
            up: 1,
            down: 0,
            long: 1,
        }
    );
}

#[test]
fn auto_play_counts_notes_on_selected_channels_after_lag() {
    let notes = vec![
        note(1.0, 55, 0, &[NoteEffect::Down]),
        note(1.0, 60, 7, &[]),
        note(1.5, 64, 1, &[]),
        note(2.5, 64, 1, &[]),
    ];
    let counts = PassedNoteCounts::from_auto_play(&notes, RANGE, 2.7, 0.3, 0.8, &[0, 1, 2]);
    assert_eq!(counts.min, 1);
    assert_eq!(counts.normal, 1);
    assert_eq!(counts.down, 1);
}
