mod common;

use common::SinePort;
use mid2bar_core::{AppError, ClockState, Command, Event, PlayerCore, PlayerInputs};
use mid2bar_domain_eval::MicNoteType;
use mid2bar_ports::backing::{BackingTrackError, BackingTrackPort, SilentBackingTrack};
use mid2bar_ports::settings::PlayerSettings;
use mid2bar_ports::tables::{MarkerRow, NoteRow};
use mid2bar_ports::types::{Seconds, Volume100};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Clone, Default)]
struct RecordingBacking {
    calls: Arc<Mutex<Vec<String>>>,
}

impl BackingTrackPort for RecordingBacking {
    fn duration(&self) -> Seconds {
        20.0
    }

    fn play_from(&mut self, position: Seconds) -> Result<(), BackingTrackError> {
        self.calls.lock().push(format!("play_from {position}"));
        Ok(())
    }

    fn pause(&mut self) -> Result<(), BackingTrackError> {
        self.calls.lock().push("pause".into());
        Ok(())
    }

    fn resume(&mut self) -> Result<(), BackingTrackError> {
        self.calls.lock().push("resume".into());
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BackingTrackError> {
        self.calls.lock().push("stop".into());
        Ok(())
    }

    fn set_volume(&mut self, volume: Volume100) -> Result<(), BackingTrackError> {
        self.calls.lock().push(format!("volume {}", volume.get()));
        Ok(())
    }
}

fn row(id: u32, start: f64, end: f64, pitch: u8) -> NoteRow {
    NoteRow {
        id,
        start_seconds: start,
        end_seconds: end,
        octave: pitch as i32 / 12 - 1,
        note_name: String::new(),
        pitch,
        channel: 0,
    }
}

fn marker(id: u32, time: f64) -> MarkerRow {
    MarkerRow {
        id,
        tick: id as i64 * 1920,
        time_seconds: time,
    }
}

fn inputs() -> PlayerInputs {
    PlayerInputs {
        notes: vec![row(0, 0.5, 1.5, 60), row(1, 4.0, 5.0, 64), row(2, 9.0, 10.0, 67)],
        markers: vec![marker(0, 0.0), marker(1, 4.0), marker(2, 8.0)],
        lyrics: Vec::new(),
    }
}

fn settings() -> PlayerSettings {
    PlayerSettings {
        mic_input_offset: 0.0,
        ..PlayerSettings::default()
    }
}

fn silent_core() -> PlayerCore {
    PlayerCore::new(settings(), inputs(), Box::new(SilentBackingTrack::new(20.0)), None)
        .expect("core")
}

#[test]
fn builds_pages_from_markers_and_the_closing_marker() {
    let core = silent_core();
    let bounds: Vec<(f64, f64)> = core
        .pages()
        .iter()
        .map(|p| (p.start_time, p.end_time))
        .collect();
    assert_eq!(bounds, vec![(0.0, 4.0), (4.0, 8.0), (8.0, 18.0)]);
    assert_eq!(core.page_scores().len(), 3);
    assert_eq!(core.volume(), Volume100(80));
}

#[test]
fn invalid_settings_are_rejected() {
    let bad = PlayerSettings {
        screen_fps: 0,
        ..PlayerSettings::default()
    };
    let result = PlayerCore::new(bad, inputs(), Box::new(SilentBackingTrack::new(1.0)), None);
    assert!(matches!(result, Err(AppError::Settings(_))));
}

#[test]
fn frames_advance_time_and_report_page_changes() {
    let mut core = silent_core();
    core.handle_command(Command::Play).unwrap();

    let snapshot = core.frame_with_elapsed(1.0).unwrap();
    assert_eq!(snapshot.time, 1.0);
    assert_eq!(snapshot.state, ClockState::Playing);
    assert_eq!(snapshot.pages.len(), 1);
    assert_eq!(snapshot.pages[0].index, 0);
    assert_eq!(snapshot.now_bar_x, Some(100.0 + 1720.0 / 4.0));
    assert_eq!(snapshot.scores, None);

    core.frame_with_elapsed(4.0).unwrap();
    let events = core.drain_events();
    assert_eq!(
        events,
        vec![
            Event::PageChanged {
                index: Some(0),
                start_time: Some(0.0),
                end_time: Some(4.0),
            },
            Event::PageChanged {
                index: Some(1),
                start_time: Some(4.0),
                end_time: Some(8.0),
            },
        ]
    );
    assert!(core.drain_events().is_empty());
}

#[test]
fn auto_play_counts_notes_after_their_animation() {
    let mut core = silent_core();
    assert!(core.auto_play());
    core.handle_command(Command::Play).unwrap();

    // first note ends at 1.5, then lag 0.3 and animation 0.8
    let before = core.frame_with_elapsed(2.5).unwrap();
    assert_eq!(before.counts.max + before.counts.min + before.counts.normal, 0);
    let after = core.frame_with_elapsed(0.2).unwrap();
    assert_eq!(after.counts.min, 1);

    core.handle_command(Command::ToggleAutoPlay).unwrap();
    let off = core.frame_with_elapsed(0.0).unwrap();
    assert_eq!(off.counts, Default::default());
    assert_eq!(
        core.drain_events().last(),
        Some(&Event::AutoPlayChanged { enabled: false })
    );
}

#[test]
fn reaching_the_end_stops_the_backing_track() {
    let backing = RecordingBacking::default();
    let calls = backing.calls.clone();
    let mut core = PlayerCore::new(settings(), inputs(), Box::new(backing), None).unwrap();

    core.handle_command(Command::Play).unwrap();
    core.frame_with_elapsed(25.0).unwrap();

    assert!(core.clock().is_finished());
    assert!(core
        .drain_events()
        .contains(&Event::PlaybackFinished { time: 20.0 }));
    assert_eq!(
        *calls.lock(),
        vec!["volume 80".to_string(), "play_from 0".into(), "stop".into()]
    );
}

#[test]
fn transport_commands_drive_the_backing_track() {
    let backing = RecordingBacking::default();
    let calls = backing.calls.clone();
    let mut core = PlayerCore::new(settings(), inputs(), Box::new(backing), None).unwrap();

    core.handle_command(Command::TogglePlay).unwrap();
    core.frame_with_elapsed(2.0).unwrap();
    core.handle_command(Command::TogglePlay).unwrap();
    assert_eq!(core.clock().state(), ClockState::Paused);
    core.handle_command(Command::TogglePlay).unwrap();
    assert_eq!(core.clock().now(), 2.0);
    core.handle_command(Command::SeekRatio { ratio: 0.5 }).unwrap();
    assert_eq!(core.clock().now(), 10.0);
    core.handle_command(Command::StepVolume { delta: -30 }).unwrap();

    assert_eq!(
        *calls.lock(),
        vec![
            "volume 80".to_string(),
            "play_from 0".into(),
            "pause".into(),
            "resume".into(),
            "play_from 10".into(),
            "volume 50".into(),
        ]
    );
    assert_eq!(
        core.drain_events().last(),
        Some(&Event::VolumeChanged {
            volume: Volume100(50)
        })
    );
}

#[test]
fn invalid_frame_intervals_are_reported_and_skipped() {
    let mut core = silent_core();
    core.handle_command(Command::Play).unwrap();
    assert!(core.frame_with_elapsed(f64::NAN).is_err());
    assert!(matches!(
        core.drain_events().last(),
        Some(Event::FrameSkipped { .. })
    ));
    let snapshot = core.frame_with_elapsed(0.5).unwrap();
    assert_eq!(snapshot.time, 0.5);
}

#[test]
fn mic_input_without_a_device_stays_off() {
    let mut core = silent_core();
    core.handle_command(Command::SetMicInput { enabled: true }).unwrap();
    assert!(!core.mic_enabled());
    assert!(core.auto_play());
    assert!(matches!(
        core.drain_events().last(),
        Some(Event::MicInputChanged {
            enabled: false,
            error: Some(_)
        })
    ));
}

#[test]
fn mic_open_failure_is_reported() {
    let port = SinePort {
        fail_open: true,
        ..SinePort::new(261.63)
    };
    let mut core = PlayerCore::new(
        settings(),
        inputs(),
        Box::new(SilentBackingTrack::new(20.0)),
        Some(Box::new(port)),
    )
    .unwrap();

    core.handle_command(Command::ToggleMicInput).unwrap();
    assert!(!core.mic_enabled());
}

#[test]
fn singing_the_target_pitch_produces_matched_notes_and_scores() {
    let port = SinePort::new(261.63);
    let mut core = PlayerCore::new(
        settings(),
        inputs(),
        Box::new(SilentBackingTrack::new(20.0)),
        Some(Box::new(port)),
    )
    .unwrap();

    core.handle_command(Command::SetMicInput { enabled: true }).unwrap();
    assert!(core.mic_enabled());
    assert!(!core.auto_play());

    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        let snapshot = core.frame_with_elapsed(0.0).unwrap();
        if snapshot.latest_pitch.and_then(|p| p.midi).is_some() {
            break;
        }
        assert!(Instant::now() < deadline, "detector never produced a pitch");
        thread::sleep(Duration::from_millis(5));
    }

    core.handle_command(Command::Play).unwrap();
    for _ in 0..30 {
        core.frame_with_elapsed(0.1).unwrap();
        thread::sleep(Duration::from_millis(2));
    }

    assert!(!core.pitch_log().is_empty());
    let first = core.mic_notes().first().expect("mic note for the first target");
    assert_eq!(first.pitch, 60);
    assert_eq!(first.kind, MicNoteType::MatchAll);
    assert!(core.page_scores()[0].weighted_score > 90.0);

    let events = core.drain_events();
    assert!(events.contains(&Event::AutoPlayChanged { enabled: false }));
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::ScoresUpdated { .. })));

    core.handle_command(Command::SeekTo { seconds: 0.0 }).unwrap();
    assert!(core.mic_notes().is_empty());
    assert!(core.pitch_log().is_empty());
}
