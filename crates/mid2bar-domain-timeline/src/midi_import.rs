use crate::model::TempoPoint;
use crate::tempo_map::{TempoMap, DEFAULT_US_PER_QUARTER};
use mid2bar_ports::tables::{MarkerRow, NoteRow};
use mid2bar_ports::types::Tick;
use midly::{Fps, MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum MidiImportError {
    #[error("io error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
}

/// A MIDI file flattened into the note and marker tables.
#[derive(Clone, Debug)]
pub struct ImportedMidi {
    pub ticks_per_beat: u16,
    pub tempo_points: Vec<TempoPoint>,
    pub tempo_map: TempoMap,
    pub notes: Vec<NoteRow>,
    pub markers: Vec<MarkerRow>,
}

pub fn import_midi_path(
    path: &Path,
    note_names: &[String],
) -> Result<ImportedMidi, MidiImportError> {
    let data = std::fs::read(path).map_err(|e| MidiImportError::Io(e.to_string()))?;
    import_midi_bytes(&data, note_names)
}

pub fn import_midi_bytes(
    data: &[u8],
    note_names: &[String],
) -> Result<ImportedMidi, MidiImportError> {
    let smf = Smf::parse(data).map_err(|e| MidiImportError::Parse(e.to_string()))?;
    let (ticks_per_beat, tempo_override) = match smf.header.timing {
        Timing::Metrical(ticks) => (ticks.as_int(), None),
        Timing::Timecode(fps, ticks_per_frame) => {
            let (ppq, us_per_quarter) = timecode_ppq_and_tempo(fps, ticks_per_frame);
            (ppq, Some(us_per_quarter))
        }
    };

    let mut tempo_points: BTreeMap<Tick, u32> = BTreeMap::new();
    let mut marker_ticks: Vec<Tick> = Vec::new();
    // (key, channel) -> start ticks of notes still sounding, oldest first
    let mut open: HashMap<(u8, u8), VecDeque<Tick>> = HashMap::new();
    let mut spans: Vec<(Tick, Tick, u8, u8)> = Vec::new();

    for track in &smf.tracks {
        let mut tick: Tick = 0;
        for event in track {
            tick += event.delta.as_int() as Tick;
            match &event.kind {
                TrackEventKind::Midi { channel, message } => {
                    let channel = channel.as_int();
                    match message {
                        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                            open.entry((key.as_int(), channel)).or_default().push_back(tick);
                        }
                        MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                            let key = key.as_int();
                            if let Some(start) = open
                                .get_mut(&(key, channel))
                                .and_then(|starts| starts.pop_front())
                            {
                                spans.push((start, tick, key, channel));
                            }
                        }
                        _ => {}
                    }
                }
                TrackEventKind::Meta(MetaMessage::Tempo(us_per_quarter)) => {
                    tempo_points.insert(tick, us_per_quarter.as_int());
                }
                TrackEventKind::Meta(MetaMessage::Marker(_)) => {
                    marker_ticks.push(tick);
                }
                _ => {}
            }
        }
    }

    let tempo_points = build_tempo_points(tempo_points, tempo_override);
    let tempo_map = TempoMap::new(ticks_per_beat, tempo_points.clone());

    spans.sort_by(|a, b| a.0.cmp(&b.0).then(a.2.cmp(&b.2)));
    let notes = spans
        .into_iter()
        .enumerate()
        .map(|(idx, (start, end, pitch, channel))| NoteRow {
            id: idx as u32,
            start_seconds: tempo_map.ticks_to_seconds(start),
            end_seconds: tempo_map.ticks_to_seconds(end),
            octave: pitch as i32 / 12 - 1,
            note_name: note_name(pitch, note_names),
            pitch,
            channel,
        })
        .collect();

    marker_ticks.sort_unstable();
    let markers = marker_ticks
        .into_iter()
        .enumerate()
        .map(|(idx, tick)| MarkerRow {
            id: idx as u32,
            tick,
            time_seconds: tempo_map.ticks_to_seconds(tick),
        })
        .collect();

    Ok(ImportedMidi {
        ticks_per_beat,
        tempo_points,
        tempo_map,
        notes,
        markers,
    })
}

/// Pitch-class name; empty when `note_names` is not a full 12-entry table.
pub fn note_name(pitch: u8, note_names: &[String]) -> String {
    note_names
        .get(pitch as usize % 12)
        .cloned()
        .unwrap_or_default()
}

fn build_tempo_points(
    tempo_points: BTreeMap<Tick, u32>,
    override_us_per_quarter: Option<u32>,
) -> Vec<TempoPoint> {
    if let Some(us_per_quarter) = override_us_per_quarter {
        return vec![TempoPoint {
            tick: 0,
            us_per_quarter,
        }];
    }

    let mut points: Vec<TempoPoint> = tempo_points
        .into_iter()
        .map(|(tick, us_per_quarter)| TempoPoint {
            tick,
            us_per_quarter,
        })
        .collect();

    if points.first().map_or(true, |p| p.tick != 0) {
        points.insert(
            0,
            TempoPoint {
                tick: 0,
                us_per_quarter: DEFAULT_US_PER_QUARTER,
            },
        );
    }
    points
}

fn timecode_ppq_and_tempo(fps: Fps, ticks_per_frame: u8) -> (u16, u32) {
    let ticks_per_frame = ticks_per_frame.max(1) as u16;
    match fps {
        Fps::Fps24 => (24 * ticks_per_frame, 1_000_000),
        Fps::Fps25 => (25 * ticks_per_frame, 1_000_000),
        Fps::Fps30 => (30 * ticks_per_frame, 1_000_000),
        Fps::Fps29 => (30 * ticks_per_frame, 1_001_000),
    }
}
