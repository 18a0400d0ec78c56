use mid2bar_ports::tables::{MarkerRow, NoteRow};
use mid2bar_ports::types::{Seconds, Tick};
use serde::{Deserialize, Serialize};

/// Seconds appended after the last authored marker to close the final page.
pub const CLOSING_MARKER_OFFSET: Seconds = 10.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempoPoint {
    pub tick: Tick,
    pub us_per_quarter: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteType {
    Normal,
    Max,
    Min,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NoteEffect {
    Up,
    Down,
    Long,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteEffects {
    pub up: bool,
    pub down: bool,
    pub long: bool,
}

impl NoteEffects {
    pub const NONE: NoteEffects = NoteEffects {
        up: false,
        down: false,
        long: false,
    };

    pub fn contains(&self, effect: NoteEffect) -> bool {
        match effect {
            NoteEffect::Up => self.up,
            NoteEffect::Down => self.down,
            NoteEffect::Long => self.long,
        }
    }

    pub fn insert(&mut self, effect: NoteEffect) {
        match effect {
            NoteEffect::Up => self.up = true,
            NoteEffect::Down => self.down = true,
            NoteEffect::Long => self.long = true,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = NoteEffect> + '_ {
        [NoteEffect::Up, NoteEffect::Down, NoteEffect::Long]
            .into_iter()
            .filter(move |effect| self.contains(*effect))
    }

    pub fn is_empty(&self) -> bool {
        !(self.up || self.down || self.long)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: u32,
    pub start: Seconds,
    pub end: Seconds,
    pub pitch: u8,
    pub octave: i32,
    pub name: String,
    pub channel: u8,
    pub kind: NoteType,
    pub effects: NoteEffects,
}

impl Note {
    pub fn duration(&self) -> Seconds {
        (self.end - self.start).max(0.0)
    }
}

impl From<&NoteRow> for Note {
    fn from(row: &NoteRow) -> Self {
        Self {
            id: row.id,
            start: row.start_seconds,
            end: row.end_seconds,
            pitch: row.pitch,
            octave: row.octave,
            name: row.note_name.clone(),
            channel: row.channel,
            kind: NoteType::Normal,
            effects: NoteEffects::NONE,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: u32,
    /// `None` for the synthesized closing marker.
    pub tick: Option<Tick>,
    pub time: Seconds,
}

/// Builds the page separators from the marker table: rows are ordered by
/// time, rows that do not strictly advance are dropped, and a closing marker
/// is appended `CLOSING_MARKER_OFFSET` after the last one.
pub fn markers_from_rows(rows: &[MarkerRow]) -> Vec<Marker> {
    let mut sorted: Vec<&MarkerRow> = rows
        .iter()
        .filter(|row| row.time_seconds.is_finite())
        .collect();
    sorted.sort_by(|a, b| a.time_seconds.total_cmp(&b.time_seconds));

    let mut markers: Vec<Marker> = Vec::with_capacity(sorted.len() + 1);
    for row in sorted {
        if let Some(last) = markers.last() {
            if row.time_seconds <= last.time {
                continue;
            }
        }
        markers.push(Marker {
            id: row.id,
            tick: Some(row.tick),
            time: row.time_seconds,
        });
    }

    if let Some(last) = markers.last().copied() {
        markers.push(Marker {
            id: markers.len() as u32,
            tick: None,
            time: last.time + CLOSING_MARKER_OFFSET,
        });
    }

    markers
}
