use crate::aligner::MicNote;
use crate::scoring::mic_notes_in;
use mid2bar_domain_timeline::{place_interval, BarArea, DisplayPitchRange, NoteGeometry, Page};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacedMicNote {
    pub mic: MicNote,
    pub geometry: NoteGeometry,
}

/// Places the mic notes overlapping `page` with the same geometry as the
/// page's target notes.
pub fn layout_mic_notes(
    page: &Page,
    mic_notes: &[MicNote],
    display: DisplayPitchRange,
    area: BarArea,
) -> Vec<PlacedMicNote> {
    mic_notes_in(page.start_time, page.end_time, mic_notes)
        .map(|mic| PlacedMicNote {
            mic: mic.clone(),
            geometry: place_interval(
                page.start_time,
                page.end_time,
                mic.start,
                mic.end,
                mic.pitch as f64,
                display,
                area,
            ),
        })
        .collect()
}
