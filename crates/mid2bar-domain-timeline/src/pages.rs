use crate::model::{Marker, Note};
use crate::timeline::{DisplayPitchRange, NoteTimeline};
use mid2bar_ports::settings::PlayerSettings;
use mid2bar_ports::types::Seconds;
use serde::{Deserialize, Serialize};

/// Tolerance for notes that start on a marker boundary.
pub const BOUNDARY_EPSILON: Seconds = 1e-5;
pub const MIN_BAR_WIDTH: f64 = 3.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BarArea {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BarArea {
    pub fn from_settings(settings: &PlayerSettings) -> Self {
        Self {
            left: settings.bar_area_left,
            top: settings.bar_area_top,
            width: settings.bar_area_width,
            height: settings.bar_area_height,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoteGeometry {
    pub x_start: f64,
    pub x_end: f64,
    pub width: f64,
    /// Vertical centre of the bar.
    pub y: f64,
    pub height: f64,
}

/// Screen geometry of an interval `[start, end]` at `pitch` inside a page
/// spanning `[page_start, page_end]`.
pub fn place_interval(
    page_start: Seconds,
    page_end: Seconds,
    start: Seconds,
    end: Seconds,
    pitch: f64,
    display: DisplayPitchRange,
    area: BarArea,
) -> NoteGeometry {
    let duration = page_end - page_start;
    let to_x = |t: Seconds| {
        if duration > 0.0 {
            area.left + (t - page_start) / duration * area.width
        } else {
            area.left
        }
    };
    let x_start = to_x(start);
    let x_end = to_x(end);
    let lanes = (display.span() - 1).max(1) as f64;
    let y = area.top + area.height - (pitch - display.min as f64) * area.height / lanes;

    NoteGeometry {
        x_start,
        x_end,
        width: (x_end - x_start).max(MIN_BAR_WIDTH),
        y,
        height: display.bar_height(area.height),
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageNote {
    pub note: Note,
    pub geometry: NoteGeometry,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub start_time: Seconds,
    pub end_time: Seconds,
    /// Fade-in before the crossfade lead is subtracted.
    pub preview_start: Seconds,
    pub fade_in_time: Seconds,
    pub fade_out_time: Seconds,
    pub notes: Vec<PageNote>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum PageFade {
    /// Revealing left to right; `progress` in 0..=1.
    FadeIn { progress: f64 },
    /// Hiding, anchored to the right edge; `progress` is 1 at the start of
    /// the fade-out and 0 at its end.
    FadeOut { progress: f64 },
    Full,
}

impl PageFade {
    pub fn alpha(&self) -> f32 {
        match self {
            PageFade::FadeIn { progress } | PageFade::FadeOut { progress } => {
                progress.clamp(0.0, 1.0) as f32
            }
            PageFade::Full => 1.0,
        }
    }

    /// Share of the bar area that is revealed.
    pub fn reveal_ratio(&self) -> f64 {
        match self {
            PageFade::FadeIn { progress } | PageFade::FadeOut { progress } => {
                progress.clamp(0.0, 1.0)
            }
            PageFade::Full => 1.0,
        }
    }
}

impl Page {
    pub fn duration(&self) -> Seconds {
        self.end_time - self.start_time
    }

    pub fn is_visible_at(&self, t: Seconds) -> bool {
        self.fade_in_time <= t && t < self.fade_out_time
    }

    pub fn contains(&self, t: Seconds) -> bool {
        self.start_time <= t && t < self.end_time
    }

    pub fn fade_at(&self, t: Seconds, fade_time: Seconds) -> PageFade {
        let since_fade_in = t - self.fade_in_time;
        let until_fade_out = t - self.fade_out_time;
        let ratio = |delta: Seconds| {
            if fade_time > 0.0 {
                (delta / fade_time).min(1.0)
            } else {
                1.0
            }
        };
        if since_fade_in <= fade_time {
            PageFade::FadeIn {
                progress: ratio(since_fade_in).max(0.0),
            }
        } else if until_fade_out >= -fade_time {
            PageFade::FadeOut {
                progress: ratio(-until_fade_out).max(0.0),
            }
        } else {
            PageFade::Full
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageConfig {
    pub preview_time: Seconds,
    pub remain_time: Seconds,
    pub fade_time: Seconds,
    pub hide_when_no_notes: bool,
}

impl PageConfig {
    pub fn from_settings(settings: &PlayerSettings) -> Self {
        Self {
            preview_time: settings.preview_time,
            remain_time: settings.remain_time,
            fade_time: settings.fade_time,
            hide_when_no_notes: settings.hide_now_bar_when_no_notes,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PageSegmenter {
    config: PageConfig,
    area: BarArea,
}

impl PageSegmenter {
    pub fn new(config: PageConfig, area: BarArea) -> Self {
        Self { config, area }
    }

    pub fn config(&self) -> PageConfig {
        self.config
    }

    pub fn area(&self) -> BarArea {
        self.area
    }

    /// Splits the timeline at `markers`. Fewer than two markers yield no
    /// pages.
    pub fn segment(&self, markers: &[Marker], timeline: &NoteTimeline) -> Vec<Page> {
        let display = timeline.display_range();
        let mut pages: Vec<Page> = Vec::new();

        for pair in markers.windows(2) {
            let start_time = pair[0].time;
            let end_time = pair[1].time;
            let notes: Vec<PageNote> = timeline
                .notes()
                .iter()
                .filter(|n| {
                    start_time - BOUNDARY_EPSILON <= n.start
                        && n.start < end_time
                        && end_time - n.start >= BOUNDARY_EPSILON
                })
                .map(|n| PageNote {
                    note: n.clone(),
                    geometry: place_interval(
                        start_time,
                        end_time,
                        n.start,
                        n.end,
                        n.pitch as f64,
                        display,
                        self.area,
                    ),
                })
                .collect();

            if self.config.hide_when_no_notes && notes.is_empty() {
                continue;
            }

            pages.push(Page {
                start_time,
                end_time,
                preview_start: start_time,
                fade_in_time: start_time,
                fade_out_time: end_time,
                notes,
            });
        }

        self.apply_fades(&mut pages);
        pages
    }

    fn apply_fades(&self, pages: &mut [Page]) {
        let cfg = self.config;

        for idx in 0..pages.len() {
            let mut fade_in = (pages[idx].start_time - cfg.preview_time).max(0.0);
            if idx > 0 && pages[idx - 1].end_time > fade_in {
                fade_in = pages[idx - 1].end_time;
            }
            pages[idx].preview_start = fade_in;
        }

        for idx in 0..pages.len() {
            let mut fade_out = pages[idx].end_time + cfg.remain_time;
            if let Some(next) = pages.get(idx + 1) {
                if next.preview_start < fade_out {
                    fade_out = next.preview_start;
                }
            }
            pages[idx].fade_out_time = fade_out;
        }

        for page in pages.iter_mut() {
            page.fade_in_time = (page.preview_start - cfg.fade_time).max(0.0);
        }
    }
}

/// Indices of the pages on screen at `t` (at most two while crossfading).
pub fn visible_pages(pages: &[Page], t: Seconds) -> Vec<usize> {
    pages
        .iter()
        .enumerate()
        .filter(|(_, page)| page.is_visible_at(t))
        .map(|(idx, _)| idx)
        .collect()
}
