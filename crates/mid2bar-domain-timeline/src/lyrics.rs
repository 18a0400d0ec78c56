use mid2bar_ports::tables::{LyricLayerRow, LyricLineRow, TimeWindow};
use mid2bar_ports::types::Seconds;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LyricLayerKind {
    BackgroundMain,
    FrontMain,
    BackgroundRuby,
    FrontRuby,
}

impl LyricLayerKind {
    pub const DRAW_ORDER: [LyricLayerKind; 4] = [
        LyricLayerKind::BackgroundMain,
        LyricLayerKind::FrontMain,
        LyricLayerKind::BackgroundRuby,
        LyricLayerKind::FrontRuby,
    ];

    pub fn is_front(&self) -> bool {
        matches!(self, LyricLayerKind::FrontMain | LyricLayerKind::FrontRuby)
    }

    fn layer<'a>(&self, line: &'a LyricLineRow) -> &'a LyricLayerRow {
        match self {
            LyricLayerKind::BackgroundMain => &line.background_main_lyric,
            LyricLayerKind::FrontMain => &line.front_main_lyric,
            LyricLayerKind::BackgroundRuby => &line.background_ruby,
            LyricLayerKind::FrontRuby => &line.front_ruby,
        }
    }
}

/// One lyric image to composite: draw `image` at `(x + clip_x, y + clip_up)`
/// with everything left of `clip_x` cut away.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LyricLayerState {
    pub line: usize,
    pub kind: LyricLayerKind,
    pub x: f64,
    pub y: f64,
    pub clip_x: f64,
    pub clip_up: f64,
    pub clip_bottom: f64,
    pub alpha: f32,
    pub image: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LyricTrack {
    lines: Vec<LyricLineRow>,
}

impl LyricTrack {
    pub fn new(lines: Vec<LyricLineRow>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[LyricLineRow] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn evaluate(&self, t: Seconds) -> Vec<LyricLayerState> {
        let mut out = Vec::new();

        for (line_idx, line) in self.lines.iter().enumerate() {
            let fade_in = line.fade_in.and_then(|w| window_progress(w, t));
            let fade_out = line.fade_out.and_then(|w| window_progress(w, t));

            for kind in LyricLayerKind::DRAW_ORDER {
                let alpha = match (fade_in, fade_out) {
                    (Some(progress), _) => {
                        if !kind.is_front() {
                            continue;
                        }
                        progress
                    }
                    (None, Some(progress)) => {
                        if kind.is_front() {
                            continue;
                        }
                        1.0 - progress
                    }
                    (None, None) => 1.0,
                };

                let layer = kind.layer(line);
                let Some(clip_x) = clip_at(layer, t) else {
                    continue;
                };

                out.push(LyricLayerState {
                    line: line_idx,
                    kind,
                    x: layer.x,
                    y: layer.y,
                    clip_x,
                    clip_up: layer.clip_up,
                    clip_bottom: layer.clip_bottom,
                    alpha: alpha.clamp(0.0, 1.0) as f32,
                    image: layer.image.clone(),
                });
            }
        }

        out
    }
}

fn window_progress(window: TimeWindow, t: Seconds) -> Option<f64> {
    if !(window.start <= t && t < window.end) {
        return None;
    }
    let span = window.end - window.start;
    Some(if span > 0.0 { (t - window.start) / span } else { 1.0 })
}

/// Wipe position of an active layer; `None` when the layer or all of its
/// keyframes are inactive at `t`.
fn clip_at(layer: &LyricLayerRow, t: Seconds) -> Option<f64> {
    if !(layer.start <= t && t < layer.end) {
        return None;
    }
    let key = layer
        .x_wipes
        .iter()
        .find(|key| key.start() <= t && t < key.end())?;

    let clip = if key.start() == key.end() {
        0.0
    } else {
        let progress = (t - key.start()) / (key.end() - key.start());
        (key.x_to() - key.x_from()) * progress + key.x_from()
    };
    Some(clip.floor())
}
