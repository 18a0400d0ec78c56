use crate::clock::{ClockState, PlaybackClock};
use crate::ipc::{Command, Event};
use crate::pitch_analysis::PitchEstimate;
use crate::pitch_detector::{DetectorConfig, DetectorError, PitchDetector};
use mid2bar_domain_eval::{
    layout_mic_notes, AlignerConfig, MicNote, MicNoteAligner, PageScore, PassedNoteCounts,
    PitchLog, PitchSample, PlacedMicNote, ScoreSummary, ScoringConfig, ScoringEngine,
};
use mid2bar_domain_timeline::{
    markers_from_rows, visible_pages, BarArea, LyricLayerState, LyricTrack, Marker,
    MidiImportError, NoteTimeline, Page, PageConfig, PageFade, PageNote, PageSegmenter,
};
use mid2bar_ports::audio::AudioInputPort;
use mid2bar_ports::backing::{BackingTrackError, BackingTrackPort};
use mid2bar_ports::settings::{PlayerSettings, SettingsError};
use mid2bar_ports::storage::StorageError;
use mid2bar_ports::tables::{LyricLineRow, MarkerRow, NoteRow};
use mid2bar_ports::types::{DeviceId, Seconds, Volume100};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Instant;

/// Score ratios further than this from summing to 1 are reported.
const RATIO_SUM_TOLERANCE: f64 = 1e-6;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("backing track error: {0}")]
    Backing(#[from] BackingTrackError),
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("midi import failed: {0}")]
    MidiImport(#[from] MidiImportError),
}

/// A failure inside one frame. The clock has already advanced when this is
/// returned; the caller logs it and moves on to the next frame.
#[derive(thiserror::Error, Debug)]
pub enum FrameError {
    #[error("invalid frame interval: {0}")]
    InvalidElapsed(f64),
    #[error("backing track error: {0}")]
    Backing(#[from] BackingTrackError),
}

/// The tables a song is built from.
#[derive(Clone, Debug, Default)]
pub struct PlayerInputs {
    pub notes: Vec<NoteRow>,
    pub markers: Vec<MarkerRow>,
    pub lyrics: Vec<LyricLineRow>,
}

#[derive(Clone, Debug, Serialize)]
pub struct VisiblePage {
    pub index: usize,
    pub start_time: Seconds,
    pub end_time: Seconds,
    pub fade: PageFade,
    pub alpha: f32,
    pub reveal_ratio: f64,
    pub notes: Vec<PageNote>,
    pub mic_notes: Vec<PlacedMicNote>,
}

/// Everything a renderer needs for one frame.
#[derive(Clone, Debug, Serialize)]
pub struct FrameSnapshot {
    pub time: Seconds,
    pub duration: Seconds,
    pub progress: f64,
    pub state: ClockState,
    pub pages: Vec<VisiblePage>,
    pub now_bar_x: Option<f64>,
    pub lyrics: Vec<LyricLayerState>,
    pub counts: PassedNoteCounts,
    /// Present while mic input is on.
    pub scores: Option<ScoreSummary>,
    pub latest_pitch: Option<PitchEstimate>,
    pub volume: Volume100,
    pub auto_play: bool,
    pub mic_enabled: bool,
}

pub struct PlayerCore {
    settings: PlayerSettings,
    timeline: NoteTimeline,
    markers: Vec<Marker>,
    segmenter: PageSegmenter,
    pages: Vec<Page>,
    lyrics: LyricTrack,
    clock: PlaybackClock,
    backing: Box<dyn BackingTrackPort>,
    detector: Option<PitchDetector>,
    volume: Volume100,
    auto_play: bool,
    mic_enabled: bool,
    pitch_log: PitchLog,
    aligner: MicNoteAligner,
    scoring: ScoringEngine,
    page_scores: Vec<PageScore>,
    current_page: Option<usize>,
    events: VecDeque<Event>,
    last_frame: Option<Instant>,
}

impl PlayerCore {
    /// `audio_input` is optional; without it mic input cannot be enabled.
    pub fn new(
        settings: PlayerSettings,
        inputs: PlayerInputs,
        mut backing: Box<dyn BackingTrackPort>,
        audio_input: Option<Box<dyn AudioInputPort>>,
    ) -> Result<Self, AppError> {
        settings.validate()?;
        if (settings.score_ratio_sum() - 1.0).abs() > RATIO_SUM_TOLERANCE {
            log::warn!(
                "score ratios sum to {} instead of 1; scores are not on a 0-100 scale",
                settings.score_ratio_sum()
            );
        }

        let timeline = NoteTimeline::from_rows(&inputs.notes, settings.display_pitch_range_min);
        let markers = markers_from_rows(&inputs.markers);
        if markers.len() < 2 {
            log::warn!("fewer than two markers: no pages will be shown");
        }
        let segmenter = PageSegmenter::new(
            PageConfig::from_settings(&settings),
            BarArea::from_settings(&settings),
        );
        let pages = segmenter.segment(&markers, &timeline);
        log::info!(
            "loaded {} notes, {} markers, {} pages, {} lyric lines",
            timeline.notes().len(),
            markers.len(),
            pages.len(),
            inputs.lyrics.len()
        );

        let volume = Volume100::new(settings.default_volume);
        backing.set_volume(volume)?;
        let clock = PlaybackClock::new(backing.duration(), settings.playback_time_scale);
        let detector = audio_input
            .map(|port| PitchDetector::new(port, DetectorConfig::from_settings(&settings)));
        let aligner = MicNoteAligner::new(AlignerConfig::from_settings(&settings, 0));
        let scoring = ScoringEngine::new(ScoringConfig::from_settings(&settings, 0));
        let page_scores = scoring.score_pages(&pages, &[]);

        Ok(Self {
            auto_play: settings.bar_auto_play,
            settings,
            timeline,
            markers,
            segmenter,
            pages,
            lyrics: LyricTrack::new(inputs.lyrics),
            clock,
            backing,
            detector,
            volume,
            mic_enabled: false,
            pitch_log: PitchLog::new(),
            aligner,
            scoring,
            page_scores,
            current_page: None,
            events: VecDeque::new(),
            last_frame: None,
        })
    }

    pub fn settings(&self) -> &PlayerSettings {
        &self.settings
    }

    pub fn timeline(&self) -> &NoteTimeline {
        &self.timeline
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn page_scores(&self) -> &[PageScore] {
        &self.page_scores
    }

    pub fn mic_notes(&self) -> &[MicNote] {
        self.aligner.mic_notes()
    }

    pub fn pitch_log(&self) -> &PitchLog {
        &self.pitch_log
    }

    pub fn mic_enabled(&self) -> bool {
        self.mic_enabled
    }

    pub fn auto_play(&self) -> bool {
        self.auto_play
    }

    pub fn volume(&self) -> Volume100 {
        self.volume
    }

    /// Selects the microphone used the next time mic input is enabled.
    pub fn set_input_device(&mut self, device: Option<DeviceId>) {
        if let Some(detector) = self.detector.as_mut() {
            detector.set_device(device);
        }
    }

    pub fn handle_command(&mut self, cmd: Command) -> Result<(), AppError> {
        match cmd {
            Command::Play => self.play()?,
            Command::Pause => self.pause()?,
            Command::Resume => self.resume()?,
            Command::TogglePlay => {
                if self.clock.is_playing() {
                    self.pause()?;
                } else if self.clock.now() == 0.0 {
                    self.play()?;
                } else {
                    self.resume()?;
                }
            }
            Command::Restart => {
                self.clock.restart();
                self.backing.play_from(0.0)?;
                self.reset_mic_state();
            }
            Command::SeekTo { seconds } => self.seek_to(seconds)?,
            Command::SeekRatio { ratio } => {
                let ratio = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 };
                self.seek_to(ratio * self.clock.duration())?;
            }
            Command::SetVolume { volume } => self.set_volume(volume)?,
            Command::StepVolume { delta } => self.set_volume(self.volume.step(delta))?,
            Command::ToggleAutoPlay => self.set_auto_play(!self.auto_play),
            Command::SetMicInput { enabled } => self.set_mic_input(enabled)?,
            Command::ToggleMicInput => self.set_mic_input(!self.mic_enabled)?,
            Command::SetMicChannel { channel } => {
                self.aligner.set_channel(channel);
                self.scoring.set_channel(channel);
                self.pitch_log.clear();
                self.rescore();
            }
        }
        Ok(())
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    /// Advances by the wall time since the previous frame.
    pub fn frame(&mut self) -> Result<FrameSnapshot, FrameError> {
        let now = Instant::now();
        let elapsed = self
            .last_frame
            .map(|last| now.duration_since(last).as_secs_f64())
            .unwrap_or(0.0);
        self.last_frame = Some(now);
        self.frame_with_elapsed(elapsed)
    }

    pub fn frame_with_elapsed(&mut self, elapsed: Seconds) -> Result<FrameSnapshot, FrameError> {
        let finished = self.clock.advance(elapsed);
        match self.update_frame(elapsed, finished) {
            Ok(snapshot) => Ok(snapshot),
            Err(err) => {
                self.events.push_back(Event::FrameSkipped {
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    fn update_frame(
        &mut self,
        elapsed: Seconds,
        finished: bool,
    ) -> Result<FrameSnapshot, FrameError> {
        if finished {
            log::info!("playback finished at {:.3}s", self.clock.now());
            self.events.push_back(Event::PlaybackFinished {
                time: self.clock.now(),
            });
            self.backing.stop()?;
        }
        if !elapsed.is_finite() || elapsed < 0.0 {
            return Err(FrameError::InvalidElapsed(elapsed));
        }

        let t = self.clock.now();
        if self.mic_enabled {
            self.ingest_pitch(t);
            if self.aligner.update(t, self.timeline.notes(), &self.pitch_log) {
                self.rescore();
            }
        }
        self.track_current_page(t);
        Ok(self.snapshot(t))
    }

    fn ingest_pitch(&mut self, t: Seconds) {
        let Some(detector) = self.detector.as_ref() else {
            return;
        };
        let estimate = detector.get_latest();
        if !estimate.is_voiced(self.settings.rms_threshold) {
            return;
        }
        let Some(pitch) = estimate.midi else {
            return;
        };
        self.pitch_log.push(PitchSample {
            time: t - self.settings.mic_input_delay,
            pitch,
            octave: estimate.octave.unwrap_or_default(),
            name: estimate.note_name.unwrap_or_default(),
        });
    }

    fn track_current_page(&mut self, t: Seconds) {
        let current = self.pages.iter().rposition(|page| page.contains(t));
        if current == self.current_page {
            return;
        }
        self.current_page = current;
        let bounds = current.map(|idx| (self.pages[idx].start_time, self.pages[idx].end_time));
        log::debug!("page changed to {current:?} at {t:.3}s");
        self.events.push_back(Event::PageChanged {
            index: current,
            start_time: bounds.map(|b| b.0),
            end_time: bounds.map(|b| b.1),
        });
    }

    fn snapshot(&self, t: Seconds) -> FrameSnapshot {
        let display = self.timeline.display_range();
        let area = self.segmenter.area();
        let fade_time = self.segmenter.config().fade_time;
        let visible = visible_pages(&self.pages, t);

        let now_bar_x = visible.first().map(|idx| {
            let page = &self.pages[*idx];
            let duration = page.duration();
            if duration > 0.0 {
                area.left + (t - page.start_time) / duration * area.width
            } else {
                area.left
            }
        });

        let pages = visible
            .into_iter()
            .map(|idx| {
                let page = &self.pages[idx];
                let fade = page.fade_at(t, fade_time);
                let mic_notes = if self.mic_enabled {
                    layout_mic_notes(page, self.aligner.mic_notes(), display, area)
                } else {
                    Vec::new()
                };
                VisiblePage {
                    index: idx,
                    start_time: page.start_time,
                    end_time: page.end_time,
                    fade,
                    alpha: fade.alpha(),
                    reveal_ratio: fade.reveal_ratio(),
                    notes: page.notes.clone(),
                    mic_notes,
                }
            })
            .collect();

        FrameSnapshot {
            time: t,
            duration: self.clock.duration(),
            progress: self.clock.progress(),
            state: self.clock.state(),
            pages,
            now_bar_x,
            lyrics: self.lyrics.evaluate(t),
            counts: self.passed_counts(t),
            scores: self
                .mic_enabled
                .then(|| ScoreSummary::at(&self.page_scores, t)),
            latest_pitch: if self.mic_enabled {
                self.detector.as_ref().map(|d| d.get_latest())
            } else {
                None
            },
            volume: self.volume,
            auto_play: self.auto_play,
            mic_enabled: self.mic_enabled,
        }
    }

    fn passed_counts(&self, t: Seconds) -> PassedNoteCounts {
        let range = self.timeline.pitch_range();
        if self.mic_enabled {
            PassedNoteCounts::from_mic_notes(
                self.aligner.mic_notes(),
                range,
                t,
                self.settings.bar_passed_count_animation_time,
            )
        } else if self.auto_play {
            PassedNoteCounts::from_auto_play(
                self.timeline.notes(),
                range,
                t,
                self.settings.lag_time,
                self.settings.bar_passed_count_animation_time,
                &self.settings.bar_auto_play_channels,
            )
        } else {
            PassedNoteCounts::default()
        }
    }

    fn play(&mut self) -> Result<(), AppError> {
        self.clock.play();
        self.backing.play_from(0.0)?;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), AppError> {
        if self.clock.is_playing() {
            self.clock.pause();
            self.backing.pause()?;
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<(), AppError> {
        if !self.clock.is_playing() && !self.clock.is_finished() {
            self.clock.resume();
            self.backing.resume()?;
        }
        Ok(())
    }

    fn seek_to(&mut self, seconds: Seconds) -> Result<(), AppError> {
        self.clock.seek_to(seconds);
        self.backing.play_from(self.clock.now())?;
        if !self.clock.is_playing() {
            self.backing.pause()?;
        }
        self.reset_mic_state();
        Ok(())
    }

    fn set_volume(&mut self, volume: Volume100) -> Result<(), AppError> {
        self.volume = volume;
        self.backing.set_volume(volume)?;
        self.events.push_back(Event::VolumeChanged { volume });
        Ok(())
    }

    fn set_auto_play(&mut self, enabled: bool) {
        self.auto_play = enabled;
        self.events.push_back(Event::AutoPlayChanged { enabled });
    }

    fn set_mic_input(&mut self, enabled: bool) -> Result<(), AppError> {
        if enabled == self.mic_enabled {
            return Ok(());
        }

        if !enabled {
            self.mic_enabled = false;
            let stopped = match self.detector.as_mut() {
                Some(detector) => detector.stop(),
                None => Ok(()),
            };
            self.reset_mic_state();
            self.events.push_back(Event::MicInputChanged {
                enabled: false,
                error: stopped.as_ref().err().map(|e| e.to_string()),
            });
            return stopped.map_err(AppError::from);
        }

        let started = match self.detector.as_mut() {
            Some(detector) => detector.start().map_err(|e| e.to_string()),
            None => Err("no audio input configured".to_string()),
        };
        match started {
            Ok(()) => {
                self.mic_enabled = true;
                self.reset_mic_state();
                if self.auto_play {
                    self.set_auto_play(false);
                }
                self.events.push_back(Event::MicInputChanged {
                    enabled: true,
                    error: None,
                });
            }
            Err(reason) => {
                log::warn!("mic input stays off: {reason}");
                self.events.push_back(Event::MicInputChanged {
                    enabled: false,
                    error: Some(reason),
                });
            }
        }
        Ok(())
    }

    fn reset_mic_state(&mut self) {
        self.pitch_log.clear();
        self.aligner.reset();
        self.rescore();
    }

    fn rescore(&mut self) {
        self.page_scores = self.scoring.score_pages(&self.pages, self.aligner.mic_notes());
        if self.mic_enabled {
            self.events.push_back(Event::ScoresUpdated {
                summary: ScoreSummary::at(&self.page_scores, self.clock.now()),
            });
        }
    }
}
