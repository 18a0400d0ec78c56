use crate::capture_queue::{capture_queue, CaptureConsumer, CaptureStats};
use crate::pitch_analysis::{BlockAnalyzer, PitchEstimate};
use mid2bar_ports::audio::{AudioError, AudioInputPort, AudioStreamHandle};
use mid2bar_ports::settings::PlayerSettings;
use mid2bar_ports::types::{AudioConfig, DeviceId};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

/// Longest the worker waits for a block before re-checking the stop flag.
pub const POLL_TIMEOUT: Duration = Duration::from_millis(50);
const POLL_INTERVAL: Duration = Duration::from_millis(2);
/// Bound on how long `stop` waits for the worker to exit.
pub const STOP_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(thiserror::Error, Debug)]
pub enum DetectorError {
    #[error("audio error: {0}")]
    Audio(#[from] AudioError),
    #[error("input device was not released: {0}")]
    DeviceLeaked(String),
    #[error("worker spawn failed: {0}")]
    Spawn(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct DetectorConfig {
    pub device: Option<DeviceId>,
    pub sample_rate: u32,
    pub block_size: usize,
    pub channels: u16,
    pub rms_threshold: f32,
    pub midi_offset: f64,
    pub note_names: Vec<String>,
}

impl DetectorConfig {
    pub fn from_settings(settings: &PlayerSettings) -> Self {
        Self {
            device: None,
            sample_rate: settings.default_sample_rate,
            block_size: settings.default_block_size as usize,
            channels: settings.default_channels,
            rms_threshold: settings.rms_threshold,
            midi_offset: settings.mic_input_offset,
            note_names: settings.note_names.clone(),
        }
    }

    fn audio_config(&self) -> AudioConfig {
        AudioConfig {
            sample_rate_hz: self.sample_rate,
            channels: self.channels,
            block_size_frames: self.block_size as u32,
        }
    }
}

struct RunningDetector {
    stream: Box<dyn AudioStreamHandle>,
    stop: Arc<AtomicBool>,
    exited: mpsc::Receiver<()>,
    worker: thread::JoinHandle<()>,
}

/// Microphone pitch tracker: the device callback feeds the capture queue, a
/// worker thread analyses blocks and publishes the latest [`PitchEstimate`].
pub struct PitchDetector {
    port: Box<dyn AudioInputPort>,
    config: DetectorConfig,
    latest: Arc<RwLock<PitchEstimate>>,
    stats: Option<Arc<CaptureStats>>,
    running: Option<RunningDetector>,
    leaked: Option<String>,
}

impl PitchDetector {
    pub fn new(port: Box<dyn AudioInputPort>, config: DetectorConfig) -> Self {
        Self {
            port,
            config,
            latest: Arc::new(RwLock::new(PitchEstimate::default())),
            stats: None,
            running: None,
            leaked: None,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Takes effect on the next `start`.
    pub fn set_device(&mut self, device: Option<DeviceId>) {
        self.config.device = device;
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Opens the input device and starts the worker. A no-op while running.
    pub fn start(&mut self) -> Result<(), DetectorError> {
        if self.running.is_some() {
            return Ok(());
        }
        if let Some(reason) = &self.leaked {
            return Err(DetectorError::DeviceLeaked(reason.clone()));
        }

        let (producer, consumer, stats) = capture_queue(self.config.block_size);
        let stream = self
            .port
            .open_input(
                self.config.device.as_ref(),
                self.config.audio_config(),
                Box::new(producer),
            )
            .map_err(|err| {
                log::error!("pitch detector: failed to open input: {err}");
                DetectorError::from(err)
            })?;

        *self.latest.write() = PitchEstimate::default();
        let stop = Arc::new(AtomicBool::new(false));
        let (exited_tx, exited) = mpsc::channel();
        let worker = Worker {
            consumer,
            analyzer: BlockAnalyzer::new(
                self.config.sample_rate,
                self.config.block_size,
                self.config.rms_threshold,
            ),
            latest: self.latest.clone(),
            stop: stop.clone(),
            midi_offset: self.config.midi_offset,
            note_names: self.config.note_names.clone(),
        };

        let spawned = thread::Builder::new()
            .name("pitch-detector".to_string())
            .spawn(move || {
                worker.run();
                let _ = exited_tx.send(());
            });
        let worker = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                if let Err(close_err) = stream.close() {
                    self.leaked = Some(close_err.to_string());
                }
                return Err(DetectorError::Spawn(err.to_string()));
            }
        };

        log::info!(
            "pitch detector started ({} Hz, block {})",
            self.config.sample_rate,
            self.config.block_size
        );
        self.stats = Some(stats);
        self.running = Some(RunningDetector {
            stream,
            stop,
            exited,
            worker,
        });
        Ok(())
    }

    /// Stops the worker and releases the device. Safe to call repeatedly.
    /// A device that fails to close blocks every later `start`.
    pub fn stop(&mut self) -> Result<(), DetectorError> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        running.stop.store(true, Ordering::Release);
        let closed = running.stream.close();

        match running.exited.recv_timeout(STOP_TIMEOUT) {
            Ok(()) => {
                let _ = running.worker.join();
            }
            Err(_) => {
                log::warn!("pitch detector worker did not exit within {STOP_TIMEOUT:?}");
            }
        }

        *self.latest.write() = PitchEstimate::default();
        if let Some(stats) = &self.stats {
            if stats.dropped_blocks() > 0 {
                log::debug!(
                    "pitch detector dropped {} of {} blocks",
                    stats.dropped_blocks(),
                    stats.dropped_blocks() + stats.captured_blocks()
                );
            }
        }

        match closed {
            Ok(()) => {
                log::info!("pitch detector stopped");
                Ok(())
            }
            Err(err) => {
                log::error!("pitch detector: input device not released: {err}");
                self.leaked = Some(err.to_string());
                Err(DetectorError::DeviceLeaked(err.to_string()))
            }
        }
    }

    /// Snapshot of the last analysed block.
    pub fn get_latest(&self) -> PitchEstimate {
        self.latest.read().clone()
    }

    pub fn dropped_blocks(&self) -> u64 {
        self.stats.as_ref().map_or(0, |s| s.dropped_blocks())
    }
}

impl Drop for PitchDetector {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

struct Worker {
    consumer: CaptureConsumer,
    analyzer: BlockAnalyzer,
    latest: Arc<RwLock<PitchEstimate>>,
    stop: Arc<AtomicBool>,
    midi_offset: f64,
    note_names: Vec<String>,
}

impl Worker {
    fn run(mut self) {
        let started = Instant::now();
        let mut block = Vec::with_capacity(self.consumer.block_size());

        while !self.stop.load(Ordering::Acquire) {
            if !self.wait_for_block(&mut block) {
                continue;
            }
            let analysis = self.analyzer.analyze(&block);
            let estimate = PitchEstimate::from_analysis(
                &analysis,
                self.midi_offset,
                &self.note_names,
                started.elapsed().as_secs_f64(),
            );
            *self.latest.write() = estimate;
        }
    }

    fn wait_for_block(&mut self, block: &mut Vec<f32>) -> bool {
        let deadline = Instant::now() + POLL_TIMEOUT;
        loop {
            if self.consumer.pop_block(block) {
                return true;
            }
            if self.stop.load(Ordering::Acquire) || Instant::now() >= deadline {
                return false;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}
