#![allow(dead_code)]

use mid2bar_ports::audio::{
    AudioCaptureCallback, AudioError, AudioInputPort, AudioStreamHandle,
};
use mid2bar_ports::types::{AudioConfig, AudioInputDevice, DeviceId};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Input port that plays a sine into the capture callback from its own
/// thread, one block every few milliseconds.
#[derive(Clone, Default)]
pub struct SinePort {
    pub frequency: f64,
    pub fail_open: bool,
    pub fail_close: Arc<AtomicBool>,
    pub opened: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
}

impl SinePort {
    pub fn new(frequency: f64) -> Self {
        Self {
            frequency,
            ..Self::default()
        }
    }
}

impl AudioInputPort for SinePort {
    fn list_inputs(&self) -> Result<Vec<AudioInputDevice>, AudioError> {
        Ok(vec![AudioInputDevice {
            id: DeviceId("sine".into()),
            name: "Sine".into(),
            default_config: AudioConfig {
                sample_rate_hz: 44_100,
                channels: 1,
                block_size_frames: 4096,
            },
        }])
    }

    fn open_input(
        &self,
        _device_id: Option<&DeviceId>,
        config: AudioConfig,
        mut cb: Box<dyn AudioCaptureCallback>,
    ) -> Result<Box<dyn AudioStreamHandle>, AudioError> {
        if self.fail_open {
            return Err(AudioError::DeviceUnavailable("busy".into()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);

        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let frequency = self.frequency;
        let handle = thread::spawn(move || {
            let block = config.block_size_frames as usize;
            let rate = config.sample_rate_hz as f64;
            let mut n = 0u64;
            let mut buf = vec![0.0f32; block];
            while !stop_flag.load(Ordering::SeqCst) {
                for sample in buf.iter_mut() {
                    let t = n as f64 / rate;
                    *sample = 0.5 * (2.0 * std::f64::consts::PI * frequency * t).sin() as f32;
                    n += 1;
                }
                cb.capture(&buf);
                thread::sleep(Duration::from_millis(5));
            }
        });

        Ok(Box::new(SineStream {
            stop,
            handle: Some(handle),
            fail_close: self.fail_close.clone(),
            closed: self.closed.clone(),
        }))
    }
}

struct SineStream {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
    fail_close: Arc<AtomicBool>,
    closed: Arc<AtomicUsize>,
}

impl AudioStreamHandle for SineStream {
    fn close(mut self: Box<Self>) -> Result<(), AudioError> {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(AudioError::Backend("close failed".into()));
        }
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
