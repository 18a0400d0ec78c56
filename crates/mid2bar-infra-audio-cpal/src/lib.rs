use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BufferSize, SampleFormat, SampleRate, SizedSample, StreamConfig, SupportedStreamConfigRange,
};
use mid2bar_ports::audio::{AudioCaptureCallback, AudioError, AudioInputPort, AudioStreamHandle};
use mid2bar_ports::types::{AudioConfig, AudioInputDevice, DeviceId};
use std::sync::mpsc;
use std::thread;

pub struct CpalAudioInputPort {
    host: cpal::Host,
}

struct SelectedStreamConfig {
    config: StreamConfig,
    sample_format: SampleFormat,
}

impl CpalAudioInputPort {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    pub fn with_host(host: cpal::Host) -> Self {
        Self { host }
    }

    fn list_devices_from_host(
        host: &cpal::Host,
    ) -> Result<Vec<(DeviceId, cpal::Device)>, AudioError> {
        let host_id = format!("{:?}", host.id());
        let devices = host
            .input_devices()
            .map_err(|e| AudioError::Backend(e.to_string()))?;

        let mut list = Vec::new();
        for (index, device) in devices.enumerate() {
            let name = device.name().unwrap_or_else(|_| "Unknown Input".to_string());
            let id = DeviceId(format!("cpal:{}:{}:{}", host_id, index, name));
            list.push((id, device));
        }

        Ok(list)
    }

    fn find_device(
        host: &cpal::Host,
        device_id: Option<&DeviceId>,
    ) -> Result<cpal::Device, AudioError> {
        match device_id {
            None => host
                .default_input_device()
                .ok_or_else(|| AudioError::DeviceNotFound("default input".to_string())),
            Some(wanted) => Self::list_devices_from_host(host)?
                .into_iter()
                .find(|(id, _)| id == wanted)
                .map(|(_, device)| device)
                .ok_or_else(|| AudioError::DeviceNotFound(wanted.0.clone())),
        }
    }

    fn select_stream_config(
        device: &cpal::Device,
        desired: AudioConfig,
    ) -> Result<SelectedStreamConfig, AudioError> {
        let mut supported = device
            .supported_input_configs()
            .map_err(|e| AudioError::Backend(e.to_string()))?;

        let chosen = select_supported_config(&mut supported, desired)?;

        let sample_format = chosen.sample_format();
        let mut config = chosen.config();
        config.buffer_size = BufferSize::Default;

        Ok(SelectedStreamConfig {
            config,
            sample_format,
        })
    }
}

impl Default for CpalAudioInputPort {
    fn default() -> Self {
        Self::new()
    }
}

pub struct CpalAudioStreamHandle {
    stop_tx: mpsc::Sender<()>,
    join_handle: Option<thread::JoinHandle<()>>,
}

impl AudioStreamHandle for CpalAudioStreamHandle {
    fn close(mut self: Box<Self>) -> Result<(), AudioError> {
        let _ = self.stop_tx.send(());
        match self.join_handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| AudioError::Backend("input stream thread panicked".to_string())),
            None => Ok(()),
        }
    }
}

impl AudioInputPort for CpalAudioInputPort {
    fn list_inputs(&self) -> Result<Vec<AudioInputDevice>, AudioError> {
        let devices = Self::list_devices_from_host(&self.host)?;
        let mut results = Vec::new();

        for (id, device) in devices {
            let name = device.name().unwrap_or_else(|_| "Unknown Input".to_string());
            let default_config = match device.default_input_config() {
                Ok(config) => config,
                Err(err) => {
                    log::debug!("skipping input {name}: {err}");
                    continue;
                }
            };

            results.push(AudioInputDevice {
                id,
                name,
                default_config: AudioConfig {
                    sample_rate_hz: default_config.sample_rate().0,
                    channels: default_config.channels(),
                    block_size_frames: 0,
                },
            });
        }

        Ok(results)
    }

    fn open_input(
        &self,
        device_id: Option<&DeviceId>,
        config: AudioConfig,
        cb: Box<dyn AudioCaptureCallback>,
    ) -> Result<Box<dyn AudioStreamHandle>, AudioError> {
        let device_id = device_id.cloned();
        let desired = config;
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        // cpal streams are not Send on every host, so the stream lives and
        // dies on its own thread.
        let join_handle = thread::Builder::new()
            .name("cpal-input".to_string())
            .spawn(move || {
                let host = cpal::default_host();
                let device = match Self::find_device(&host, device_id.as_ref()) {
                    Ok(device) => device,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };

                let stream_config = match Self::select_stream_config(&device, desired) {
                    Ok(config) => config,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };

                let reblocker = Reblocker::new(
                    stream_config.config.channels as usize,
                    desired.block_size_frames as usize,
                    cb,
                );
                let stream = match stream_config.sample_format {
                    SampleFormat::F32 => {
                        build_input::<f32>(&device, &stream_config.config, reblocker, |s| s)
                    }
                    SampleFormat::I16 => {
                        build_input::<i16>(&device, &stream_config.config, reblocker, i16_to_f32)
                    }
                    SampleFormat::U16 => {
                        build_input::<u16>(&device, &stream_config.config, reblocker, u16_to_f32)
                    }
                    _ => Err(cpal::BuildStreamError::StreamConfigNotSupported),
                };

                let stream = match stream {
                    Ok(stream) => stream,
                    Err(err) => {
                        let _ = ready_tx.send(Err(AudioError::Backend(err.to_string())));
                        return;
                    }
                };

                if let Err(err) = stream.play() {
                    let _ = ready_tx.send(Err(AudioError::Backend(err.to_string())));
                    return;
                }

                log::info!(
                    "input stream open ({} Hz, {} ch, {:?})",
                    stream_config.config.sample_rate.0,
                    stream_config.config.channels,
                    stream_config.sample_format
                );
                let _ = ready_tx.send(Ok(()));
                let _ = stop_rx.recv();
                if let Err(err) = stream.pause() {
                    log::warn!("input stream pause failed: {err}");
                }
                drop(stream);
            })
            .map_err(|e| AudioError::Backend(e.to_string()))?;

        match ready_rx
            .recv()
            .map_err(|e| AudioError::Backend(e.to_string()))?
        {
            Ok(()) => Ok(Box::new(CpalAudioStreamHandle {
                stop_tx,
                join_handle: Some(join_handle),
            })),
            Err(err) => {
                let _ = join_handle.join();
                Err(err)
            }
        }
    }
}

fn build_input<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut reblocker: Reblocker,
    convert: fn(T) -> f32,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + 'static,
{
    device.build_input_stream(
        config,
        move |data: &[T], _info: &cpal::InputCallbackInfo| {
            reblocker.push_interleaved(data, convert);
        },
        |err| log::error!("cpal input stream error: {err}"),
        None,
    )
}

/// Prefers the requested channel count, then float samples. The sample rate
/// must be supported as requested.
pub fn select_supported_config(
    supported: &mut dyn Iterator<Item = SupportedStreamConfigRange>,
    desired: AudioConfig,
) -> Result<cpal::SupportedStreamConfig, AudioError> {
    let mut best: Option<cpal::SupportedStreamConfig> = None;
    let mut best_score: i32 = -1;

    for config_range in supported {
        if config_range.channels() == 0 {
            continue;
        }
        let min = config_range.min_sample_rate().0;
        let max = config_range.max_sample_rate().0;
        if desired.sample_rate_hz < min || desired.sample_rate_hz > max {
            continue;
        }

        let mut score = match config_range.sample_format() {
            SampleFormat::F32 => 3,
            SampleFormat::I16 => 2,
            SampleFormat::U16 => 1,
            _ => continue,
        };
        if config_range.channels() == desired.channels {
            score += 10;
        }

        if score > best_score {
            best = Some(config_range.with_sample_rate(SampleRate(desired.sample_rate_hz)));
            best_score = score;
        }
    }

    best.ok_or_else(|| AudioError::UnsupportedConfig("no matching input config".to_string()))
}

/// Downmixes interleaved device buffers to mono and collects fixed-size
/// blocks for the capture callback.
pub struct Reblocker {
    channels: usize,
    block: Vec<f32>,
    block_size: usize,
    cb: Box<dyn AudioCaptureCallback>,
}

impl Reblocker {
    pub fn new(channels: usize, block_size: usize, cb: Box<dyn AudioCaptureCallback>) -> Self {
        let block_size = block_size.max(1);
        Self {
            channels: channels.max(1),
            block: Vec::with_capacity(block_size),
            block_size,
            cb,
        }
    }

    pub fn push_interleaved<T: Copy>(&mut self, data: &[T], convert: fn(T) -> f32) {
        for frame in data.chunks_exact(self.channels) {
            let sum: f32 = frame.iter().map(|s| convert(*s)).sum();
            self.block.push(sum / self.channels as f32);
            if self.block.len() == self.block_size {
                self.cb.capture(&self.block);
                self.block.clear();
            }
        }
    }

    pub fn pending(&self) -> usize {
        self.block.len()
    }
}

pub fn i16_to_f32(value: i16) -> f32 {
    value as f32 / 32768.0
}

pub fn u16_to_f32(value: u16) -> f32 {
    (value as f32 - 32768.0) / 32768.0
}
