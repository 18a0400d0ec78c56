use crate::types::*;

#[derive(thiserror::Error, Debug)]
pub enum AudioError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("unsupported config: {0}")]
    UnsupportedConfig(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Capture callback: runs on the device thread and must never block.
pub trait AudioCaptureCallback: Send + 'static {
    /// `block` is mono and `AudioConfig::block_size_frames` long.
    fn capture(&mut self, block: &[f32]);
}

pub trait AudioStreamHandle: Send {
    /// Stops the stream and releases the device.
    fn close(self: Box<Self>) -> Result<(), AudioError>;
}

pub trait AudioInputPort: Send + Sync {
    fn list_inputs(&self) -> Result<Vec<AudioInputDevice>, AudioError>;

    /// Opens `device_id`, or the host default input when `None`.
    fn open_input(
        &self,
        device_id: Option<&DeviceId>,
        config: AudioConfig,
        cb: Box<dyn AudioCaptureCallback>,
    ) -> Result<Box<dyn AudioStreamHandle>, AudioError>;
}
