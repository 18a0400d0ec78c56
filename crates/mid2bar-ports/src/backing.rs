use crate::types::{Seconds, Volume100};

#[derive(thiserror::Error, Debug)]
pub enum BackingTrackError {
    #[error("load failed: {0}")]
    Load(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// The backing audio file player. Decoding and output live outside the core;
/// the core only drives transport and volume.
pub trait BackingTrackPort: Send {
    fn duration(&self) -> Seconds;
    fn play_from(&mut self, position: Seconds) -> Result<(), BackingTrackError>;
    fn pause(&mut self) -> Result<(), BackingTrackError>;
    fn resume(&mut self) -> Result<(), BackingTrackError>;
    fn stop(&mut self) -> Result<(), BackingTrackError>;
    fn set_volume(&mut self, volume: Volume100) -> Result<(), BackingTrackError>;
}

/// Silent stand-in used when no audio output is wired up.
#[derive(Clone, Copy, Debug)]
pub struct SilentBackingTrack {
    duration: Seconds,
}

impl SilentBackingTrack {
    pub fn new(duration: Seconds) -> Self {
        Self {
            duration: duration.max(0.0),
        }
    }
}

impl BackingTrackPort for SilentBackingTrack {
    fn duration(&self) -> Seconds {
        self.duration
    }

    fn play_from(&mut self, _position: Seconds) -> Result<(), BackingTrackError> {
        Ok(())
    }

    fn pause(&mut self) -> Result<(), BackingTrackError> {
        Ok(())
    }

    fn resume(&mut self) -> Result<(), BackingTrackError> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BackingTrackError> {
        Ok(())
    }

    fn set_volume(&mut self, _volume: Volume100) -> Result<(), BackingTrackError> {
        Ok(())
    }
}
