use crate::settings::PlayerSettings;
use crate::tables::{LyricLineRow, MarkerRow, NoteRow};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serde(String),
}

pub trait StoragePort: Send + Sync {
    fn load_settings(&self) -> Result<PlayerSettings, StorageError>;
    fn save_settings(&self, s: &PlayerSettings) -> Result<(), StorageError>;
}

pub trait TimelineSourcePort: Send + Sync {
    fn load_note_table(&self, path: &Path) -> Result<Vec<NoteRow>, StorageError>;
    fn load_marker_table(&self, path: &Path) -> Result<Vec<MarkerRow>, StorageError>;
    fn load_lyric_table(&self, path: &Path) -> Result<Vec<LyricLineRow>, StorageError>;
}
