use mid2bar_ports::settings::PlayerSettings;
use mid2bar_ports::storage::{StorageError, StoragePort, TimelineSourcePort};
use mid2bar_ports::tables::{LyricLineRow, MarkerRow, NoteRow};
use std::fs;
use std::path::{Path, PathBuf};

pub struct FsStorage {
    base_dir: PathBuf,
}

impl FsStorage {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn default_base_dir() -> Result<PathBuf, StorageError> {
        let base = dirs_next::config_dir()
            .ok_or_else(|| StorageError::Io("config dir not found".to_string()))?;
        Ok(base.join("mid2bar"))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn settings_path(&self) -> PathBuf {
        self.base_dir.join("settings.json")
    }

    /// Reads settings from an explicit file instead of the base directory.
    pub fn load_settings_from(path: &Path) -> Result<PlayerSettings, StorageError> {
        Self::read_json(path)
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
        let data = fs::read(path)
            .map_err(|e| StorageError::Io(format!("{}: {e}", path.display())))?;
        serde_json::from_slice(&data)
            .map_err(|e| StorageError::Serde(format!("{}: {e}", path.display())))
    }

    fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
        }
        let data =
            serde_json::to_vec_pretty(value).map_err(|e| StorageError::Serde(e.to_string()))?;
        fs::write(path, data).map_err(|e| StorageError::Io(e.to_string()))
    }
}

impl Default for FsStorage {
    fn default() -> Self {
        let base_dir = Self::default_base_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self { base_dir }
    }
}

impl StoragePort for FsStorage {
    fn load_settings(&self) -> Result<PlayerSettings, StorageError> {
        let path = self.settings_path();
        if !path.exists() {
            log::debug!("{} not found, using default settings", path.display());
            return Ok(PlayerSettings::default());
        }
        Self::read_json(&path)
    }

    fn save_settings(&self, s: &PlayerSettings) -> Result<(), StorageError> {
        let path = self.settings_path();
        Self::write_json(&path, s)
    }
}

impl TimelineSourcePort for FsStorage {
    fn load_note_table(&self, path: &Path) -> Result<Vec<NoteRow>, StorageError> {
        Self::read_json(path)
    }

    fn load_marker_table(&self, path: &Path) -> Result<Vec<MarkerRow>, StorageError> {
        Self::read_json(path)
    }

    fn load_lyric_table(&self, path: &Path) -> Result<Vec<LyricLineRow>, StorageError> {
        Self::read_json(path)
    }
}
