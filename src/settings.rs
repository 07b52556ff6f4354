use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::audio::sounds::SoundId;

/// Persisted user preferences: per-sound volumes, the default sleep-timer
/// length, and the last active mix for restore-on-launch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub volumes: HashMap<SoundId, f32>,
    pub timer_minutes: f32,
    pub last_mix: Vec<SoundId>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            volumes: HashMap::new(),
            timer_minutes: 0.0,
            last_mix: Vec::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

fn config_path() -> PathBuf {
    let mut dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.push("stillwave");
    dir.push("settings.toml");
    dir
}

impl Settings {
    /// Load settings, falling back to defaults when the file is missing or
    /// unreadable. Volumes are re-clamped: the file is user-editable.
    pub fn load() -> Self {
        let path = config_path();
        let mut settings = fs::read_to_string(&path)
            .ok()
            .and_then(|content| {
                toml::from_str::<Settings>(&content)
                    .map_err(|e| log::warn!("ignoring malformed {}: {}", path.display(), e))
                    .ok()
            })
            .unwrap_or_default();
        for volume in settings.volumes.values_mut() {
            *volume = volume.clamp(0.0, 1.0);
        }
        settings.timer_minutes = settings.timer_minutes.max(0.0);
        settings
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        let path = config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
