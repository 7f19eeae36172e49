use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::speech::voice::DEFAULT_VOICE_LOCALE;

const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Transcription service endpoint; `None` uses the built-in default.
    pub service_url: Option<String>,

    /// Comma-separated recognition engine selector passed to the service.
    pub engine_selector: Option<String>,

    /// Locale filter for synthesis voice selection (substring match on the
    /// platform's voice locale tags).
    pub voice_locale: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_url: None,
            engine_selector: None,
            voice_locale: DEFAULT_VOICE_LOCALE.to_string(),
        }
    }
}

/// Default config location: <platform config dir>/aac-voice/config.json
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("aac-voice").join(CONFIG_FILE_NAME))
}

/// Load config from `path`, falling back to defaults on any failure.
pub fn load_config(path: &Path) -> AppConfig {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<AppConfig>(&contents) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Config: failed to parse {:?}: {}", path, e);
                AppConfig::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
        Err(e) => {
            log::warn!("Config: failed to read {:?}: {}", path, e);
            AppConfig::default()
        }
    }
}

pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory {:?}: {}", parent, e))?;
    }

    let contents =
        serde_json::to_string_pretty(config).map_err(|e| format!("Serialize config: {}", e))?;

    // Write atomically: write to a temp file in the same directory, then
    // rename. This prevents a partial/corrupt config.json on a crash.
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &contents)
        .map_err(|e| format!("Write temp config {:?}: {}", tmp_path, e))?;

    // On Unix, rename atomically replaces the destination. On Windows,
    // rename fails if the destination exists, so remove it first.
    if cfg!(windows) && path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                return Err(format!("Remove existing config file {:?}: {}", path, e));
            }
        }
    }

    std::fs::rename(&tmp_path, path)
        .map_err(|e| format!("Rename temp config {:?} to {:?}: {}", tmp_path, path, e))
}
