//! Scratch-file helpers for in-flight recordings.
//!
//! The recorder writes each session to a scratch WAV under
//! ~/.local/share/aac-voice/temp/audio/ and deletes it after the bytes are
//! read back; nothing persists across runs.

use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

fn temp_audio_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("aac-voice")
        .join("temp")
        .join("audio")
}

/// Create the scratch directory if it doesn't exist.
pub fn create_temp_audio_dir() -> std::io::Result<PathBuf> {
    let dir = temp_audio_dir();
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Unique scratch path for one recording session.
pub fn generate_wav_path(session_id: Uuid) -> std::io::Result<PathBuf> {
    let dir = create_temp_audio_dir()?;
    Ok(dir.join(format!("{}.wav", session_id)))
}

/// Remove scratch files left behind by a crashed run.
pub fn cleanup_stale_recordings() -> std::io::Result<usize> {
    let dir = temp_audio_dir();
    if !dir.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in fs::read_dir(&dir)?.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.extension().map(|ext| ext == "wav").unwrap_or(false)
            && fs::remove_file(&path).is_ok()
        {
            log::debug!("Removed stale recording: {:?}", path);
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_path_contains_session_id() {
        let id = Uuid::new_v4();
        let path = generate_wav_path(id).unwrap();
        assert!(path.to_string_lossy().contains(&id.to_string()));
        assert!(path.extension().map(|e| e == "wav").unwrap_or(false));
    }

    #[test]
    fn temp_dir_is_app_scoped() {
        let dir = temp_audio_dir();
        let path_str = dir.to_string_lossy();
        assert!(path_str.contains("aac-voice"));
        assert!(path_str.contains("temp"));
    }
}
