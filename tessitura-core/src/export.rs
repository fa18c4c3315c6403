//! Writing the recorded take to disk.

use std::fs;
use std::path::{Path, PathBuf};

use tessitura_audio::RecordedTake;
use tessitura_types::SessionState;

use crate::error::SessionError;

/// `3m-Jazz-AcidJazz-120bpm-CMajor.wav`
pub fn export_file_name(session: &SessionState) -> String {
    let squash = |s: &str| s.split_whitespace().collect::<String>();
    format!(
        "{}m-{}-{}-{}bpm-{}.wav",
        session.transport.max_duration_minutes,
        session.settings.genre,
        squash(&session.settings.style),
        session.settings.bpm,
        squash(&session.settings.key),
    )
}

/// Write `take` into `dir` (created if missing). Returns the file's path.
pub fn write_take(take: &RecordedTake, session: &SessionState, dir: &Path) -> Result<PathBuf, SessionError> {
    fs::create_dir_all(dir).map_err(|e| SessionError::Export(e.to_string()))?;
    let path = dir.join(export_file_name(session));
    fs::write(&path, &take.wav).map_err(|e| SessionError::Export(e.to_string()))?;
    log::info!(target: "session", "exported {}", path.display());
    Ok(path)
}
