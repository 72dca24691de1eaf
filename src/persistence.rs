// File: src/persistence.rs
use crate::error::Result;
use chrono::Local;
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Writes `value` as pretty JSON to `path` without ever leaving a half-written
/// file behind: the document goes to a temp file in the same directory and is
/// then renamed over the target.
pub fn save_json_atomic<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let parent_dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent_dir)?;

    let mut temp_file = NamedTempFile::new_in(parent_dir)?;
    {
        let mut writer = BufWriter::new(temp_file.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
    }
    temp_file.as_file().sync_all()?;
    temp_file.persist(path).map_err(|e| e.error)?;

    debug!(path = %path.display(), "wrote document");
    Ok(())
}

/// Same temp-file-then-rename write for plain text.
pub fn write_text_atomic(text: &str, path: &Path) -> Result<()> {
    let parent_dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent_dir)?;

    let mut temp_file = NamedTempFile::new_in(parent_dir)?;
    temp_file.write_all(text.as_bytes())?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Reads a whole file, mapping "not found" to `None`.
pub fn read_if_exists(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Copies `value` into a timestamped snapshot file under `dir`, e.g.
/// `translation_glossary_backup_20250101_120000_123.json`.
pub fn write_snapshot<T: Serialize>(value: &T, dir: &Path, stem: &str) -> Result<PathBuf> {
    let stamp = Local::now().format("%Y%m%d_%H%M%S_%3f");
    let path = dir.join(format!("{stem}_backup_{stamp}.json"));
    save_json_atomic(value, &path)?;
    Ok(path)
}
