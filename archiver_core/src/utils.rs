// archiver_core/src/utils.rs

//! Utility functions shared by the archives and reports.
//! Includes atomic file writes, JSON helpers and rounding.

use std::io::Write;
use anyhow::Context;

/// Writes `contents` to `path` atomically: the data goes to a temporary file
/// in the same directory which is then renamed over the target, so readers
/// never observe a partially written file.
///
/// # Arguments
/// * `path` - Final location of the file. Parent directories are created.
/// * `contents` - Complete file contents.
///
/// # Returns
/// * `anyhow::Result<()>` indicating success or failure.
pub fn write_atomic(path: &std::path::Path, contents: &str) -> anyhow::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create directory '{}'", dir.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)
        .with_context(|| format!("Failed to create temporary file in '{}'", dir.display()))?;
    tmp.write_all(contents.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path)
        .map_err(|e| anyhow::anyhow!("Failed to write '{}': {}", path.display(), e.error))?;

    anyhow::Ok(())
}

/// Serializes `value` as pretty JSON (two-space indentation).
pub fn to_pretty_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| anyhow::anyhow!("Failed to serialize JSON: {}", e))
}

/// Atomically writes `value` as pretty JSON to `path`.
pub fn write_json<T: serde::Serialize + ?Sized>(path: &std::path::Path, value: &T) -> anyhow::Result<()> {
    write_atomic(path, &to_pretty_json(value)?)
}

/// Reads a JSON document, returning `None` when the file does not exist.
pub fn read_json<T: serde::de::DeserializeOwned>(path: &std::path::Path) -> anyhow::Result<Option<T>> {
    if !path.exists() {
        return anyhow::Ok(None);
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    let value = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse JSON in '{}'", path.display()))?;

    anyhow::Ok(Some(value))
}

/// Rounds to `decimals` places after the point.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10.0_f64.powi(decimals);
    (value * factor).round() / factor
}
