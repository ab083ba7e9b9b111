//! Atomic file replacement: temp file in the target directory, fsync, rename.
//!
//! Readers racing a writer observe either the old file or the new one, never a
//! partial write. The temp file lives next to the target so the rename never
//! crosses a filesystem boundary.

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;

#[cfg(target_os = "windows")]
use std::{thread, time::Duration};

/// Atomically replace `path` with `content`, creating parent directories.
pub fn write_file_atomic(path: &Utf8Path, content: &str) -> Result<()> {
    write_bytes_atomic(path, content.as_bytes())
}

/// Byte-exact variant of [`write_file_atomic`]. Used for copying artifacts.
pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create parent directory: {parent}"))?;

    let mut temp_file = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in: {parent}"))?;
    temp_file
        .write_all(content)
        .with_context(|| "Failed to write content to temporary file")?;
    temp_file
        .as_file()
        .sync_all()
        .with_context(|| "Failed to fsync temporary file")?;

    persist(temp_file, path).with_context(|| format!("Failed to atomically write file: {path}"))
}

#[cfg(not(target_os = "windows"))]
fn persist(temp_file: NamedTempFile, target: &Utf8Path) -> Result<()> {
    temp_file
        .persist(target.as_std_path())
        .map(|_| ())
        .map_err(|e| anyhow::anyhow!(e.error))
}

/// Windows can refuse the rename while another process holds the target open;
/// retry briefly with backoff (at most ~150ms in total).
#[cfg(target_os = "windows")]
fn persist(mut temp_file: NamedTempFile, target: &Utf8Path) -> Result<()> {
    use std::io::ErrorKind;

    const MAX_RETRIES: u32 = 4;
    let mut delay_ms = 10;

    for attempt in 0..=MAX_RETRIES {
        match temp_file.persist(target.as_std_path()) {
            Ok(_) => return Ok(()),
            Err(err) => {
                let retryable = err.error.kind() == ErrorKind::PermissionDenied;
                if !retryable || attempt == MAX_RETRIES {
                    return Err(anyhow::anyhow!(err.error));
                }
                temp_file = err.file;
                thread::sleep(Duration::from_millis(delay_ms));
                delay_ms *= 2;
            }
        }
    }
    unreachable!("loop returns on the final attempt")
}
