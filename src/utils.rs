use crate::error::{Result, StorageError};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Write `data` to `dest` so that readers see either the old state or the
/// complete new file, never a partial one.
///
/// The bytes go to a temp file in the destination directory which is then
/// renamed over `dest`. On any failure the temp file is removed.
pub fn write_atomic(dest: &Path, data: &[u8]) -> Result<PathBuf> {
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if dest.file_name().is_none() {
        return Err(StorageError::Io(format!(
            "destination has no file name: {}",
            dest.display()
        )));
    }

    std::fs::create_dir_all(&parent)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".signvault-")
        .suffix(".part")
        .tempfile_in(&parent)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest)
        .map_err(|e| StorageError::Io(format!("rename to {}: {}", dest.display(), e.error)))?;

    Ok(dest.to_path_buf())
}

/// Async wrapper that keeps the blocking file I/O off the runtime threads.
pub async fn write_atomic_async(dest: PathBuf, data: Vec<u8>) -> Result<PathBuf> {
    tokio::task::spawn_blocking(move || write_atomic(&dest, &data))
        .await
        .map_err(|e| StorageError::Internal(format!("write task failed: {}", e)))?
}
