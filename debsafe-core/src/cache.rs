use crate::index::Catalog;
use crate::{DebsafeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const SNAPSHOT_FORMAT: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct CacheEntry {
    pub format: u32,
    pub fetched_at: i64,
    pub origins: Vec<String>,
    pub catalog: Catalog,
}

impl CacheEntry {
    pub fn new(catalog: Catalog, fetched_at: i64, origins: Vec<String>) -> Self {
        CacheEntry {
            format: SNAPSHOT_FORMAT,
            fetched_at,
            origins,
            catalog,
        }
    }
}

pub fn now_unix() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

pub fn is_fresh(fetched_at: i64, now: i64, ttl: Duration) -> bool {
    let age = now.saturating_sub(fetched_at);
    age >= 0 && (age as u64) < ttl.as_secs()
}

/// Reads a snapshot written by [`save_snapshot`]. A missing file or a
/// snapshot from another format version is `Ok(None)`.
pub fn load_snapshot(path: &Path) -> Result<Option<CacheEntry>> {
    if !path.is_file() {
        return Ok(None);
    }

    let data = fs::read(path).map_err(|source| DebsafeError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    let entry: CacheEntry =
        bincode::deserialize(&data).map_err(|source| DebsafeError::CacheDecode {
            path: path.to_path_buf(),
            source,
        })?;

    if entry.format != SNAPSHOT_FORMAT {
        debug!(
            "ignoring index snapshot {} with format {}",
            path.display(),
            entry.format
        );
        return Ok(None);
    }

    debug!(
        "loaded index snapshot {} ({} packages, fetched at {})",
        path.display(),
        entry.catalog.len(),
        entry.fetched_at
    );

    Ok(Some(entry))
}

/// Writes the snapshot to a temporary file next to `path` and renames it into
/// place, so readers never observe a partial file.
pub fn save_snapshot(path: &Path, entry: &CacheEntry) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    fs::create_dir_all(dir).map_err(|source| DebsafeError::WriteFile {
        path: dir.to_path_buf(),
        source,
    })?;

    let bytes = bincode::serialize(entry).map_err(|source| DebsafeError::CacheDecode {
        path: path.to_path_buf(),
        source,
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|source| {
        DebsafeError::WriteFile {
            path: dir.to_path_buf(),
            source,
        }
    })?;

    temp.write_all(&bytes)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|source| DebsafeError::WriteFile {
            path: temp.path().to_path_buf(),
            source,
        })?;

    temp.persist(path).map_err(|e| DebsafeError::WriteFile {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    debug!("saved index snapshot to {}", path.display());

    Ok(())
}
