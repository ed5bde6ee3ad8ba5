pub mod stanza;
pub mod types;

pub use stanza::{ParsedIndex, parse_index};
pub use types::{Catalog, PackageRecord};

use crate::cache::{self, CacheEntry};
use crate::{DebsafeError, Result};
use flate2::read::GzDecoder;
use std::future::Future;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// One raw index document as served by the repository. Gzip-compressed
/// bodies are detected by their magic bytes.
#[derive(Debug, Clone)]
pub struct IndexDocument {
    pub origin: String,
    pub body: Vec<u8>,
}

pub trait IndexSource: Send + Sync {
    /// Fetches every configured index document. Returns an error only when
    /// nothing could be fetched.
    fn fetch(&self) -> impl Future<Output = Result<Vec<IndexDocument>>> + Send;
}

struct Snapshot {
    catalog: Arc<Catalog>,
    fetched_at: i64,
}

pub struct IndexStore<S> {
    source: S,
    cache_path: PathBuf,
    ttl: Duration,
    current: Mutex<Option<Snapshot>>,
}

impl<S: IndexSource> IndexStore<S> {
    pub fn new(source: S, cache_path: PathBuf, ttl: Duration) -> Self {
        IndexStore {
            source,
            cache_path,
            ttl,
            current: Mutex::new(None),
        }
    }

    /// Returns the catalog, fetching it when there is no valid cached copy or
    /// when `force_refresh` is set. A failed fetch falls back to any cached
    /// catalog, even an expired one.
    pub async fn get_catalog(&self, force_refresh: bool) -> Result<Arc<Catalog>> {
        let mut current = self.current.lock().await;

        if current.is_none() {
            match cache::load_snapshot(&self.cache_path) {
                Ok(Some(entry)) => {
                    *current = Some(Snapshot {
                        catalog: Arc::new(entry.catalog),
                        fetched_at: entry.fetched_at,
                    });
                }
                Ok(None) => {}
                Err(e) => warn!("ignoring unreadable index cache: {e}"),
            }
        }

        if !force_refresh
            && let Some(snapshot) = current.as_ref()
            && cache::is_fresh(snapshot.fetched_at, cache::now_unix(), self.ttl)
        {
            debug!("using cached index fetched at {}", snapshot.fetched_at);
            return Ok(snapshot.catalog.clone());
        }

        match self.fetch_catalog().await {
            Ok(entry) => {
                if let Err(e) = cache::save_snapshot(&self.cache_path, &entry) {
                    warn!("failed to persist index cache: {e}");
                }

                let catalog = Arc::new(entry.catalog);
                *current = Some(Snapshot {
                    catalog: catalog.clone(),
                    fetched_at: entry.fetched_at,
                });
                Ok(catalog)
            }
            Err(e) => match current.as_ref() {
                Some(stale) => {
                    warn!(
                        "index refresh failed ({e}); using cached index from {}",
                        stale.fetched_at
                    );
                    Ok(stale.catalog.clone())
                }
                None => Err(match e {
                    DebsafeError::IndexUnavailable { .. } => e,
                    other => DebsafeError::IndexUnavailable {
                        reason: other.to_string(),
                    },
                }),
            },
        }
    }

    pub async fn refresh_index(&self) -> Result<Arc<Catalog>> {
        self.get_catalog(true).await
    }

    async fn fetch_catalog(&self) -> Result<CacheEntry> {
        let documents = self.source.fetch().await?;
        let mut records = Vec::new();
        let mut origins = Vec::new();
        let mut skipped = 0;

        for document in documents {
            match decode_document(&document.body) {
                Ok(text) => {
                    let parsed = parse_index(&text);
                    debug!(
                        "parsed {} records from {} ({} skipped)",
                        parsed.records.len(),
                        document.origin,
                        parsed.skipped
                    );
                    skipped += parsed.skipped;
                    records.extend(parsed.records);
                    origins.push(document.origin);
                }
                Err(e) => warn!("failed to decompress {}: {e}", document.origin),
            }
        }

        if origins.is_empty() {
            return Err(DebsafeError::IndexUnavailable {
                reason: "no index document could be decoded".to_string(),
            });
        }

        let catalog = Catalog::from_records(records);
        info!(
            "indexed {} packages ({} records, {} stanzas skipped) from {} document(s)",
            catalog.len(),
            catalog.record_count(),
            skipped,
            origins.len()
        );

        Ok(CacheEntry::new(catalog, cache::now_unix(), origins))
    }
}

pub fn decode_document(body: &[u8]) -> std::io::Result<String> {
    if body.starts_with(&[0x1f, 0x8b]) {
        let mut text = String::new();
        GzDecoder::new(body).read_to_string(&mut text)?;
        Ok(text)
    } else {
        String::from_utf8(body.to_vec())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
