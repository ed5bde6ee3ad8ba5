use crate::index::PackageRecord;
use crate::{DebsafeError, Result};
use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::future::Future;
use std::path::Path;
use std::time::Instant;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

pub trait PackageFetcher: Send + Sync {
    /// Downloads `record` into `dest` and returns the number of bytes written.
    fn fetch(
        &self,
        record: &PackageRecord,
        dest: &Path,
    ) -> impl Future<Output = Result<u64>> + Send;
}

pub struct HttpFetcher {
    client: reqwest::Client,
    mirror: String,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client, mirror: &str) -> Self {
        HttpFetcher {
            client,
            mirror: mirror.trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, record: &PackageRecord) -> String {
        format!("{}/{}", self.mirror, record.filename.trim_start_matches('/'))
    }
}

impl PackageFetcher for HttpFetcher {
    async fn fetch(&self, record: &PackageRecord, dest: &Path) -> Result<u64> {
        let url = self.url_for(record);
        let started = Instant::now();

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|source| DebsafeError::Http {
                url: url.clone(),
                source,
            })?;

        let mut file = File::create(dest)
            .await
            .map_err(|source| DebsafeError::WriteFile {
                path: dest.to_path_buf(),
                source,
            })?;

        let mut hasher = Sha256::new();
        let mut written = 0u64;
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|source| DebsafeError::Http {
                url: url.clone(),
                source,
            })?;

            hasher.update(&chunk);
            file.write_all(&chunk)
                .await
                .map_err(|source| DebsafeError::WriteFile {
                    path: dest.to_path_buf(),
                    source,
                })?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(|source| DebsafeError::WriteFile {
            path: dest.to_path_buf(),
            source,
        })?;

        verify_digest(record, &hex::encode(hasher.finalize()))?;

        debug!(
            "downloaded {} ({} bytes) in {:.3}s",
            record,
            written,
            started.elapsed().as_secs_f64()
        );

        Ok(written)
    }
}

/// Checks a hex SHA256 digest against the one the index advertised. Records
/// without a digest always pass.
pub fn verify_digest(record: &PackageRecord, actual: &str) -> Result<()> {
    match record.sha256.as_deref() {
        Some(expected) if !expected.eq_ignore_ascii_case(actual) => {
            Err(DebsafeError::DownloadFailed {
                name: record.name.clone(),
                version: record.version.clone(),
                reason: format!("checksum mismatch: expected {expected}, got {actual}"),
            })
        }
        _ => Ok(()),
    }
}

/// Local file name for a downloaded package, `name_version_arch.deb` with the
/// epoch colon escaped the way apt does.
pub fn deb_file_name(record: &PackageRecord) -> String {
    format!(
        "{}_{}_{}.deb",
        record.name,
        record.version.replace(':', "%3a"),
        record.architecture
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(sha256: Option<&str>) -> PackageRecord {
        PackageRecord {
            name: "zstd".to_string(),
            version: "1:1.5.5+dfsg2-2".to_string(),
            architecture: "amd64".to_string(),
            filename: "/pool/main/libz/libzstd/zstd_1.5.5+dfsg2-2_amd64.deb".to_string(),
            depends: String::new(),
            pre_depends: String::new(),
            size: 0,
            sha256: sha256.map(String::from),
            essential: false,
            priority: None,
            section: None,
            description: None,
        }
    }

    #[test]
    fn digest_comparison_ignores_case() {
        let digest = hex::encode(Sha256::digest(b"payload"));

        assert!(verify_digest(&record(Some(&digest.to_uppercase())), &digest).is_ok());
        assert!(verify_digest(&record(None), &digest).is_ok());
        assert!(matches!(
            verify_digest(&record(Some("00ff")), &digest),
            Err(DebsafeError::DownloadFailed { .. })
        ));
    }

    #[test]
    fn file_name_escapes_epoch() {
        assert_eq!(
            deb_file_name(&record(None)),
            "zstd_1%3a1.5.5+dfsg2-2_amd64.deb"
        );
    }

    #[test]
    fn url_joins_mirror_and_filename() {
        let fetcher = HttpFetcher::new(reqwest::Client::new(), "http://deb.debian.org/debian/");

        assert_eq!(
            fetcher.url_for(&record(None)),
            "http://deb.debian.org/debian/pool/main/libz/libzstd/zstd_1.5.5+dfsg2-2_amd64.deb"
        );
    }
}
