use crate::config::{DebsafeConfig, FETCH_TIMEOUT};
use crate::index::{IndexDocument, IndexSource};
use crate::{DebsafeError, Result};
use futures::future::join_all;
use std::time::Instant;
use tracing::{debug, warn};

pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .user_agent(concat!("debsafe/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|source| DebsafeError::HttpClient { source })
}

/// Index source backed by a Debian mirror. Each component's `Packages.gz` is
/// requested concurrently.
pub struct HttpRepository {
    client: reqwest::Client,
    index_urls: Vec<(String, String)>,
}

impl HttpRepository {
    pub fn new(client: reqwest::Client, index_urls: Vec<(String, String)>) -> Self {
        HttpRepository { client, index_urls }
    }

    pub fn from_config(config: &DebsafeConfig, client: reqwest::Client) -> Self {
        HttpRepository::new(client, config.index_urls())
    }

    async fn fetch_component(&self, component: &str, url: &str) -> Result<IndexDocument> {
        let started = Instant::now();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| DebsafeError::Http {
                url: url.to_string(),
                source,
            })?;

        let body = response
            .error_for_status()
            .map_err(|source| DebsafeError::Http {
                url: url.to_string(),
                source,
            })?
            .bytes()
            .await
            .map_err(|source| DebsafeError::Http {
                url: url.to_string(),
                source,
            })?;

        debug!(
            "fetched {} index ({} bytes) in {:.3}s",
            component,
            body.len(),
            started.elapsed().as_secs_f64()
        );

        Ok(IndexDocument {
            origin: url.to_string(),
            body: body.to_vec(),
        })
    }
}

impl IndexSource for HttpRepository {
    async fn fetch(&self) -> Result<Vec<IndexDocument>> {
        let fetches = self
            .index_urls
            .iter()
            .map(|(component, url)| self.fetch_component(component, url));

        let mut documents = Vec::new();
        let mut last_error = None;

        for ((component, _), result) in self.index_urls.iter().zip(join_all(fetches).await) {
            match result {
                Ok(document) => documents.push(document),
                Err(e) => {
                    warn!("failed to fetch {component} index: {e}");
                    last_error = Some(e);
                }
            }
        }

        if documents.is_empty() {
            return Err(match last_error {
                Some(e) => e,
                None => DebsafeError::IndexUnavailable {
                    reason: "no repository components configured".to_string(),
                },
            });
        }

        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const BODY: &str = "Package: a\nVersion: 1.0\nArchitecture: amd64\nFilename: pool/a.deb\n";

    // Serves `BODY` for paths containing `/main/` and 404 for everything else.
    async fn spawn_mirror() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let mut buffer = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !String::from_utf8_lossy(&buffer).contains("\r\n\r\n") {
                        let n = socket.read(&mut chunk).await.unwrap_or(0);
                        if n == 0 {
                            break;
                        }
                        buffer.extend_from_slice(&chunk[..n]);
                    }

                    let request = String::from_utf8_lossy(&buffer).to_string();
                    let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                    let (status, body) = if path.contains("/main/") {
                        ("200 OK", BODY)
                    } else {
                        ("404 Not Found", "")
                    };
                    let response = format!(
                        "HTTP/1.1 {status}\r\ncontent-length: {}\r\n\
                         connection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });

        format!("http://{addr}")
    }

    fn urls(mirror: &str, components: &[&str]) -> Vec<(String, String)> {
        components
            .iter()
            .map(|component| {
                (
                    component.to_string(),
                    format!("{mirror}/dists/bookworm/{component}/binary-amd64/Packages.gz"),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn missing_component_does_not_fail_the_fetch() {
        let mirror = spawn_mirror().await;
        let repository =
            HttpRepository::new(http_client().unwrap(), urls(&mirror, &["main", "contrib"]));

        let documents = repository.fetch().await.unwrap();

        assert_eq!(documents.len(), 1);
        assert!(documents[0].origin.contains("/main/"));
        assert_eq!(documents[0].body, BODY.as_bytes());
    }

    #[tokio::test]
    async fn every_component_failing_is_an_error() {
        let mirror = spawn_mirror().await;
        let repository =
            HttpRepository::new(http_client().unwrap(), urls(&mirror, &["contrib", "non-free"]));

        assert!(matches!(
            repository.fetch().await,
            Err(DebsafeError::Http { .. })
        ));
    }
}
