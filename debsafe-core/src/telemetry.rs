use crate::config::SINK_TIMEOUT;
use crate::executor::InstallOutcome;
use crate::{DebsafeError, Result};
use futures::future::join_all;
use serde::Serialize;
use std::future::Future;
use std::net::UdpSocket;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const ATTEMPTS: usize = 2;

pub trait OutcomeSink: Send + Sync {
    /// Queues one outcome. Never blocks the caller and never fails.
    fn report(&self, outcome: &InstallOutcome);

    /// Waits for every queued report to finish or give up.
    fn flush(&self) -> impl Future<Output = ()> + Send;
}

/// Sink used when no credentials are stored.
pub struct NullSink;

impl OutcomeSink for NullSink {
    fn report(&self, outcome: &InstallOutcome) {
        debug!("not logging outcome for {} (signed out)", outcome.name);
    }

    async fn flush(&self) {}
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LogRecord {
    pub user_id: String,
    pub package_name: String,
    pub version: String,
    pub download_duration_seconds: f64,
    pub install_duration_seconds: f64,
    pub client_ip: String,
    pub download_status: String,
    pub install_status: String,
}

impl From<&InstallOutcome> for LogRecord {
    fn from(outcome: &InstallOutcome) -> Self {
        LogRecord {
            user_id: outcome.client.user.clone(),
            package_name: outcome.name.clone(),
            version: outcome.version.clone(),
            download_duration_seconds: round_secs(outcome.download_duration),
            install_duration_seconds: round_secs(outcome.install_duration),
            client_ip: outcome.client.address.clone(),
            download_status: outcome.download_status.as_str().to_string(),
            install_status: outcome.install_status.as_str().to_string(),
        }
    }
}

fn round_secs(duration: Duration) -> f64 {
    (duration.as_secs_f64() * 100.0).round() / 100.0
}

/// Posts outcomes to the logging sink. Each report runs as its own task with
/// a bounded timeout and one retry; failures are logged and dropped.
pub struct LoggingClient {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    timeout: Duration,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl LoggingClient {
    pub fn new(sink_url: &str, token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(SINK_TIMEOUT)
            .build()
            .map_err(|source| DebsafeError::HttpClient { source })?;

        Ok(LoggingClient {
            client,
            endpoint: format!("{}/api/log-download", sink_url.trim_end_matches('/')),
            token: token.to_string(),
            timeout: SINK_TIMEOUT,
            tasks: Mutex::new(Vec::new()),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl OutcomeSink for LoggingClient {
    fn report(&self, outcome: &InstallOutcome) {
        let record = LogRecord::from(outcome);
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let token = self.token.clone();
        let timeout = self.timeout;

        let handle = tokio::spawn(async move {
            let mut last_error = String::new();

            for attempt in 1..=ATTEMPTS {
                let request = client
                    .post(&endpoint)
                    .bearer_auth(&token)
                    .json(&record)
                    .send();

                match tokio::time::timeout(timeout, request).await {
                    Ok(Ok(response)) if response.status().is_success() => {
                        debug!("logged outcome for {}", record.package_name);
                        return;
                    }
                    Ok(Ok(response)) => last_error = format!("sink returned {}", response.status()),
                    Ok(Err(e)) => last_error = e.to_string(),
                    Err(_) => last_error = format!("timed out after {}s", timeout.as_secs_f32()),
                }

                debug!(
                    "log attempt {attempt} for {} failed: {last_error}",
                    record.package_name
                );
            }

            warn!(
                "could not log outcome for {}: {last_error}",
                record.package_name
            );
        });

        match self.tasks.lock() {
            Ok(mut tasks) => tasks.push(handle),
            Err(poisoned) => poisoned.into_inner().push(handle),
        }
    }

    async fn flush(&self) {
        let handles = match self.tasks.lock() {
            Ok(mut tasks) => std::mem::take(&mut *tasks),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };

        for result in join_all(handles).await {
            if let Err(e) = result {
                warn!("logging task failed: {e}");
            }
        }
    }
}

/// Address of the interface that routes to the internet. Connecting a UDP
/// socket sends no packets.
pub fn detect_client_address() -> String {
    UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect("8.8.8.8:80")?;
            socket.local_addr()
        })
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|_| "127.0.0.1".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ClientIdentity, OutcomeStatus};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    fn outcome() -> InstallOutcome {
        InstallOutcome {
            name: "curl".to_string(),
            version: "8.5.0-2".to_string(),
            architecture: "amd64".to_string(),
            download_duration: Duration::from_millis(1234),
            bytes_downloaded: 4096,
            install_duration: Duration::from_millis(5678),
            client: ClientIdentity {
                user: "alice".to_string(),
                address: "10.0.0.5".to_string(),
            },
            status: OutcomeStatus::Success,
            download_status: OutcomeStatus::Success,
            install_status: OutcomeStatus::Success,
            error: None,
        }
    }

    // Accepts connections, answers each with `status`, and forwards raw requests.
    async fn spawn_sink(status: &'static str) -> (String, mpsc::UnboundedReceiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let tx = tx.clone();
                tokio::spawn(async move {
                    let mut buffer = Vec::new();
                    let mut chunk = [0u8; 1024];
                    loop {
                        let n = socket.read(&mut chunk).await.unwrap_or(0);
                        if n == 0 {
                            break;
                        }
                        buffer.extend_from_slice(&chunk[..n]);
                        let text = String::from_utf8_lossy(&buffer).to_string();
                        if let Some(end) = text.find("\r\n\r\n") {
                            let length = text[..end]
                                .lines()
                                .find_map(|line| {
                                    let (key, value) = line.split_once(':')?;
                                    key.eq_ignore_ascii_case("content-length")
                                        .then(|| value.trim().parse::<usize>().ok())
                                        .flatten()
                                })
                                .unwrap_or(0);
                            if buffer.len() >= end + 4 + length {
                                break;
                            }
                        }
                    }
                    let _ = tx.send(String::from_utf8_lossy(&buffer).to_string());
                    let response = format!(
                        "HTTP/1.1 {status}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });

        (format!("http://{addr}"), rx)
    }

    #[test]
    fn record_rounds_durations() {
        let record = LogRecord::from(&outcome());
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["user_id"], "alice");
        assert_eq!(json["download_duration_seconds"], 1.23);
        assert_eq!(json["install_duration_seconds"], 5.68);
        assert_eq!(json["client_ip"], "10.0.0.5");
        assert_eq!(json["download_status"], "success");
    }

    #[tokio::test]
    async fn posts_outcome_with_bearer_token() {
        let (url, mut requests) = spawn_sink("200 OK").await;
        let client = LoggingClient::new(&url, "secret-token").unwrap();

        client.report(&outcome());
        client.flush().await;

        let request = requests.recv().await.unwrap();
        assert!(request.starts_with("POST /api/log-download"));
        assert!(request.to_lowercase().contains("authorization: bearer secret-token"));
        assert!(request.contains("\"package_name\":\"curl\""));
    }

    #[tokio::test]
    async fn retries_once_then_gives_up() {
        let (url, mut requests) = spawn_sink("500 Internal Server Error").await;
        let client = LoggingClient::new(&url, "token").unwrap();

        client.report(&outcome());
        client.flush().await;

        assert!(requests.recv().await.is_some());
        assert!(requests.recv().await.is_some());
        assert!(requests.try_recv().is_err());
    }

    #[tokio::test]
    async fn unreachable_sink_does_not_fail() {
        let client = LoggingClient::new("http://127.0.0.1:9", "token")
            .unwrap()
            .with_timeout(Duration::from_millis(200));

        client.report(&outcome());
        client.flush().await;
    }
}
