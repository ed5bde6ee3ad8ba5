use crate::config::SINK_TIMEOUT;
use crate::credentials::{self, Credentials};
use crate::{DebsafeConfig, DebsafeError, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct LoginBody<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    username: &'a str,
    password: &'a str,
    role: &'static str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

pub async fn login(config: &DebsafeConfig, username: &str, password: &str) -> Result<Credentials> {
    let username = validate(username, password)?;

    let token = request_token(&config.sink_url, username, password).await?;
    let credentials = Credentials {
        username: username.to_string(),
        token,
    };

    let path = config.credentials_path();
    credentials::save_credentials(&path, &credentials)?;
    crate::console::verbose(&format!("saved credentials to {}", path.display()));

    Ok(credentials)
}

/// Creates an account on the logging service, then logs in with it.
pub async fn register(
    config: &DebsafeConfig,
    username: &str,
    password: &str,
) -> Result<Credentials> {
    let username = validate(username, password)?;

    request_registration(&config.sink_url, username, password).await?;
    crate::console::verbose(&format!("registered {username}"));

    login(config, username, password).await
}

pub fn logout(config: &DebsafeConfig) -> Result<bool> {
    credentials::remove_credentials(&config.credentials_path())
}

fn validate<'a>(username: &'a str, password: &str) -> Result<&'a str> {
    let username = username.trim();
    if username.is_empty() {
        return Err(DebsafeError::Auth {
            reason: "username is required".into(),
        });
    }

    if password.is_empty() {
        return Err(DebsafeError::Auth {
            reason: "password is required".into(),
        });
    }

    Ok(username)
}

fn sink_client() -> Result<Client> {
    Client::builder()
        .timeout(SINK_TIMEOUT)
        .build()
        .map_err(|source| DebsafeError::HttpClient { source })
}

async fn rejection(action: &str, response: reqwest::Response, fallback: &str) -> DebsafeError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let reason = serde_json::from_str::<ErrorResponse>(&body)
        .ok()
        .and_then(|data| data.error)
        .unwrap_or_else(|| fallback.to_string());

    DebsafeError::Auth {
        reason: format!("{action} failed ({status}): {reason}"),
    }
}

/// Exchanges a username and password for a sink token.
pub async fn request_token(sink_url: &str, username: &str, password: &str) -> Result<String> {
    let client = sink_client()?;
    let endpoint = format!("{}/login-cli", sink_url.trim_end_matches('/'));

    crate::console::verbose(&format!("logging in as {username} at {endpoint}"));

    let response = client
        .post(&endpoint)
        .json(&LoginBody { username, password })
        .send()
        .await
        .map_err(|source| DebsafeError::Http {
            url: endpoint.clone(),
            source,
        })?;

    if !response.status().is_success() {
        return Err(rejection("login", response, "invalid credentials").await);
    }

    let data: LoginResponse = response.json().await.map_err(|source| DebsafeError::Http {
        url: endpoint,
        source,
    })?;

    data.token
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| DebsafeError::Auth {
            reason: "no token in response".into(),
        })
}

/// Asks the sink to create a regular user account. Only `201 Created`
/// counts as success.
pub async fn request_registration(sink_url: &str, username: &str, password: &str) -> Result<()> {
    let client = sink_client()?;
    let endpoint = format!("{}/register", sink_url.trim_end_matches('/'));

    crate::console::verbose(&format!("registering {username} at {endpoint}"));

    let response = client
        .post(&endpoint)
        .json(&RegisterBody {
            username,
            password,
            role: "user",
        })
        .send()
        .await
        .map_err(|source| DebsafeError::Http {
            url: endpoint.clone(),
            source,
        })?;

    if response.status() != StatusCode::CREATED {
        return Err(rejection("registration", response, "unknown error").await);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    // Serves a single response and returns the raw request it received.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let (url, handle) = serve_sequence(vec![(status, body)]).await;
        let handle = tokio::spawn(async move { handle.await.unwrap().remove(0) });
        (url, handle)
    }

    // Answers one connection per response, in order, and returns the raw
    // requests.
    async fn serve_sequence(
        responses: Vec<(&'static str, &'static str)>,
    ) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for (status, body) in responses {
                requests.push(answer(&listener, status, body).await);
            }
            requests
        });

        (format!("http://{addr}"), handle)
    }

    async fn answer(listener: &TcpListener, status: &str, body: &str) -> String {
        let (mut socket, _) = listener.accept().await.unwrap();
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
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\n\
             content-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        String::from_utf8_lossy(&buffer).to_string()
    }

    fn config(sink_url: &str, data_dir: &std::path::Path) -> DebsafeConfig {
        DebsafeConfig {
            cache_dir: data_dir.join("cache"),
            data_dir: data_dir.to_path_buf(),
            distro: crate::platform::parse_os_release("ID=debian\nVERSION_CODENAME=bookworm\n"),
            mirror: "http://deb.debian.org/debian".to_string(),
            suite: "bookworm".to_string(),
            components: vec!["main".to_string()],
            architecture: "amd64".to_string(),
            cache_ttl: crate::config::DEFAULT_CACHE_TTL,
            download_workers: 1,
            sink_url: sink_url.to_string(),
            install_command: crate::config::default_install_command(),
            protect_essential: true,
            verbose: false,
        }
    }

    #[tokio::test]
    async fn returns_token_on_success() {
        let (url, request) = serve_once("200 OK", r#"{"token":"abc.def"}"#).await;

        let token = request_token(&url, "alice", "hunter2").await.unwrap();

        assert_eq!(token, "abc.def");
        let request = request.await.unwrap();
        assert!(request.starts_with("POST /login-cli"));
        assert!(request.contains(r#""username":"alice""#));
        assert!(request.contains(r#""password":"hunter2""#));
    }

    #[tokio::test]
    async fn rejected_login_carries_sink_error() {
        let (url, _request) =
            serve_once("401 Unauthorized", r#"{"error":"Invalid password"}"#).await;

        match request_token(&url, "alice", "wrong").await {
            Err(DebsafeError::Auth { reason }) => assert!(reason.contains("Invalid password")),
            other => panic!("expected auth error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_token_is_an_error() {
        let (url, _request) = serve_once("200 OK", "{}").await;

        assert!(matches!(
            request_token(&url, "alice", "hunter2").await,
            Err(DebsafeError::Auth { .. })
        ));
    }

    #[tokio::test]
    async fn registration_posts_user_role() {
        let (url, request) = serve_once("201 Created", r#"{"message":"created"}"#).await;

        request_registration(&url, "bob", "s3cret").await.unwrap();

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /register"));
        assert!(request.contains(r#""username":"bob""#));
        assert!(request.contains(r#""role":"user""#));
    }

    #[tokio::test]
    async fn registration_requires_created_status() {
        let (url, _request) = serve_once("200 OK", "{}").await;

        assert!(matches!(
            request_registration(&url, "bob", "s3cret").await,
            Err(DebsafeError::Auth { .. })
        ));
    }

    #[tokio::test]
    async fn duplicate_registration_carries_sink_error() {
        let (url, _request) =
            serve_once("409 Conflict", r#"{"error":"Username already exists"}"#).await;

        match request_registration(&url, "bob", "s3cret").await {
            Err(DebsafeError::Auth { reason }) => {
                assert!(reason.contains("Username already exists"))
            }
            other => panic!("expected auth error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn register_then_logs_in_and_stores_token() {
        let dir = tempfile::tempdir().unwrap();
        let (url, requests) = serve_sequence(vec![
            ("201 Created", r#"{"message":"created"}"#),
            ("200 OK", r#"{"token":"fresh-token"}"#),
        ])
        .await;
        let config = config(&url, dir.path());

        let credentials = register(&config, "bob", "s3cret").await.unwrap();

        assert_eq!(credentials.token, "fresh-token");
        let requests = requests.await.unwrap();
        assert!(requests[0].starts_with("POST /register"));
        assert!(requests[1].starts_with("POST /login-cli"));
        assert_eq!(
            credentials::load_credentials(&config.credentials_path()).unwrap(),
            Some(credentials)
        );
    }

    #[test]
    fn blank_username_is_rejected() {
        assert!(matches!(validate("  ", "pw"), Err(DebsafeError::Auth { .. })));
        assert!(matches!(validate("bob", ""), Err(DebsafeError::Auth { .. })));
        assert_eq!(validate(" bob ", "pw").unwrap(), "bob");
    }
}
