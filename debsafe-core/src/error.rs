use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DebsafeError {
    #[error("package index unavailable: {reason}")]
    IndexUnavailable { reason: String },

    #[error("package {name} not found in the index")]
    PackageNotFound { name: String },

    #[error("refusing to install {name}: it is a protected system package")]
    ProtectedPackage { name: String },

    #[error("{first} conflicts with {second}: both provide the same library")]
    TransitionConflict { first: String, second: String },

    #[error("no candidate of {name} matches the target architecture (seen: {architectures})")]
    AmbiguousArchitecture { name: String, architectures: String },

    #[error("failed to download {name} {version}: {reason}")]
    DownloadFailed {
        name: String,
        version: String,
        reason: String,
    },

    #[error("failed to install {name} {version}: {reason}")]
    InstallFailed {
        name: String,
        version: String,
        reason: String,
    },

    #[error("operation cancelled before any package was installed")]
    Cancelled,

    #[error("HTTP request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("failed to build HTTP client: {source}")]
    HttpClient { source: reqwest::Error },

    #[error("Failed to read file {path:?}: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },

    #[error("Failed to write file {path:?}: {source}")]
    WriteFile { path: PathBuf, source: std::io::Error },

    #[error("Failed to decode cache {path:?}: {source}")]
    CacheDecode {
        path: PathBuf,
        source: bincode::Error,
    },

    #[error("Failed to parse JSON in {path:?}: {source}")]
    ParseJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to run {command}: {source}")]
    Process {
        command: String,
        source: std::io::Error,
    },

    #[error("authentication failed: {reason}")]
    Auth { reason: String },
}
