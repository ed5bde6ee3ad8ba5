use crate::index::PackageRecord;
use crate::{DebsafeError, Result};
use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, info};

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

pub trait SystemInstaller: Send + Sync {
    fn install(
        &self,
        record: &PackageRecord,
        file: &Path,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Installs `.deb` files by running a dpkg command line with the file
/// appended. There is no timeout; a heartbeat is logged while it runs.
pub struct DpkgInstaller {
    command: Vec<String>,
    heartbeat: Duration,
}

impl DpkgInstaller {
    pub fn new(command: Vec<String>) -> Self {
        DpkgInstaller {
            command,
            heartbeat: HEARTBEAT_INTERVAL,
        }
    }

    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }
}

impl SystemInstaller for DpkgInstaller {
    async fn install(&self, record: &PackageRecord, file: &Path) -> Result<()> {
        let failed = |reason: String| DebsafeError::InstallFailed {
            name: record.name.clone(),
            version: record.version.clone(),
            reason,
        };

        let Some((program, args)) = self.command.split_first() else {
            return Err(failed("install command is empty".to_string()));
        };

        let command_line = format!("{} {}", self.command.join(" "), file.display());
        debug!("running {command_line}");

        let child = Command::new(program)
            .args(args)
            .arg(file)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DebsafeError::Process {
                command: command_line.clone(),
                source,
            })?;

        let started = Instant::now();
        let mut ticker = tokio::time::interval(self.heartbeat);
        ticker.tick().await;

        let wait = child.wait_with_output();
        tokio::pin!(wait);

        let output = loop {
            tokio::select! {
                output = &mut wait => {
                    break output.map_err(|source| DebsafeError::Process {
                        command: command_line.clone(),
                        source,
                    })?;
                }
                _ = ticker.tick() => {
                    info!(
                        "still installing {} ({}s elapsed)",
                        record.name,
                        started.elapsed().as_secs()
                    );
                }
            }
        };

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = stderr
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .unwrap_or("no output");

        Err(failed(format!("{} ({})", output.status, detail.trim())))
    }
}
