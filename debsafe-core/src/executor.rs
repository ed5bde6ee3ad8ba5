pub mod types;

pub use types::{CancelSignal, ClientIdentity, ExecutionReport, InstallOutcome, OutcomeStatus};

use crate::console;
use crate::index::PackageRecord;
use crate::installer::SystemInstaller;
use crate::resolve::InstallPlan;
use crate::store::{PackageFetcher, deb_file_name};
use crate::telemetry::OutcomeSink;
use crate::{DebsafeError, Result};
use futures::StreamExt;
use futures::stream;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

struct Downloaded {
    index: usize,
    path: PathBuf,
    elapsed: Duration,
    result: Result<u64>,
}

/// Downloads plan entries concurrently and installs them one at a time, in
/// plan order. The first failure stops the run; later entries are skipped.
pub struct Executor<F, I, S> {
    fetcher: F,
    installer: I,
    sink: S,
    workers: usize,
    download_dir: PathBuf,
    client: ClientIdentity,
}

impl<F, I, S> Executor<F, I, S>
where
    F: PackageFetcher,
    I: SystemInstaller,
    S: OutcomeSink,
{
    pub fn new(fetcher: F, installer: I, sink: S, download_dir: PathBuf) -> Self {
        Executor {
            fetcher,
            installer,
            sink,
            workers: crate::config::DEFAULT_DOWNLOAD_WORKERS,
            download_dir,
            client: ClientIdentity::default(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_client(mut self, client: ClientIdentity) -> Self {
        self.client = client;
        self
    }

    pub async fn execute(
        &self,
        plan: &InstallPlan,
        cancel: &CancelSignal,
    ) -> Result<ExecutionReport> {
        let entries = plan.entries();

        if entries.is_empty() {
            return Ok(ExecutionReport::default());
        }

        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|source| DebsafeError::WriteFile {
                path: self.download_dir.clone(),
                source,
            })?;

        let result = self.run(entries, cancel).await;

        for record in entries {
            discard(&self.download_dir.join(deb_file_name(record))).await;
        }

        let outcomes = result?;
        self.sink.flush().await;

        Ok(ExecutionReport::new(outcomes))
    }

    async fn run(
        &self,
        entries: &[PackageRecord],
        cancel: &CancelSignal,
    ) -> Result<Vec<InstallOutcome>> {
        let total = entries.len();
        let (tx, mut rx) = mpsc::channel::<Downloaded>(self.workers);

        let producer = async {
            let mut done = 0;
            let mut downloads = stream::iter(entries.iter().enumerate())
                .map(|(index, record)| self.download(index, record))
                .buffer_unordered(self.workers);

            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    next = downloads.next() => {
                        let Some(item) = next else { break };
                        done += 1;
                        console::progress("📦", "downloading packages", done, total);
                        if tx.send(item).await.is_err() {
                            break;
                        }
                    }
                }
            }

            drop(tx);
        };

        let consumer = async move {
            let mut pending: BTreeMap<usize, Downloaded> = BTreeMap::new();
            let mut outcomes = Vec::with_capacity(total);
            let mut committed = false;
            let mut warned = false;

            while outcomes.len() < total {
                let index = outcomes.len();
                let record = &entries[index];

                let item = loop {
                    if let Some(item) = pending.remove(&index) {
                        break item;
                    }

                    tokio::select! {
                        _ = cancel.cancelled(), if !committed => {
                            return Err(DebsafeError::Cancelled);
                        }
                        received = rx.recv() => match received {
                            Some(item) => {
                                pending.insert(item.index, item);
                            }
                            None => {
                                return Err(DebsafeError::DownloadFailed {
                                    name: record.name.clone(),
                                    version: record.version.clone(),
                                    reason: "download was abandoned".to_string(),
                                });
                            }
                        }
                    }
                };

                if cancel.is_cancelled() {
                    if !committed {
                        return Err(DebsafeError::Cancelled);
                    }
                    if !warned {
                        warn!(
                            "cancellation ignored: packages are already installed, \
                             finishing the plan"
                        );
                        warned = true;
                    }
                }

                committed = true;
                let outcome = self.install(record, item).await;
                let failed = outcome.status == OutcomeStatus::Failed;

                self.sink.report(&outcome);
                outcomes.push(outcome);

                if failed {
                    break;
                }
            }

            rx.close();
            console::clear_line();

            for record in &entries[outcomes.len()..] {
                let outcome = InstallOutcome::skipped(record, &self.client);
                self.sink.report(&outcome);
                outcomes.push(outcome);
            }

            Ok(outcomes)
        };

        let ((), outcomes) = tokio::join!(producer, consumer);
        outcomes
    }

    async fn download(&self, index: usize, record: &PackageRecord) -> Downloaded {
        let path = self.download_dir.join(deb_file_name(record));
        let started = Instant::now();
        let result = self.fetcher.fetch(record, &path).await;

        Downloaded {
            index,
            path,
            elapsed: started.elapsed(),
            result,
        }
    }

    async fn install(&self, record: &PackageRecord, item: Downloaded) -> InstallOutcome {
        let mut outcome = InstallOutcome {
            download_duration: item.elapsed,
            download_status: OutcomeStatus::Success,
            ..InstallOutcome::skipped(record, &self.client)
        };

        let bytes = match item.result {
            Ok(bytes) => bytes,
            Err(e) => {
                let error = download_error(record, e);
                warn!("{error}");
                outcome.status = OutcomeStatus::Failed;
                outcome.download_status = OutcomeStatus::Failed;
                outcome.error = Some(error.to_string());
                discard(&item.path).await;
                return outcome;
            }
        };

        outcome.bytes_downloaded = bytes;
        console::clear_line();
        console::step(&format!("installing {record}"));

        let started = Instant::now();
        let installed = self.installer.install(record, &item.path).await;
        outcome.install_duration = started.elapsed();
        discard(&item.path).await;

        match installed {
            Ok(()) => {
                info!(
                    "installed {} in {:.2}s",
                    record,
                    outcome.install_duration.as_secs_f64()
                );
                outcome.status = OutcomeStatus::Success;
                outcome.install_status = OutcomeStatus::Success;
            }
            Err(e) => {
                warn!("{e}");
                outcome.status = OutcomeStatus::Failed;
                outcome.install_status = OutcomeStatus::Failed;
                outcome.error = Some(e.to_string());
            }
        }

        outcome
    }
}

fn download_error(record: &PackageRecord, error: DebsafeError) -> DebsafeError {
    match error {
        DebsafeError::DownloadFailed { .. } => error,
        other => DebsafeError::DownloadFailed {
            name: record.name.clone(),
            version: record.version.clone(),
            reason: other.to_string(),
        },
    }
}

async fn discard(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => debug!("could not remove {}: {e}", path.display()),
    }
}
