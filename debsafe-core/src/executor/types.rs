use crate::index::PackageRecord;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutcomeStatus {
    Success,
    Failed,
    Skipped,
}

impl OutcomeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeStatus::Success => "success",
            OutcomeStatus::Failed => "failed",
            OutcomeStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who ran the install, as reported to the logging sink.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientIdentity {
    pub user: String,
    pub address: String,
}

#[derive(Clone, Debug)]
pub struct InstallOutcome {
    pub name: String,
    pub version: String,
    pub architecture: String,
    pub download_duration: Duration,
    pub bytes_downloaded: u64,
    pub install_duration: Duration,
    pub client: ClientIdentity,
    pub status: OutcomeStatus,
    pub download_status: OutcomeStatus,
    pub install_status: OutcomeStatus,
    pub error: Option<String>,
}

impl InstallOutcome {
    pub(crate) fn skipped(record: &PackageRecord, client: &ClientIdentity) -> Self {
        InstallOutcome {
            name: record.name.clone(),
            version: record.version.clone(),
            architecture: record.architecture.clone(),
            download_duration: Duration::ZERO,
            bytes_downloaded: 0,
            install_duration: Duration::ZERO,
            client: client.clone(),
            status: OutcomeStatus::Skipped,
            download_status: OutcomeStatus::Skipped,
            install_status: OutcomeStatus::Skipped,
            error: None,
        }
    }
}

/// Outcomes in plan order.
#[derive(Clone, Debug, Default)]
pub struct ExecutionReport {
    outcomes: Vec<InstallOutcome>,
}

impl ExecutionReport {
    pub(crate) fn new(outcomes: Vec<InstallOutcome>) -> Self {
        ExecutionReport { outcomes }
    }

    pub fn outcomes(&self) -> &[InstallOutcome] {
        &self.outcomes
    }

    fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn installed(&self) -> usize {
        self.count(OutcomeStatus::Success)
    }

    pub fn failed(&self) -> usize {
        self.count(OutcomeStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(OutcomeStatus::Skipped)
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn first_failure(&self) -> Option<&InstallOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.status == OutcomeStatus::Failed)
    }
}

#[derive(Default)]
struct CancelState {
    flag: AtomicBool,
    notify: Notify,
}

/// Shared cancellation flag, cheap to clone.
#[derive(Clone, Default)]
pub struct CancelSignal {
    state: Arc<CancelState>,
}

impl CancelSignal {
    pub fn new() -> Self {
        CancelSignal::default()
    }

    pub fn cancel(&self) {
        self.state.flag.store(true, Ordering::SeqCst);
        self.state.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.flag.load(Ordering::SeqCst)
    }

    pub async fn cancelled(&self) {
        loop {
            let notified = self.state.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
