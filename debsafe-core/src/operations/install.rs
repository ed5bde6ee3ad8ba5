use crate::console;
use crate::credentials::load_credentials;
use crate::executor::{CancelSignal, ClientIdentity, ExecutionReport, Executor, OutcomeStatus};
use crate::installed::InstalledSnapshot;
use crate::installer::DpkgInstaller;
use crate::repository::http_client;
use crate::resolve::{InstallPlan, Resolver, UnresolvedReason};
use crate::store::HttpFetcher;
use crate::telemetry::{LoggingClient, NullSink, OutcomeSink, detect_client_address};
use crate::{DebsafeConfig, Result};

#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    pub package: String,
    pub refresh: bool,
    pub dry_run: bool,
}

#[derive(Debug)]
pub struct InstallPreview {
    pub plan: InstallPlan,
    pub installed_version: Option<String>,
}

pub async fn plan_install(
    config: &DebsafeConfig,
    options: &InstallOptions,
) -> Result<InstallPreview> {
    let catalog = super::load_catalog(config, options.refresh).await?;
    let protected = super::protected_set(config);
    let installed = InstalledSnapshot::load().await;

    console::verbose(&format!(
        "resolving {} against {} packages ({} installed)",
        options.package,
        catalog.len(),
        installed.len()
    ));

    let plan = Resolver::new(&catalog, &protected, &config.architecture)
        .with_installed(&installed)
        .resolve(&options.package)?;

    Ok(InstallPreview {
        installed_version: installed
            .get(&options.package)
            .map(|package| package.version.clone()),
        plan,
    })
}

pub fn print_plan(plan: &InstallPlan) {
    for (position, record) in plan.entries().iter().enumerate() {
        console::planned(position + 1, &record.name, &record.version, &record.architecture);
    }

    for skip in plan.protected_skipped() {
        console::info(&format!(
            "{} {} {}",
            console::blocked_tag(),
            skip.name,
            console::dim(&format!("(required by {})", skip.dependent))
        ));
    }

    for satisfied in plan.already_satisfied() {
        console::verbose(&format!(
            "{} {} already installed",
            satisfied.name, satisfied.installed_version
        ));
    }

    for unresolved in plan.unresolved() {
        let note = match &unresolved.reason {
            UnresolvedReason::Missing => "not in the index",
            UnresolvedReason::NoMatchingVersion { .. } => "no matching version",
            UnresolvedReason::PlannedVersionMismatch { .. } => "conflicts with the planned version",
        };
        console::warn(&format!("{unresolved} ({note})"));
    }

    let size = plan.download_size();
    if size > 0 {
        console::step(&format!("{} to download", format_size(size)));
    }
}

pub fn print_report(report: &ExecutionReport) {
    for outcome in report.outcomes() {
        match outcome.status {
            OutcomeStatus::Success => console::installed(&outcome.name, &outcome.version),
            OutcomeStatus::Failed => console::failed(
                &outcome.name,
                &outcome.version,
                outcome.error.as_deref().unwrap_or("failed"),
            ),
            OutcomeStatus::Skipped => console::skipped(&outcome.name, &outcome.version),
        }
    }

    console::summary(
        report.installed(),
        report.failed(),
        report.skipped(),
        console::elapsed_secs(),
    );
}

pub async fn execute_plan(
    config: &DebsafeConfig,
    plan: &InstallPlan,
    cancel: &CancelSignal,
) -> Result<ExecutionReport> {
    let credentials = match load_credentials(&config.credentials_path()) {
        Ok(credentials) => credentials,
        Err(e) => {
            console::warn(&format!("ignoring stored credentials: {e}"));
            None
        }
    };

    let user = credentials
        .as_ref()
        .map(|c| c.username.clone())
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_else(|| "unknown".to_string());
    let client = ClientIdentity {
        user,
        address: detect_client_address(),
    };

    match credentials {
        Some(credentials) => {
            let sink = LoggingClient::new(&config.sink_url, &credentials.token)?;
            run_with(config, plan, cancel, sink, client).await
        }
        None => {
            console::verbose("not logged in, install outcomes will not be reported");
            run_with(config, plan, cancel, NullSink, client).await
        }
    }
}

async fn run_with<S: OutcomeSink>(
    config: &DebsafeConfig,
    plan: &InstallPlan,
    cancel: &CancelSignal,
    sink: S,
    client: ClientIdentity,
) -> Result<ExecutionReport> {
    let fetcher = HttpFetcher::new(http_client()?, &config.mirror);
    let installer = DpkgInstaller::new(config.install_command.clone());

    let report = Executor::new(fetcher, installer, sink, config.downloads_dir())
        .with_workers(config.download_workers)
        .with_client(client)
        .execute(plan, cancel)
        .await;

    console::clear_line();
    report
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "kB", "MB", "GB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_use_decimal_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1_500), "1.5 kB");
        assert_eq!(format_size(23_400_000), "23.4 MB");
    }
}
