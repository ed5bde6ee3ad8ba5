use anyhow::{Result, anyhow, bail};
use clap::Args;
use debsafe_core::executor::CancelSignal;
use debsafe_core::operations::install::{print_plan, print_report};
use debsafe_core::{DebsafeConfig, console, operations};

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Package to install
    pub package: String,
    /// Skip confirmation prompt
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,
    /// Print the install plan without downloading anything
    #[arg(long = "dry-run")]
    pub dry_run: bool,
    /// Refresh the package index before resolving
    #[arg(long)]
    pub refresh: bool,
}

pub async fn run(args: InstallArgs, config: &DebsafeConfig) -> Result<()> {
    console::header("install");

    let options = operations::InstallOptions {
        package: args.package,
        refresh: args.refresh,
        dry_run: args.dry_run,
    };

    let preview = operations::plan_install(config, &options).await?;
    let plan = &preview.plan;

    if let Some(version) = &preview.installed_version {
        console::step(&format!("{} {} is currently installed", options.package, version));
    }

    if plan.is_empty() {
        console::info(&format!("{} is already up to date.", options.package));
        return Ok(());
    }

    console::step_with_count("Install plan", plan.len());
    print_plan(plan);

    if options.dry_run {
        println!();
        console::info("Dry run complete. Nothing was installed.");
        return Ok(());
    }

    if !args.yes {
        if !atty::is(atty::Stream::Stdin) {
            bail!("refusing to install without confirmation; pass --yes to proceed");
        }

        if !super::prompt_confirmation("Install these packages?")? {
            console::info("Aborted.");
            return Ok(());
        }
    }

    println!();

    let cancel = CancelSignal::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                console::clear_line();
                console::warn("interrupt received, cancelling");
                cancel.cancel();
            }
        })
    };

    let result = operations::execute_plan(config, plan, &cancel).await;
    watcher.abort();

    let report = result?;
    print_report(&report);

    match report.first_failure() {
        Some(failure) => Err(anyhow!(
            "{} {} failed: {}",
            failure.name,
            failure.version,
            failure.error.as_deref().unwrap_or("unknown error")
        )),
        None => Ok(()),
    }
}
