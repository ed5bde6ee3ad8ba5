use anyhow::Result;
use clap::Parser;
use debsafe_core::{DebsafeConfig, console};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();
    let mut config = DebsafeConfig::from_env();
    config.verbose |= args.verbose;

    init_tracing(config.verbose);
    console::set_verbose(config.verbose);

    match dispatch(args.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            console::error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(command: Command, config: &DebsafeConfig) -> Result<()> {
    match command {
        Command::Update(args) => commands::update::run(args, config).await,
        Command::Search(args) => commands::search::run(args, config).await,
        Command::Info(args) => commands::info::run(args, config).await,
        Command::Install(args) => commands::install::run(args, config).await,
        Command::Register(args) => commands::register::run(args, config).await,
        Command::Login(args) => commands::login::run(args, config).await,
        Command::Logout(args) => commands::logout::run(args, config).await,
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
