use crate::commands;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "debsafe",
    about = "safe installer for Debian and Ubuntu packages",
    version,
    color = clap::ColorChoice::Auto
)]
pub struct Cli {
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Refresh the package index from the configured mirror
    Update(commands::update::UpdateArgs),
    /// Search package names and descriptions
    Search(commands::search::SearchArgs),
    /// Show details for a package
    Info(commands::info::InfoArgs),
    /// Resolve and install a package with its dependencies
    Install(commands::install::InstallArgs),
    /// Create an account on the download logging service and log in
    Register(commands::register::RegisterArgs),
    /// Log in to the download logging service
    Login(commands::login::LoginArgs),
    /// Remove stored credentials
    Logout(commands::logout::LogoutArgs),
}
