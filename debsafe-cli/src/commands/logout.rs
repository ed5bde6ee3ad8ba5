use anyhow::Result;
use clap::Args;
use debsafe_core::{DebsafeConfig, console, operations};

#[derive(Args, Debug)]
pub struct LogoutArgs {}

pub async fn run(_args: LogoutArgs, config: &DebsafeConfig) -> Result<()> {
    console::header("logout");

    if operations::logout(config)? {
        console::info("Credentials removed successfully");
    } else {
        console::info("Not logged in");
    }

    Ok(())
}
