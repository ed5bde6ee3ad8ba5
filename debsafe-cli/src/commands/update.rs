use anyhow::Result;
use clap::Args;
use debsafe_core::{DebsafeConfig, console, operations};

#[derive(Args, Debug)]
pub struct UpdateArgs {}

pub async fn run(_args: UpdateArgs, config: &DebsafeConfig) -> Result<()> {
    console::header("update");

    operations::update(config).await?;

    console::info(&format!(
        "Index updated {}",
        console::dim(&format!("[{:.2}s]", console::elapsed_secs()))
    ));
    Ok(())
}
