use anyhow::{Result, anyhow};
use clap::Args;
use debsafe_core::{DebsafeConfig, console, operations};

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account name on the logging service
    pub username: String,
    /// Password to use. If omitted, debsafe will prompt for it.
    #[arg(long)]
    pub password: Option<String>,
}

pub async fn run(args: LoginArgs, config: &DebsafeConfig) -> Result<()> {
    console::header("login");

    let password = match args.password {
        Some(password) => password,
        None => {
            console::info(&format!("Logging in to {}", config.sink_url));
            rpassword::prompt_password("Password: ")?
        }
    };

    if password.is_empty() {
        return Err(anyhow!("password cannot be empty"));
    }

    let credentials = operations::login(config, &args.username, &password).await?;

    console::info(&format!("Logged in as {}", credentials.username));
    Ok(())
}
