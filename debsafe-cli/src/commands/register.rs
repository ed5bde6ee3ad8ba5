use anyhow::{Result, anyhow};
use clap::Args;
use debsafe_core::{DebsafeConfig, console, operations};

#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Account name to create on the logging service
    pub username: String,
    /// Password to use. If omitted, debsafe will prompt for it twice.
    #[arg(long)]
    pub password: Option<String>,
}

pub async fn run(args: RegisterArgs, config: &DebsafeConfig) -> Result<()> {
    console::header("register");

    let password = match args.password {
        Some(password) => password,
        None => {
            console::info(&format!("Creating an account on {}", config.sink_url));
            let password = rpassword::prompt_password("Password: ")?;
            let confirmation = rpassword::prompt_password("Repeat password: ")?;
            if password != confirmation {
                return Err(anyhow!("passwords do not match"));
            }
            password
        }
    };

    if password.is_empty() {
        return Err(anyhow!("password cannot be empty"));
    }

    let credentials = operations::register(config, &args.username, &password).await?;

    console::info(&format!("Registered and logged in as {}", credentials.username));
    Ok(())
}
