pub mod info;
pub mod install;
pub mod login;
pub mod logout;
pub mod register;
pub mod search;
pub mod update;

use anyhow::Result;
use std::io::{self, BufRead, Write};

pub(crate) fn prompt_confirmation(question: &str) -> Result<bool> {
    println!();
    print!("{question} [y/N] ");
    io::stdout().flush()?;

    let stdin = io::stdin();
    let mut input = String::new();
    stdin.lock().read_line(&mut input)?;

    let response = input.trim().to_lowercase();
    Ok(response == "y" || response == "yes")
}
