use anyhow::Result;
use clap::Args;
use debsafe_core::{DebsafeConfig, console, operations};

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Text to look for in package names and descriptions
    pub query: String,
}

pub async fn run(args: SearchArgs, config: &DebsafeConfig) -> Result<()> {
    console::header("search");

    let hits = operations::search(config, &args.query).await?;

    if hits.is_empty() {
        console::info(&format!("No packages match \"{}\"", args.query));
        return Ok(());
    }

    for hit in &hits {
        let record = &hit.record;
        let mut line = format!(
            "{} {}",
            console::bold(&record.name),
            console::dim(&format!("{} [{}]", record.version, record.architecture))
        );
        if hit.blocked {
            line.push(' ');
            line.push_str(&console::blocked_tag());
        }
        console::info(&line);

        if let Some(description) = &record.description {
            console::info(&format!("  {description}"));
        }
    }

    if hits.len() == operations::search::SEARCH_LIMIT {
        println!();
        console::info(&console::dim(&format!(
            "Showing the first {} matches",
            operations::search::SEARCH_LIMIT
        )));
    }

    Ok(())
}
