use anyhow::Result;
use clap::Args;
use debsafe_core::{DebsafeConfig, console, operations};

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Package name
    pub name: String,
}

pub async fn run(args: InfoArgs, config: &DebsafeConfig) -> Result<()> {
    console::header("info");

    let info = operations::info(config, &args.name).await?;
    let record = &info.record;

    console::info(&console::bold(&record.name));
    field("version", &record.version);
    field("architecture", &record.architecture);
    field("priority", record.priority.as_deref().unwrap_or("unknown"));
    field("section", record.section.as_deref().unwrap_or("unknown"));
    field("size", &format!("{} bytes", record.size));
    field("depends", or_none(&record.depends));
    if !record.pre_depends.is_empty() {
        field("pre-depends", &record.pre_depends);
    }
    field(
        "protected",
        if info.blocked { "yes, installation is refused" } else { "no" },
    );
    field(
        "installed",
        info.installed_version.as_deref().unwrap_or("no"),
    );

    if !info.other_versions.is_empty() {
        field("also available", &info.other_versions.join(", "));
    }

    if let Some(description) = &record.description {
        println!();
        console::info(&format!("  {description}"));
    }

    Ok(())
}

fn field(label: &str, value: &str) {
    console::info(&format!("  {}: {}", console::dim(label), value));
}

fn or_none(value: &str) -> &str {
    if value.is_empty() { "none" } else { value }
}
