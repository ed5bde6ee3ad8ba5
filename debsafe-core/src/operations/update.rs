use crate::console;
use crate::index::Catalog;
use crate::{DebsafeConfig, Result};
use std::sync::Arc;

pub async fn update(config: &DebsafeConfig) -> Result<Arc<Catalog>> {
    console::step(&format!(
        "Fetching {} {} ({}) from {}",
        config.suite,
        config.components.join(", "),
        config.architecture,
        config.mirror
    ));

    let catalog = super::index_store(config)?.refresh_index().await?;

    console::step_with_count("Indexed packages", catalog.len());
    console::verbose(&format!(
        "index cached at {}",
        config.index_cache_path().display()
    ));

    Ok(catalog)
}
