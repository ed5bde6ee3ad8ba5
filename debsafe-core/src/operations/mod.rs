pub mod auth;
pub mod install;
pub mod search;
pub mod update;

pub use auth::{login, logout, register};
pub use install::{InstallOptions, InstallPreview, execute_plan, plan_install};
pub use search::{PackageInfo, SearchHit, info, search};
pub use update::update;

use crate::index::{Catalog, IndexStore};
use crate::protected::ProtectedSet;
use crate::repository::{HttpRepository, http_client};
use crate::{DebsafeConfig, Result};
use std::sync::Arc;

pub fn index_store(config: &DebsafeConfig) -> Result<IndexStore<HttpRepository>> {
    let repository = HttpRepository::from_config(config, http_client()?);
    Ok(IndexStore::new(
        repository,
        config.index_cache_path(),
        config.cache_ttl,
    ))
}

pub async fn load_catalog(config: &DebsafeConfig, refresh: bool) -> Result<Arc<Catalog>> {
    index_store(config)?.get_catalog(refresh).await
}

pub fn protected_set(config: &DebsafeConfig) -> ProtectedSet {
    ProtectedSet::system().with_essential(config.protect_essential)
}
