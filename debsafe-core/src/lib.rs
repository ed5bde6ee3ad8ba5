pub mod cache;
pub mod config;
pub mod console;
pub mod credentials;
pub mod depends;
pub mod error;
pub mod executor;
pub mod index;
pub mod installed;
pub mod installer;
pub mod operations;
pub mod platform;
pub mod protected;
pub mod repository;
pub mod resolve;
pub mod store;
pub mod telemetry;

pub use config::DebsafeConfig;
pub use error::DebsafeError;
pub use index::{Catalog, PackageRecord};
pub use resolve::{InstallPlan, Resolver};

pub type Result<T> = std::result::Result<T, DebsafeError>;
