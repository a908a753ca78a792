//! Core catalogue storage for CardHolder.
//! This crate is the single source of truth for catalogue invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod seed;
pub mod service;

pub use config::CoreConfig;
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::{
    AppFlag, CollectibleItem, ItemId, ItemSet, ItemSetId, ItemSort, ListKind, RarityTier,
    ValidationError,
};
pub use notify::{ChangeEvent, LiveQuery, QuerySnapshot, Subscription, SubscriptionId};
pub use repo::{
    CatalogRepository, FlagRepository, ItemSetListQuery, RepoError, RepoResult,
    SqliteCatalogRepository,
};
pub use seed::{MockImageSource, NoMockImages};
pub use service::catalog_service::{CatalogError, CatalogResult, CatalogService, MissingEntity};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
