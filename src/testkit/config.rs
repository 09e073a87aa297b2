//! Canonical test configurations.
//!
//! Single source of truth for config structs used across tests.

use std::path::Path;

use crate::infrastructure::config::settings::{Config, StoreBackend};

/// Defaults with a wide rate limit, so tests that are not about rate
/// limiting never trip it.
pub fn relaxed() -> Config {
    let mut config = Config::default();
    config.rate_limit.limit = 1_000;
    config
}

/// [`relaxed`] backed by a SQLite file at `path`.
pub fn sqlite(path: &Path) -> Config {
    let mut config = relaxed();
    config.store.backend = StoreBackend::Sqlite;
    config.store.database = path.display().to_string();
    config
}
