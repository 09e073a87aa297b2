//! `swapguard check config`.

use std::path::Path;

use super::output::{self, OutputConfig};
use super::{init_logging, load_config};
use crate::infrastructure::config::settings::{StoreBackend, DATABASE_ENV};

/// Validate a configuration file and summarize the effective settings.
///
/// # Errors
///
/// Returns a diagnostic pointing into the file when it is unreadable,
/// malformed, or holds an out-of-range value.
pub fn execute_config(path: &Path, flags: OutputConfig) -> miette::Result<()> {
    let config = load_config(path)?;
    init_logging(&config, flags);

    output::section("Configuration Check");
    output::field("Config", path.display());
    output::success("Configuration file is valid");

    output::section("Summary");
    let confirmation = config.confirmation.settings();
    output::field("Session TTL", format!("{}s", confirmation.ttl.as_secs()));
    output::field("Reconfirms", confirmation.max_reconfirms);
    let locks = config.locks.ttls();
    output::field(
        "Lock TTLs",
        format!(
            "swap {}s, balance {}s, wallet {}s",
            locks.swap.as_secs(),
            locks.balance_mutation.as_secs(),
            locks.wallet_create.as_secs()
        ),
    );
    output::field(
        "Balance cache",
        format!(
            "{}ms{}",
            config.balance_cache.ttl_ms,
            if config.balance_cache.coalesce { ", coalesced" } else { "" }
        ),
    );
    let policy = config.rate_limit.policy();
    output::field(
        "Rate limit",
        format!("{} per {}s", policy.limit, policy.window.as_secs()),
    );
    output::field(
        "Exec timeout",
        format!("{}s", config.execution.timeout_secs),
    );
    output::field("Store", config.store.backend.as_str());

    match config.store.backend {
        StoreBackend::Sqlite => {
            output::field("Database", &config.store.database);
            if std::env::var(DATABASE_ENV).is_ok() {
                output::note(&format!("database path taken from {DATABASE_ENV}"));
            }
        }
        StoreBackend::Memory => {
            output::hint("the memory backend is per process; use sqlite when running replicas");
        }
    }

    if !config.logging.is_known_format() {
        output::warning(&format!(
            "unknown logging format '{}', falling back to pretty",
            config.logging.format
        ));
    }

    Ok(())
}
