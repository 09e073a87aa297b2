//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all pipeline settings.
//! Configuration is loaded from a TOML file; every section has defaults, so
//! an empty file is a valid configuration. The `SWAPGUARD_DATABASE`
//! environment variable overrides `[store].database`.
//!
//! # Example
//!
//! ```no_run
//! use swapguard::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use super::logging::LoggingConfig;
use crate::application::orchestration::{ExecutionPolicy, LockTtls};
use crate::error::{ConfigError, Result};
use crate::port::outbound::store::{ConfirmationSettings, RateLimitPolicy};

/// Environment variable overriding the SQLite database path.
pub const DATABASE_ENV: &str = "SWAPGUARD_DATABASE";

/// Upper bound for every configured TTL.
const MAX_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Confirmation session lifetime and reconfirm cap.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConfirmationConfig {
    #[serde(default = "default_confirmation_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_max_reconfirms")]
    pub max_reconfirms: u32,
}

fn default_confirmation_ttl_secs() -> u64 {
    60
}

fn default_max_reconfirms() -> u32 {
    1
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_confirmation_ttl_secs(),
            max_reconfirms: default_max_reconfirms(),
        }
    }
}

impl ConfirmationConfig {
    #[must_use]
    pub fn settings(&self) -> ConfirmationSettings {
        ConfirmationSettings {
            ttl: Duration::from_secs(self.ttl_secs),
            max_reconfirms: self.max_reconfirms,
        }
    }
}

/// Lease TTL per operation class.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LockConfig {
    #[serde(default = "default_swap_ttl_secs")]
    pub swap_ttl_secs: u64,
    #[serde(default = "default_balance_mutation_ttl_secs")]
    pub balance_mutation_ttl_secs: u64,
    #[serde(default = "default_wallet_create_ttl_secs")]
    pub wallet_create_ttl_secs: u64,
}

fn default_swap_ttl_secs() -> u64 {
    60
}

fn default_balance_mutation_ttl_secs() -> u64 {
    900
}

fn default_wallet_create_ttl_secs() -> u64 {
    120
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            swap_ttl_secs: default_swap_ttl_secs(),
            balance_mutation_ttl_secs: default_balance_mutation_ttl_secs(),
            wallet_create_ttl_secs: default_wallet_create_ttl_secs(),
        }
    }
}

impl LockConfig {
    #[must_use]
    pub fn ttls(&self) -> LockTtls {
        LockTtls {
            swap: Duration::from_secs(self.swap_ttl_secs),
            balance_mutation: Duration::from_secs(self.balance_mutation_ttl_secs),
            wallet_create: Duration::from_secs(self.wallet_create_ttl_secs),
        }
    }
}

/// Balance cache freshness window.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BalanceCacheConfig {
    #[serde(default = "default_balance_ttl_ms")]
    pub ttl_ms: u64,
    /// Share one in-flight fetch between concurrent readers of a key.
    #[serde(default = "default_coalesce")]
    pub coalesce: bool,
}

fn default_balance_ttl_ms() -> u64 {
    10_000
}

fn default_coalesce() -> bool {
    true
}

impl Default for BalanceCacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_balance_ttl_ms(),
            coalesce: default_coalesce(),
        }
    }
}

impl BalanceCacheConfig {
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

/// Fixed-window request limit applied to both entry points.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_limit")]
    pub limit: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_rate_limit() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: default_rate_limit(),
            window_secs: default_window_secs(),
        }
    }
}

impl RateLimitConfig {
    #[must_use]
    pub fn policy(&self) -> RateLimitPolicy {
        RateLimitPolicy {
            limit: self.limit,
            window: Duration::from_secs(self.window_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExecutionConfig {
    /// Upper bound on a single executor call.
    #[serde(default = "default_execution_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_execution_timeout_secs() -> u64 {
    30
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_execution_timeout_secs(),
        }
    }
}

/// Where confirmation, lock and rate limit state lives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local maps. State is lost on restart.
    #[default]
    Memory,
    /// A SQLite file shared by every replica.
    Sqlite,
}

impl StoreBackend {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database: String,
}

fn default_database_path() -> String {
    "swapguard.db".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            database: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SweeperConfig {
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Dry-run collaborators used by `simulate`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaperConfig {
    /// USDC price of one unit of any asset.
    #[serde(default = "default_paper_price")]
    pub price: Decimal,
    #[serde(default = "default_slippage_tolerance_bps")]
    pub slippage_tolerance_bps: u32,
    /// Opening USDC balance of every paper wallet.
    #[serde(default = "default_starting_balance")]
    pub starting_balance: Decimal,
}

fn default_paper_price() -> Decimal {
    dec!(150)
}

fn default_slippage_tolerance_bps() -> u32 {
    50
}

fn default_starting_balance() -> Decimal {
    dec!(1000)
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            price: default_paper_price(),
            slippage_tolerance_bps: default_slippage_tolerance_bps(),
            starting_balance: default_starting_balance(),
        }
    }
}

/// Main application configuration.
///
/// Load from a TOML file using [`Config::load`] or parse directly with
/// [`Config::parse_toml`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub confirmation: ConfirmationConfig,

    #[serde(default)]
    pub locks: LockConfig,

    #[serde(default)]
    pub balance_cache: BalanceCacheConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub sweeper: SweeperConfig,

    #[serde(default)]
    pub paper: PaperConfig,
}

impl Config {
    /// Parse configuration from TOML content and apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        Self::from_toml(content, std::env::var(DATABASE_ENV).ok())
    }

    /// Parse configuration from TOML content without consulting the
    /// environment. Validation still runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation fails.
    pub fn parse_toml_without_env(content: &str) -> Result<Self> {
        Self::from_toml(content, None)
    }

    fn from_toml(content: &str, database_override: Option<String>) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.apply_database_override(database_override);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML content is malformed
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Replace the database path when an override is present and non-empty.
    pub fn apply_database_override(&mut self, value: Option<String>) {
        if let Some(path) = value.filter(|p| !p.trim().is_empty()) {
            self.store.database = path;
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] or [`ConfigError::MissingField`]
    /// for the first offending field.
    pub fn validate(&self) -> Result<()> {
        check_ttl("confirmation.ttl_secs", self.confirmation.settings().ttl)?;
        let locks = self.locks.ttls();
        check_ttl("locks.swap_ttl_secs", locks.swap)?;
        check_ttl("locks.balance_mutation_ttl_secs", locks.balance_mutation)?;
        check_ttl("locks.wallet_create_ttl_secs", locks.wallet_create)?;
        check_ttl("balance_cache.ttl_ms", self.balance_cache.ttl())?;
        check_ttl("rate_limit.window_secs", self.rate_limit.policy().window)?;
        check_ttl("execution.timeout_secs", self.execution_policy().execution_timeout)?;
        check_ttl("sweeper.interval_secs", self.sweep_interval())?;

        // A lease must outlive the executor call it guards.
        let shortest_lease = locks.swap.min(locks.balance_mutation);
        if self.execution_policy().execution_timeout >= shortest_lease {
            return Err(ConfigError::InvalidValue {
                field: "execution.timeout_secs",
                reason: format!(
                    "must be less than the shortest execution lock TTL ({}s)",
                    shortest_lease.as_secs()
                ),
            }
            .into());
        }

        if self.rate_limit.limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit.limit",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.store.backend == StoreBackend::Sqlite && self.store.database.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "store.database",
            }
            .into());
        }

        if self.paper.price <= Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "paper.price",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.paper.starting_balance < Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "paper.starting_balance",
                reason: "must be 0 or greater".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Lock TTLs and executor timeout.
    #[must_use]
    pub fn execution_policy(&self) -> ExecutionPolicy {
        ExecutionPolicy {
            lock_ttls: self.locks.ttls(),
            execution_timeout: Duration::from_secs(self.execution.timeout_secs),
        }
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweeper.interval_secs)
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

fn check_ttl(field: &'static str, ttl: Duration) -> Result<()> {
    if ttl.is_zero() {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "must be greater than 0".to_string(),
        }
        .into());
    }
    if ttl > MAX_TTL {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "must not exceed 24 hours".to_string(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn invalid_field(result: Result<Config>) -> &'static str {
        match result {
            Err(Error::Config(ConfigError::InvalidValue { field, .. })) => field,
            Err(Error::Config(ConfigError::MissingField { field })) => field,
            other => panic!("expected a config error, got {other:?}"),
        }
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse_toml_without_env("").unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.confirmation.settings(), ConfirmationSettings::default());
        assert_eq!(config.locks.ttls(), LockTtls::default());
        assert_eq!(config.rate_limit.policy(), RateLimitPolicy::default());
        assert_eq!(config.balance_cache.ttl(), Duration::from_secs(10));
        assert_eq!(config.store.backend, StoreBackend::Memory);
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::parse_toml_without_env(
            r#"
            [confirmation]
            ttl_secs = 120
            max_reconfirms = 3

            [locks]
            swap_ttl_secs = 45

            [store]
            backend = "sqlite"
            database = "/var/lib/swapguard/state.db"

            [paper]
            price = "42.5"
            "#,
        )
        .unwrap();

        assert_eq!(config.confirmation.settings().ttl, Duration::from_secs(120));
        assert_eq!(config.confirmation.max_reconfirms, 3);
        assert_eq!(config.locks.ttls().swap, Duration::from_secs(45));
        assert_eq!(config.locks.balance_mutation_ttl_secs, 900);
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.paper.price, dec!(42.5));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let result = Config::parse_toml_without_env("[confirmation]\nttl_secs = 0");
        assert_eq!(invalid_field(result), "confirmation.ttl_secs");
    }

    #[test]
    fn ttl_above_a_day_is_rejected() {
        let result = Config::parse_toml_without_env("[locks]\nbalance_mutation_ttl_secs = 86401");
        assert_eq!(invalid_field(result), "locks.balance_mutation_ttl_secs");
    }

    #[test]
    fn timeout_must_be_shorter_than_lock_ttls() {
        let result = Config::parse_toml_without_env(
            "[locks]\nswap_ttl_secs = 60\n\n[execution]\ntimeout_secs = 120",
        );
        assert_eq!(invalid_field(result), "execution.timeout_secs");

        let result = Config::parse_toml_without_env(
            "[locks]\nbalance_mutation_ttl_secs = 30\n\n[execution]\ntimeout_secs = 30",
        );
        assert_eq!(invalid_field(result), "execution.timeout_secs");

        let config = Config::parse_toml_without_env(
            "[locks]\nswap_ttl_secs = 31\n\n[execution]\ntimeout_secs = 30",
        )
        .unwrap();
        assert_eq!(config.execution_policy().execution_timeout, Duration::from_secs(30));
    }

    #[test]
    fn zero_rate_limit_is_rejected() {
        let result = Config::parse_toml_without_env("[rate_limit]\nlimit = 0");
        assert_eq!(invalid_field(result), "rate_limit.limit");
    }

    #[test]
    fn sqlite_backend_requires_database_path() {
        let result =
            Config::parse_toml_without_env("[store]\nbackend = \"sqlite\"\ndatabase = \"\"");
        assert_eq!(invalid_field(result), "store.database");
    }

    #[test]
    fn unknown_backend_fails_to_parse() {
        let result = Config::parse_toml_without_env("[store]\nbackend = \"redis\"");
        assert!(matches!(result, Err(Error::Config(ConfigError::Parse(_)))));
    }

    #[test]
    fn database_override_replaces_path() {
        let mut config = Config::default();

        config.apply_database_override(Some("/tmp/other.db".into()));
        assert_eq!(config.store.database, "/tmp/other.db");

        config.apply_database_override(Some("  ".into()));
        assert_eq!(config.store.database, "/tmp/other.db");
    }

    #[test]
    fn execution_policy_combines_sections() {
        let config = Config::parse_toml_without_env("[execution]\ntimeout_secs = 5").unwrap();
        let policy = config.execution_policy();

        assert_eq!(policy.execution_timeout, Duration::from_secs(5));
        assert_eq!(policy.lock_ttls, LockTtls::default());
    }
}
