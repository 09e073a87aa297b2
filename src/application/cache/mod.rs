//! Runtime caches used by application services.
//!
//! - [`balance::BalanceCache`]: wallet balances with TTL expiry and
//!   explicit invalidation after mutations

pub mod balance;
