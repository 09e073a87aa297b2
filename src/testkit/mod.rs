//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`clock`] - [`ManualClock`](clock::ManualClock), a settable time source.
//! - [`collaborators`] - Scripted quote provider, recording executor,
//!   counting balance source, static wallets, recording notifier.
//! - [`domain`] - Builders for quotes, requests, drafts and lock keys.
//! - [`config`] - Canonical test configurations.

pub mod clock;
pub mod collaborators;
pub mod config;
pub mod domain;
