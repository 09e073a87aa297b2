//! Swapguard - confirm-then-execute pipeline for swap quotes.
//!
//! A caller quotes a swap, shows the quote to a user, and executes it only
//! after explicit approval. This crate makes that flow safe under concurrency:
//!
//! - a confirmation executes at most once, even when approved twice
//! - a subject runs at most one operation of each class at a time
//! - execution is refused when the price moved beyond the quote's tolerance
//! - cached balances are invalidated after every execution attempt
//! - both entry points are rate limited per subject
//!
//! # Architecture
//!
//! - [`domain`] - Value types and the execution lifecycle
//! - [`port`] - Store, collaborator and service contracts
//! - [`application`] - Slippage policy, balance cache, orchestrator, sweeper
//! - [`adapter`] - In-memory, SQLite and paper implementations, and the CLI
//! - [`infrastructure`] - Configuration, logging and wiring
//!
//! # Features
//!
//! - `testkit` - Manual clock and scripted collaborators for downstream tests

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
