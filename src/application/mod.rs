//! Application services.
//!
//! # Modules
//!
//! - [`orchestration`]: confirm-then-execute lifecycle
//! - [`cache`]: balance cache
//! - [`slippage`]: quote movement policy
//! - [`housekeeping`]: periodic sweep of expired store entries

pub mod cache;
pub mod housekeeping;
pub mod orchestration;
pub mod slippage;
