//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe infrastructure dependencies such as state
//! stores, quote providers, executors, balance sources and notifications.

pub mod balance;
pub mod clock;
pub mod executor;
pub mod notifier;
pub mod quote;
pub mod store;
