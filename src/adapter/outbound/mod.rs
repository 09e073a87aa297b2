//! Outbound adapters (driven side).

pub mod memory;
pub mod paper;
pub mod sqlite;
