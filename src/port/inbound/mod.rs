//! Inbound ports (driving side): contracts exposed to presentation adapters.

pub mod execution;
