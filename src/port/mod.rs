//! Port interfaces between the application core and its adapters.

pub mod inbound;
pub mod outbound;
