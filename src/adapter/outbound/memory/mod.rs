//! In-memory store implementations.
//!
//! Backed by [`DashMap`](dashmap::DashMap): every check-and-act operation
//! runs under the owning shard's write lock, so it is atomic with respect
//! to concurrent callers in the same process. State is lost on restart.

pub mod confirmation;
pub mod lock;
pub mod rate_limit;

pub use confirmation::MemoryConfirmationStore;
pub use lock::MemoryOperationLock;
pub use rate_limit::MemoryRateLimiter;
