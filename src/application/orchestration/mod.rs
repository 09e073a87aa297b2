//! Execution orchestration.
//!
//! # Modules
//!
//! - [`orchestrator`]: the confirm-then-execute state machine
//! - [`guard`]: scoped lease that invalidates and releases on every exit path

pub mod guard;
pub mod orchestrator;

pub use guard::ExecutionGuard;
pub use orchestrator::{
    Collaborators, ExecutionOrchestrator, ExecutionPolicy, LockTtls, PipelineStores,
};
