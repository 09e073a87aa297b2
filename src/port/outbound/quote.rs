//! Quote provider port.

use async_trait::async_trait;

use crate::domain::{Quote, QuoteRequest};
use crate::error::Result;

/// Prices a requested swap.
///
/// Failures are transient from the core's point of view: the pipeline
/// surfaces them and never retries on its own.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn get_quote(&self, request: &QuoteRequest) -> Result<Quote>;

    /// Provider name for logging.
    fn provider_name(&self) -> &'static str;
}
