//! `swapguard sweep`: one-shot cleanup of expired entries.

use std::path::Path;
use std::sync::Arc;

use super::diagnostic::StoreDiagnostic;
use super::output::{self, OutputConfig};
use super::{init_logging, load_config};
use crate::infrastructure::bootstrap::build_sweeper;
use crate::infrastructure::config::settings::StoreBackend;
use crate::port::outbound::clock::SystemClock;

const COLUMNS: [(&str, usize); 2] = [("Store", 18), ("Removed", 24)];

/// Sweep the configured stores once and print a per-store report.
///
/// # Errors
///
/// Fails when the configuration is invalid, the stores cannot be opened,
/// or any store fails to sweep.
pub fn execute(path: &Path, flags: OutputConfig) -> miette::Result<()> {
    let config = load_config(path)?;
    init_logging(&config, flags);

    let sweeper = build_sweeper(&config, Arc::new(SystemClock))
        .map_err(|e| StoreDiagnostic::new(e.to_string()))?;
    let report = sweeper.sweep_once();

    output::section("Sweep");
    output::field("Store", config.store.backend.as_str());
    if config.store.backend == StoreBackend::Memory {
        output::hint("the memory backend starts empty; sweep is meaningful for sqlite");
    }

    let widths: Vec<usize> = COLUMNS.iter().map(|(_, w)| *w).collect();
    output::table_header(&COLUMNS);
    for store in &report.stores {
        let removed = match &store.outcome {
            Ok(n) => n.to_string(),
            Err(e) => format!("failed: {e}"),
        };
        output::table_row(&[store.store.to_string(), removed], &widths);
    }

    if report.failures() > 0 {
        return Err(StoreDiagnostic::new(format!(
            "{} of {} stores failed to sweep",
            report.failures(),
            report.stores.len()
        ))
        .into());
    }

    output::success(&format!("Removed {} expired entries", report.removed()));
    Ok(())
}
