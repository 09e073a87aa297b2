//! `swapguard simulate`: a dry-run confirm-and-execute cycle.
//!
//! Opens one confirmation against paper collaborators, then races several
//! execute calls for it. Exactly one may settle; the rest must be rejected.

use std::sync::Arc;
use std::time::Duration;

use super::command::SimulateArgs;
use super::diagnostic::{SimulationDiagnostic, StoreDiagnostic};
use super::output::{self, OutputConfig};
use super::{init_logging, load_config};
use crate::domain::{ConfirmationKind, ExecutionOutcome, QuoteRequest, SubjectId};
use crate::error::PipelineError;
use crate::infrastructure::bootstrap::{build_notifier_registry, build_paper_venue, build_pipeline};
use crate::infrastructure::config::settings::Config;
use crate::port::inbound::execution::ConfirmationService;
use crate::port::outbound::clock::SystemClock;

/// Run the simulation.
///
/// # Errors
///
/// Fails when the configuration is invalid, the confirmation cannot be
/// opened, or more than one attempt settles.
pub async fn execute(args: SimulateArgs, flags: OutputConfig) -> miette::Result<()> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    init_logging(&config, flags);
    output::header(env!("CARGO_PKG_VERSION"));

    let venue = build_paper_venue(&config.paper, Duration::from_millis(args.latency_ms));
    let pipeline = build_pipeline(
        &config,
        venue.collaborators.clone(),
        Arc::clone(&venue.balance_source),
        build_notifier_registry(),
        Arc::new(SystemClock),
    )
    .map_err(|e| StoreDiagnostic::new(e.to_string()))?;
    let orchestrator = pipeline.orchestrator;

    let subject = SubjectId::new(args.subject.as_str());
    let request = QuoteRequest::try_new(
        subject.clone(),
        ConfirmationKind::SwapExecute,
        args.amount,
        args.asset.as_str(),
    )
    .map_err(|e| {
        SimulationDiagnostic::new(e.to_string())
            .with_help("pass a positive --amount and a non-empty --asset")
    })?;

    let ticket = orchestrator
        .open_confirmation(request)
        .await
        .map_err(SimulationDiagnostic::from)?;

    output::section("Confirmation");
    output::field("Session", ticket.session_id.short());
    output::field(
        "Pay",
        format!("{} {}", ticket.quote.input_amount(), ticket.quote.input_asset()),
    );
    output::field(
        "Receive",
        format!(
            "{} {}",
            ticket.quote.output_amount(),
            ticket.quote.output_asset()
        ),
    );
    output::field(
        "Tolerance",
        format!("{} bps", ticket.quote.slippage_tolerance_bps()),
    );
    output::field("Expires in", format!("{}s", orchestrator.ttl_seconds()));

    let handles: Vec<_> = (0..args.concurrency)
        .map(|_| {
            let orchestrator = Arc::clone(&orchestrator);
            let session_id = ticket.session_id.clone();
            tokio::spawn(async move { orchestrator.execute(&session_id).await })
        })
        .collect();

    output::section("Execution");
    let mut settled = 0usize;
    for (index, handle) in handles.into_iter().enumerate() {
        let result = handle
            .await
            .map_err(|e| SimulationDiagnostic::new(format!("attempt task failed: {e}")))?;
        settled += usize::from(report_attempt(index + 1, &result));
    }

    output::section("Balances");
    let balances = orchestrator
        .balances(&subject)
        .await
        .map_err(SimulationDiagnostic::from)?;
    for (asset, amount) in balances.iter() {
        output::field(asset, amount);
    }

    match settled {
        0 => output::warning("No attempt settled"),
        1 => output::success(&format!(
            "Executed once across {} concurrent attempts",
            args.concurrency
        )),
        n => {
            return Err(SimulationDiagnostic::new(format!(
                "confirmation executed {n} times"
            ))
            .into())
        }
    }
    Ok(())
}

/// Print one attempt; returns whether it settled.
fn report_attempt(index: usize, result: &Result<ExecutionOutcome, PipelineError>) -> bool {
    match result {
        Ok(ExecutionOutcome::Settled(settlement)) => {
            output::attempt(index, "settled", &settlement.tx_id);
            true
        }
        Ok(ExecutionOutcome::ReconfirmRequired(reconfirm)) => {
            output::attempt(
                index,
                "reconfirm_required",
                &format!("price moved {} bps", reconfirm.moved_bps.round_dp(2)),
            );
            false
        }
        Err(e) => {
            output::attempt(index, e.code(), e.user_message());
            false
        }
    }
}
