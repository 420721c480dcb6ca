// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rb rollback`: revert an environment to a rollback point.
//!
//! Progress is printed from the controller's event stream as it happens.
//! Ctrl-C requests cancellation, which the pipeline observes between steps;
//! the interrupted execution still ends as a `failed` record.

use std::io::Write;

use anyhow::Result;
use clap::Args;
use rb_core::{format_elapsed_ms, ExecutionStatus, RollbackExecution, StepStatus};
use rb_engine::{EventSink, RollbackEvent, RollbackOptions};
use tokio::sync::mpsc;

use super::execution::auto_restore_summary;
use super::{resolve_point_id, whoami};
use crate::app::App;
use crate::color;
use crate::exit_error::ExitError;
use crate::output::{format_or_json, OutputFormat};

#[derive(Args)]
pub struct RollbackArgs {
    /// Environment to revert
    pub environment: String,

    /// Rollback point to revert to (id or unique prefix)
    pub point_id: String,

    /// Leave the environment as-is if the rollback fails
    #[arg(long)]
    pub no_auto_restore: bool,

    /// Recorded as the requester (default: $USER)
    #[arg(long)]
    pub requested_by: Option<String>,
}

pub async fn handle(app: &App, args: RollbackArgs, format: OutputFormat) -> Result<()> {
    let point_id = resolve_point_id(app.store(), &args.point_id);
    let options = RollbackOptions {
        auto_restore: !args.no_auto_restore,
        requested_by: whoami(args.requested_by),
        ..RollbackOptions::default()
    };

    let cancel = options.cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted: stopping after the current step");
            cancel.cancel();
        }
    });

    let (events, progress) = match format {
        OutputFormat::Text => {
            let (tx, rx) = mpsc::channel(64);
            (EventSink::new(tx), Some(tokio::spawn(print_progress(rx))))
        }
        OutputFormat::Json => (EventSink::none(), None),
    };

    let controller = app.controller().with_events(events);
    let result = controller.request_rollback(&args.environment, &point_id, options).await;
    // Closes the event channel so the printer drains and exits.
    drop(controller);
    if let Some(progress) = progress {
        let _ = progress.await;
    }
    interrupt.abort();

    let exec = result?;
    format_or_json(format, &exec, || write_outcome(&mut std::io::stdout(), &exec))?;
    match (&exec.status, &exec.failure) {
        (ExecutionStatus::Succeeded, _) => Ok(()),
        (_, Some(failure)) => {
            Err(ExitError::failure(format!("rollback {} failed: {}", exec.id, failure)).into())
        }
        (status, None) => {
            Err(ExitError::failure(format!("rollback {} ended {}", exec.id, status)).into())
        }
    }
}

async fn print_progress(mut rx: mpsc::Receiver<RollbackEvent>) {
    while let Some(event) = rx.recv().await {
        if let Some(line) = format_event(&event) {
            println!("{line}");
        }
    }
}

/// Progress line for an event, if it is worth showing.
pub(crate) fn format_event(event: &RollbackEvent) -> Option<String> {
    match event {
        RollbackEvent::StatusChanged { environment, status, .. } => {
            let title = match status {
                ExecutionStatus::Validating => format!("Validating {environment}"),
                ExecutionStatus::Executing => format!("Rolling back {environment}"),
                ExecutionStatus::PostValidating => format!("Verifying {environment}"),
                _ => return None,
            };
            Some(color::header(&title))
        }
        RollbackEvent::StepStarted { .. } => None,
        RollbackEvent::StepFinished { step, .. } => {
            let elapsed = color::muted(&format_elapsed_ms(step.elapsed_ms()));
            Some(match (&step.status, &step.error, &step.detail) {
                (StepStatus::Failed, error, _) => format!(
                    "  {} {} {}: {}",
                    color::status("failed"),
                    step.name,
                    elapsed,
                    error.as_deref().unwrap_or("unknown error")
                ),
                (StepStatus::Success, _, Some(detail)) => {
                    format!("  ok {} {} ({})", step.name, elapsed, color::muted(detail))
                }
                (StepStatus::Success, _, None) => format!("  ok {} {}", step.name, elapsed),
            })
        }
        RollbackEvent::SafetyPointCaptured { point_id, .. } => {
            Some(format!("  safety point {}", color::muted(point_id.as_str())))
        }
        RollbackEvent::AutoRestoreStarted { safety_point_id, .. } => Some(color::header(
            &format!("Auto-restoring safety point {safety_point_id}"),
        )),
        RollbackEvent::AutoRestoreAttempted { attempt, .. } => Some(match &attempt.error {
            None => format!("  ok restore {}", attempt.kind),
            Some(error) => {
                format!("  {} restore {}: {}", color::status("failed"), attempt.kind, error)
            }
        }),
    }
}

pub(crate) fn write_outcome(out: &mut impl Write, exec: &RollbackExecution) {
    match &exec.failure {
        None => {
            let _ = writeln!(
                out,
                "Rollback {} {}: {} is at point {}",
                exec.id,
                color::status("succeeded"),
                exec.environment,
                exec.point_id
            );
        }
        Some(failure) => {
            let _ = writeln!(out, "Rollback {} {}", exec.id, color::status("failed"));
            let _ = writeln!(out, "  phase:        {}", failure.phase);
            let _ = writeln!(out, "  step:         {}", failure.step);
            let _ = writeln!(out, "  cause:        {}", failure.cause);
            let _ = writeln!(out, "  auto-restore: {}", auto_restore_summary(exec));
        }
    }
}

#[cfg(test)]
#[path = "rollback_tests.rs"]
mod tests;
