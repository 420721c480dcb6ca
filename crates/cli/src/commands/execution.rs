// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rb list-executions`, `rb show-execution`

use std::io::Write;

use anyhow::Result;
use clap::Args;
use rb_core::{format_elapsed_ms, Clock, RollbackExecution, StepStatus, SystemClock};

use super::resolve_execution_id;
use crate::app::App;
use crate::color;
use crate::output::{
    format_or_json, format_time_ago, format_time_since, print_page, Limit, OutputFormat,
};
use crate::table::{Column, Table};

#[derive(Args)]
pub struct ListArgs {
    /// Only show executions of this environment
    pub environment: Option<String>,

    #[command(flatten)]
    pub limit: Limit,
}

pub fn list(app: &App, args: ListArgs, format: OutputFormat) -> Result<()> {
    let listing = app.store().list_executions(args.environment.as_deref());
    let page = args.limit.page(listing.iter().collect::<Vec<&RollbackExecution>>());
    print_page(format, &page, "No rollback executions", |items, out| {
        format_execution_list(out, items)
    })
}

pub(crate) fn format_execution_list(
    out: &mut (impl Write + ?Sized),
    executions: &[&RollbackExecution],
) {
    let mut table = Table::new(vec![
        Column::muted("ID"),
        Column::left("ENVIRONMENT"),
        Column::muted("POINT"),
        Column::left("REQUESTED BY"),
        Column::left("STARTED"),
        Column::status("STATUS"),
    ]);
    for e in executions {
        table.row(vec![
            e.id.to_string(),
            e.environment.clone(),
            e.point_id.to_string(),
            e.requested_by.clone(),
            format_time_ago(e.started_at_ms),
            e.status.to_string(),
        ]);
    }
    table.render(out);
}

pub fn show(app: &App, id: &str, format: OutputFormat) -> Result<()> {
    let id = resolve_execution_id(app.store(), id);
    let execution = app.store().get_execution(&id)?;
    format_or_json(format, &execution, || {
        write_execution(&mut std::io::stdout(), &execution, SystemClock.epoch_ms());
    })
}

pub(crate) fn write_execution(out: &mut impl Write, exec: &RollbackExecution, now_ms: u64) {
    let label = |name: &str| color::context(&format!("{name:<14}"));
    let _ = writeln!(out, "{}{}", label("Execution:"), color::header(exec.id.as_str()));
    let _ = writeln!(out, "{}{}", label("Environment:"), exec.environment);
    let _ = writeln!(out, "{}{}", label("Point:"), exec.point_id);
    let _ = writeln!(out, "{}{}", label("Status:"), color::status(&exec.status.to_string()));
    let _ = writeln!(
        out,
        "{}{} by {}",
        label("Started:"),
        format_time_since(exec.started_at_ms, now_ms),
        exec.requested_by
    );
    if let Some(finished) = exec.finished_at_ms() {
        let elapsed = format_elapsed_ms(finished.saturating_sub(exec.started_at_ms));
        let _ = writeln!(out, "{}{}", label("Duration:"), elapsed);
    }
    let auto_restore = if exec.auto_restore { "enabled" } else { "disabled" };
    let _ = writeln!(out, "{}{}", label("Auto-restore:"), auto_restore);
    if let Some(safety) = &exec.safety_point_id {
        let _ = writeln!(out, "{}{}", label("Safety point:"), safety);
    }
    if let Some(failure) = &exec.failure {
        let _ = writeln!(out, "{}{}", label("Failure:"), failure);
    }

    if !exec.steps.is_empty() {
        let _ = writeln!(out, "\n{}", label("Steps:"));
        let mut table = Table::new(vec![
            Column::left("PHASE"),
            Column::left("STEP"),
            Column::status("STATUS"),
            Column::right("ELAPSED"),
            Column::left("DETAIL"),
        ]);
        for step in &exec.steps {
            let detail = step.error.as_ref().or(step.detail.as_ref()).cloned().unwrap_or_default();
            table.row(vec![
                step.phase.to_string(),
                step.name.clone(),
                step.status.to_string(),
                format_elapsed_ms(step.elapsed_ms()),
                detail,
            ]);
        }
        table.render(out);
    }

    if !exec.restore_attempts.is_empty() {
        let _ = writeln!(out, "\n{}", label("Auto-restore:"));
        let mut table =
            Table::new(vec![Column::left("KIND"), Column::status("STATUS"), Column::left("ERROR")]);
        for attempt in &exec.restore_attempts {
            table.row(vec![
                attempt.kind.to_string(),
                attempt.status.to_string(),
                attempt.error.clone().unwrap_or_default(),
            ]);
        }
        table.render(out);
    }
}

/// One-line summary of what auto-restore achieved.
pub(crate) fn auto_restore_summary(exec: &RollbackExecution) -> &'static str {
    if exec.restore_attempts.is_empty() {
        return if exec.auto_restore && exec.safety_point_id.is_some() {
            "not attempted"
        } else if exec.auto_restore {
            "not needed (nothing was changed)"
        } else {
            "disabled"
        };
    }
    if exec.restore_attempts.iter().all(|a| a.status == StepStatus::Success) {
        "restored the pre-rollback state"
    } else {
        "incomplete, manual intervention required"
    }
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
