// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `rb create-point`, `rb list-points`, `rb show-point`, `rb validate-point`

use std::io::Write;

use anyhow::Result;
use clap::Args;
use rb_core::{short, Clock, RollbackPoint, SnapshotKind, SystemClock};
use rb_engine::{PointRequest, PointValidation};

use super::{parse_key_value, resolve_point_id, whoami};
use crate::app::App;
use crate::color;
use crate::exit_error::ExitError;
use crate::output::{
    format_or_json, format_time_ago, format_time_since, print_page, Limit, OutputFormat,
};
use crate::table::{Column, Table};

#[derive(Args)]
pub struct CreateArgs {
    /// Environment to capture
    pub environment: String,

    /// Free-text note stored with the point
    pub description: Option<String>,

    /// Metadata to record (can be repeated: --meta key=value)
    #[arg(long = "meta", value_parser = parse_key_value)]
    pub meta: Vec<(String, String)>,

    /// Deployment marker re-applied when rolling back to this point
    #[arg(long)]
    pub marker: Option<String>,

    /// Recorded as the creator (default: $USER)
    #[arg(long)]
    pub created_by: Option<String>,
}

#[derive(Args)]
pub struct ListArgs {
    /// Only show points of this environment
    pub environment: Option<String>,

    #[command(flatten)]
    pub limit: Limit,
}

impl CreateArgs {
    fn into_request(self) -> PointRequest {
        let mut request = PointRequest::new(self.environment, whoami(self.created_by));
        request.description = self.description;
        for (key, value) in self.meta {
            request = request.meta(key, value);
        }
        match self.marker {
            Some(marker) => request.marker(marker),
            None => request,
        }
    }
}

pub async fn create(app: &App, args: CreateArgs, format: OutputFormat) -> Result<()> {
    let point = app.controller().create_point(args.into_request()).await?;
    format_or_json(format, &point, || {
        println!(
            "Created rollback point {} for {}",
            color::header(point.id.as_str()),
            point.environment
        );
        println!(
            "  {} at {} ({})",
            point.release_version,
            color::literal(short(&point.source_revision, 12)),
            format_bytes(point.total_size_bytes())
        );
    })
}

pub fn list(app: &App, args: ListArgs, format: OutputFormat) -> Result<()> {
    let listing = app.store().list_points(args.environment.as_deref());
    let page = args.limit.page(listing.iter().collect::<Vec<&RollbackPoint>>());
    print_page(format, &page, "No rollback points", |items, out| format_point_list(out, items))
}

pub(crate) fn format_point_list(out: &mut (impl Write + ?Sized), points: &[&RollbackPoint]) {
    let mut table = Table::new(vec![
        Column::muted("ID"),
        Column::left("ENVIRONMENT"),
        Column::left("PURPOSE"),
        Column::left("VERSION"),
        Column::left("REVISION"),
        Column::left("CREATED"),
        Column::left("DESCRIPTION"),
    ]);
    for p in points {
        table.row(vec![
            p.id.to_string(),
            p.environment.clone(),
            p.purpose.to_string(),
            p.release_version.clone(),
            short(&p.source_revision, 12).to_string(),
            format_time_ago(p.created_at_ms),
            p.description.clone().unwrap_or_default(),
        ]);
    }
    table.render(out);
}

pub fn show(app: &App, id: &str, format: OutputFormat) -> Result<()> {
    let id = resolve_point_id(app.store(), id);
    let point = app.store().get_point(&id)?;
    format_or_json(format, &point, || {
        write_point(&mut std::io::stdout(), &point, SystemClock.epoch_ms());
    })
}

pub(crate) fn write_point(out: &mut impl Write, point: &RollbackPoint, now_ms: u64) {
    let label = |name: &str| color::context(&format!("{name:<13}"));
    let _ = writeln!(out, "{}{}", label("Point:"), color::header(point.id.as_str()));
    let _ = writeln!(out, "{}{}", label("Environment:"), point.environment);
    let _ = writeln!(out, "{}{}", label("Purpose:"), point.purpose);
    let _ = writeln!(
        out,
        "{}{} by {}",
        label("Created:"),
        format_time_since(point.created_at_ms, now_ms),
        point.created_by
    );
    let _ = writeln!(out, "{}{}", label("Release:"), point.release_version);
    let _ = writeln!(out, "{}{}", label("Revision:"), point.source_revision);
    if let Some(description) = &point.description {
        let _ = writeln!(out, "{}{}", label("Description:"), description);
    }
    for (key, value) in &point.metadata {
        let _ = writeln!(out, "{}{} = {}", label("Metadata:"), key, value);
    }

    let _ = writeln!(out, "{}", label("Snapshots:"));
    let mut table =
        Table::new(vec![Column::left("KIND"), Column::right("SIZE"), Column::muted("LOCATOR")]);
    for kind in SnapshotKind::ALL {
        match point.snapshot(kind) {
            Some(s) => {
                table.row(vec![kind.to_string(), format_bytes(s.size_bytes), s.locator.clone()])
            }
            None => table.row(vec![kind.to_string(), "-".to_string(), "missing".to_string()]),
        }
    }
    table.render(out);
}

pub async fn validate(app: &App, id: &str, format: OutputFormat) -> Result<()> {
    let id = resolve_point_id(app.store(), id);
    let validation = app.controller().validate_point(&id).await?;
    format_or_json(format, &validation, || {
        write_validation(&mut std::io::stdout(), &validation);
    })?;
    if validation.usable() {
        Ok(())
    } else {
        Err(ExitError::failure(format!("rollback point {} is not usable", validation.point_id))
            .into())
    }
}

pub(crate) fn write_validation(out: &mut impl Write, validation: &PointValidation) {
    let mut table =
        Table::new(vec![Column::left("KIND"), Column::status("STATUS"), Column::left("REASON")]);
    for kind in SnapshotKind::ALL {
        let (status, reason) = match validation.kinds.iter().find(|k| k.kind == kind) {
            Some(k) if k.valid => ("valid", String::new()),
            Some(k) => ("invalid", k.reason.clone().unwrap_or_default()),
            None => ("invalid", "snapshot missing".to_string()),
        };
        table.row(vec![kind.to_string(), status.to_string(), reason]);
    }
    table.render(out);
    let verdict = if validation.usable() { "usable" } else { "unusable" };
    let _ = writeln!(out, "\nRollback point {} is {}", validation.point_id, color::status(verdict));
}

/// Human-readable byte count (e.g. "512 B", "1.5 KiB").
pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

#[cfg(test)]
#[path = "point_tests.rs"]
mod tests;
