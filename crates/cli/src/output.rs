// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Text and JSON rendering shared by the commands.

use std::io::Write;

use clap::{Args, ValueEnum};
use rb_core::{Clock, SystemClock};
use serde::Serialize;

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Relative age of a record timestamp, e.g. "5m ago".
pub fn format_time_ago(epoch_ms: u64) -> String {
    format_time_since(epoch_ms, SystemClock.epoch_ms())
}

pub fn format_time_since(epoch_ms: u64, now_ms: u64) -> String {
    if epoch_ms == 0 {
        return "-".to_string();
    }
    let elapsed_secs = now_ms.saturating_sub(epoch_ms) / 1000;
    format!("{} ago", rb_core::format_elapsed(elapsed_secs))
}

/// `-n/--limit` and `--no-limit` for listing commands.
#[derive(Args, Clone, Copy, Debug)]
pub struct Limit {
    /// Maximum number of entries to show
    #[arg(short = 'n', long = "limit", default_value = "20")]
    pub max: usize,

    /// Show every entry
    #[arg(long, conflicts_with = "max")]
    pub no_limit: bool,
}

/// The newest entries of a listing plus how many were left out.
pub struct Page<T> {
    pub items: Vec<T>,
    pub hidden: usize,
}

impl Limit {
    pub fn page<T>(&self, mut items: Vec<T>) -> Page<T> {
        let total = items.len();
        if self.no_limit || total <= self.max {
            return Page { items, hidden: 0 };
        }
        items.truncate(self.max);
        Page { items, hidden: total - self.max }
    }
}

/// Print a page as a text table or a JSON array.
pub fn print_page<T: Serialize>(
    format: OutputFormat,
    page: &Page<T>,
    empty_msg: &str,
    render_text: impl FnOnce(&[T], &mut dyn Write),
) -> anyhow::Result<()> {
    write_page(&mut std::io::stdout(), format, page, empty_msg, render_text)
}

fn write_page<T: Serialize>(
    out: &mut dyn Write,
    format: OutputFormat,
    page: &Page<T>,
    empty_msg: &str,
    render_text: impl FnOnce(&[T], &mut dyn Write),
) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        writeln!(out, "{}", serde_json::to_string_pretty(&page.items)?)?;
        return Ok(());
    }
    if page.items.is_empty() {
        writeln!(out, "{empty_msg}")?;
    } else {
        render_text(&page.items, out);
    }
    if page.hidden > 0 {
        writeln!(out, "\n... {} more not shown. Use --no-limit or -n N to see more.", page.hidden)?;
    }
    Ok(())
}

/// Print one record as pretty JSON, or via `text_fn` in text mode.
pub fn format_or_json<T: Serialize>(
    format: OutputFormat,
    data: &T,
    text_fn: impl FnOnce(),
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(data)?),
        OutputFormat::Text => text_fn(),
    }
    Ok(())
}
