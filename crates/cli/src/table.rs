// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Column-aligned text tables for listing commands.
//!
//! Widths are measured on the plain cell text; color is applied after
//! padding so escape codes never skew alignment.

use std::io::Write;

use crate::color;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Paint {
    Plain,
    Muted,
    Status,
}

#[derive(Debug, Clone)]
pub struct Column {
    title: &'static str,
    align: Align,
    paint: Paint,
}

impl Column {
    pub fn left(title: &'static str) -> Self {
        Self { title, align: Align::Left, paint: Paint::Plain }
    }

    pub fn right(title: &'static str) -> Self {
        Self { title, align: Align::Right, paint: Paint::Plain }
    }

    /// Secondary information such as ids.
    pub fn muted(title: &'static str) -> Self {
        Self { title, align: Align::Left, paint: Paint::Muted }
    }

    /// Status words, colored by outcome.
    pub fn status(title: &'static str) -> Self {
        Self { title, align: Align::Left, paint: Paint::Status }
    }
}

pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Add a row. Missing cells render empty; extra cells are ignored.
    pub fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    fn widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let cells = self.rows.iter().filter_map(|r| r.get(i)).map(|c| c.chars().count());
                cells.fold(col.title.len(), usize::max)
            })
            .collect()
    }

    pub fn render(&self, out: &mut (impl Write + ?Sized)) {
        let widths = self.widths();
        let last = self.columns.len().saturating_sub(1);

        let header: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| color::header(&pad(col.title, widths[i], col.align, i == last)))
            .collect();
        let _ = writeln!(out, "{}", header.join("  "));

        for row in &self.rows {
            let cells: Vec<String> = self
                .columns
                .iter()
                .enumerate()
                .map(|(i, col)| {
                    let text = row.get(i).map(String::as_str).unwrap_or_default();
                    let padded = pad(text, widths[i], col.align, i == last);
                    match col.paint {
                        Paint::Plain => padded,
                        Paint::Muted => color::muted(&padded),
                        Paint::Status => {
                            let fill = padded.len() - text.len();
                            format!("{}{}", color::status(text), " ".repeat(fill))
                        }
                    }
                })
                .collect();
            let _ = writeln!(out, "{}", cells.join("  "));
        }
    }
}

fn pad(text: &str, width: usize, align: Align, last: bool) -> String {
    let fill = width.saturating_sub(text.chars().count());
    match align {
        Align::Left if last => text.to_string(),
        Align::Left => format!("{}{}", text, " ".repeat(fill)),
        Align::Right => format!("{}{}", " ".repeat(fill), text),
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
