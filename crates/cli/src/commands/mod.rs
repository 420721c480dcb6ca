// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator commands

pub mod execution;
pub mod point;
pub mod rollback;

use anyhow::Result;
use rb_storage::PointStore;

/// Parse a `key=value` pair. The value may itself contain `=`.
pub(crate) fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let pos =
        s.find('=').ok_or_else(|| format!("invalid input format '{}': must be key=value", s))?;
    if pos == 0 {
        return Err(format!("invalid input format '{}': key is empty", s));
    }
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

/// Resolve a full id from an exact id or a unique prefix.
///
/// Unknown or ambiguous prefixes are returned unchanged so the lookup
/// reports them as not found.
pub(crate) fn resolve_id<'a>(input: &str, ids: impl Iterator<Item = &'a str>) -> String {
    let mut matches = ids.filter(|id| id.starts_with(input));
    match (matches.next(), matches.next()) {
        (Some(id), None) => id.to_string(),
        _ => input.to_string(),
    }
}

pub(crate) fn resolve_point_id(store: &PointStore, input: &str) -> String {
    if store.get_point(input).is_ok() {
        return input.to_string();
    }
    let points = store.list_points(None);
    resolve_id(input, points.iter().map(|p| p.id.as_str()))
}

pub(crate) fn resolve_execution_id(store: &PointStore, input: &str) -> String {
    if store.get_execution(input).is_ok() {
        return input.to_string();
    }
    let executions = store.list_executions(None);
    resolve_id(input, executions.iter().map(|e| e.id.as_str()))
}

/// Operator identity for new points and executions.
pub(crate) fn whoami(explicit: Option<String>) -> String {
    explicit
        .or_else(|| std::env::var("USER").ok())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

