// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compact elapsed-time formatting for listings and progress output.

/// Format seconds as the largest whole unit (e.g., "5s", "2m", "1h", "3d").
pub fn format_elapsed(secs: u64) -> String {
    match secs {
        0..=59 => format!("{}s", secs),
        60..=3_599 => format!("{}m", secs / 60),
        3_600..=86_399 => format!("{}h", secs / 3_600),
        _ => format!("{}d", secs / 86_400),
    }
}

/// Format a millisecond duration, keeping sub-second precision for short steps.
pub fn format_elapsed_ms(ms: u64) -> String {
    if ms < 1_000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1_000.0)
    } else {
        format_elapsed(ms / 1_000)
    }
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
