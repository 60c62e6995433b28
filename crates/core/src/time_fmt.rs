// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Human-readable ages for listings.

/// Format a number of seconds as `"5s"`, `"2m"`, `"1h30m"`, or `"3d"`.
pub fn format_elapsed(secs: u64) -> String {
    match secs {
        0..=59 => format!("{}s", secs),
        60..=3599 => format!("{}m", secs / 60),
        3600..=86399 => match (secs / 3600, (secs % 3600) / 60) {
            (h, 0) => format!("{}h", h),
            (h, m) => format!("{}h{}m", h, m),
        },
        _ => format!("{}d", secs / 86400),
    }
}

/// Age of an epoch-seconds timestamp relative to `now`, or `"-"` when unset.
pub fn format_age(now_secs: u64, then_secs: u64) -> String {
    if then_secs == 0 {
        return "-".to_string();
    }
    format_elapsed(now_secs.saturating_sub(then_secs))
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
