// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal colors for RelVal and workflow statuses.

use std::io::IsTerminal;

/// 256-color palette entries.
pub mod codes {
    pub const HEADER: u8 = 74;
    pub const CONTEXT: u8 = 245;
    pub const MUTED: u8 = 240;
}

const RESET: &str = "\x1b[0m";

/// How a status reads at a glance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    /// Moving or finished as intended.
    Good,
    /// Waiting on an operator or on the job manager.
    Pending,
    Bad,
}

impl Tone {
    /// Classifies by the leading word, so "failed: <reason>" and
    /// "running-open" both resolve.
    fn of(status: &str) -> Option<Self> {
        let lower = status.trim_start().to_lowercase();
        let word = lower.split(|c: char| !c.is_alphabetic()).next()?;
        match word {
            "done" | "submitted" | "completed" | "running" | "announced" => Some(Tone::Good),
            "new" | "approved" | "submitting" | "archived" | "assignment" | "assigned"
            | "staging" | "staged" | "acquired" | "normal" => Some(Tone::Pending),
            "failed" | "rejected" | "aborted" => Some(Tone::Bad),
            _ => None,
        }
    }

    fn escape(self) -> &'static str {
        match self {
            Tone::Good => "\x1b[32m",
            Tone::Pending => "\x1b[33m",
            Tone::Bad => "\x1b[31m",
        }
    }
}

/// `NO_COLOR` wins over `COLOR`; otherwise color only a terminal.
pub fn should_colorize() -> bool {
    if crate::env::no_color() {
        return false;
    }
    crate::env::force_color() || std::io::stdout().is_terminal()
}

fn paint(code: u8, text: &str) -> String {
    format!("\x1b[38;5;{code}m{text}{RESET}")
}

fn when_colored(text: &str, apply: impl FnOnce(&str) -> String) -> String {
    if should_colorize() {
        apply(text)
    } else {
        text.to_string()
    }
}

pub fn header(text: &str) -> String {
    when_colored(text, apply_header)
}

pub fn context(text: &str) -> String {
    when_colored(text, |t| paint(codes::CONTEXT, t))
}

pub fn status(text: &str) -> String {
    when_colored(text, apply_status)
}

pub(crate) fn apply_header(text: &str) -> String {
    paint(codes::HEADER, text)
}

pub(crate) fn apply_muted(text: &str) -> String {
    paint(codes::MUTED, text)
}

/// Unknown statuses are returned unchanged.
pub(crate) fn apply_status(text: &str) -> String {
    match Tone::of(text) {
        Some(tone) => format!("{}{text}{RESET}", tone.escape()),
        None => text.to_string(),
    }
}

#[cfg(test)]
#[path = "color_tests.rs"]
mod tests;
