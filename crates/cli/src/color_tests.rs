// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    done         = { "done", "\x1b[32m" },
    submitted    = { "submitted", "\x1b[32m" },
    running_open = { "running-open", "\x1b[32m" },
    new          = { "new", "\x1b[33m" },
    submitting   = { "submitting", "\x1b[33m" },
    archived     = { "archived", "\x1b[33m" },
    approved_wf  = { "assignment-approved", "\x1b[33m" },
    failed       = { "failed: remote command exited with code 1", "\x1b[31m" },
    rejected     = { "rejected-archived", "\x1b[31m" },
    aborted      = { "Aborted", "\x1b[31m" },
)]
fn status_colors_by_first_word(text: &str, code: &str) {
    let colored = apply_status(text);
    assert_eq!(colored, format!("{code}{text}\x1b[0m"));
}

#[test]
fn unknown_status_is_left_alone() {
    assert_eq!(apply_status("mystery"), "mystery");
    assert_eq!(apply_status(""), "");
}

#[test]
fn header_and_muted_use_palette_codes() {
    assert_eq!(apply_header("ID"), "\x1b[38;5;74mID\x1b[0m");
    assert_eq!(apply_muted("-"), "\x1b[38;5;240m-\x1b[0m");
}

#[test]
fn tone_ignores_leading_whitespace_and_case() {
    assert_eq!(Tone::of("  Done"), Some(Tone::Good));
    assert_eq!(Tone::of("FAILED"), Some(Tone::Bad));
    assert_eq!(Tone::of("-"), None);
}
