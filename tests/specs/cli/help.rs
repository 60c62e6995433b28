//! CLI help output specs

use crate::prelude::*;

#[test]
fn rvt_no_args_shows_usage_and_exits_zero() {
    cli().passes().stdout_has("Usage:");
}

#[test]
fn rvt_help_lists_commands() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("create")
        .stdout_has("next")
        .stdout_has("previous")
        .stdout_has("serve");
}

#[test]
fn rvt_list_help_shows_filters() {
    cli()
        .args(&["list", "--help"])
        .passes()
        .stdout_has("--status")
        .stdout_has("--batch");
}
