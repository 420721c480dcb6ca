//! CLI help output specs

use crate::prelude::*;

#[test]
fn rb_no_args_shows_usage_and_exits_zero() {
    cli().passes().stdout_has("Usage:");
}

#[test]
fn rb_help_lists_every_command() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("create-point")
        .stdout_has("rollback")
        .stdout_has("list-points")
        .stdout_has("list-executions")
        .stdout_has("show-point")
        .stdout_has("show-execution")
        .stdout_has("validate-point");
}

#[test]
fn rb_rollback_help_shows_options() {
    cli()
        .args(&["rollback", "--help"])
        .passes()
        .stdout_has("--no-auto-restore")
        .stdout_has("--requested-by");
}

#[test]
fn rb_version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("rb 0.2");
}

#[test]
fn unknown_command_is_a_usage_error() {
    cli().args(&["explode"]).exits(2);
}

#[test]
fn missing_arguments_are_a_usage_error() {
    cli().args(&["rollback", "staging"]).exits(2).stderr_has("<POINT_ID>");
}
