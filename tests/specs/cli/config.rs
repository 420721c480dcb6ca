//! Config discovery specs

use crate::prelude::*;

#[test]
fn missing_config_is_reported() {
    let temp = Project::empty();
    temp.rb().args(&["list-points"]).exits(1).stderr_has("failed to read config rollback.toml");
}

#[test]
fn invalid_config_is_reported() {
    let temp = Project::empty();
    temp.file("rollback.toml", "environments = 3\n");
    temp.rb().args(&["list-points"]).exits(1).stderr_has("invalid config");
}

#[test]
fn config_flag_overrides_default_location() {
    let temp = Project::deployed();
    let elsewhere = Project::empty();

    cli().current_dir(elsewhere.path()).args(&["list-points"]).fails();
    cli()
        .current_dir(elsewhere.path())
        .args(&["--config", temp.path().join("rollback.toml").to_str().unwrap(), "list-points"])
        .passes()
        .stdout_eq("No rollback points\n");
}

#[test]
fn rb_config_env_var_is_honoured() {
    let temp = Project::deployed();
    let elsewhere = Project::empty();

    cli()
        .current_dir(elsewhere.path())
        .env("RB_CONFIG", temp.path().join("rollback.toml"))
        .args(&["list-executions"])
        .passes()
        .stdout_eq("No rollback executions\n");
}

#[test]
fn logs_go_to_the_state_directory() {
    let temp = Project::deployed();
    temp.create_point("staging");

    let log = std::fs::read_to_string(temp.state_dir().join("logs/rb.log")).unwrap();
    assert!(log.contains("created rollback point"), "{log}");
}
