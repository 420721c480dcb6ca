//! Rollback point creation and listing specs

use crate::prelude::*;

#[test]
fn create_point_records_release_and_revision() {
    let temp = Project::deployed();

    let point = temp
        .rb()
        .args(&[
            "create-point",
            "staging",
            "before migration",
            "--meta",
            "ticket=OPS-7",
            "--marker",
            "deploy-42",
            "-o",
            "json",
        ])
        .passes()
        .json();

    assert_eq!(point["environment"], "staging");
    assert_eq!(point["created_by"], "spec");
    assert_eq!(point["release_version"], "v1");
    assert_eq!(point["source_revision"], temp.head("staging").as_str());
    assert_eq!(point["description"], "before migration");
    assert_eq!(point["purpose"], "manual");
    assert_eq!(point["metadata"]["ticket"], "OPS-7");
    assert_eq!(point["metadata"]["deployment_marker"], "deploy-42");
    let kinds: Vec<_> = point["snapshots"].as_object().unwrap().keys().cloned().collect();
    assert_eq!(kinds, vec!["application-code", "configuration", "data-store"]);
}

#[test]
fn create_point_text_output() {
    let temp = Project::deployed();

    temp.rb()
        .args(&["create-point", "production"])
        .passes()
        .stdout_has("Created rollback point rbp-")
        .stdout_has("for production")
        .stdout_has("v1 at ");
}

#[test]
fn create_point_for_unknown_environment_fails() {
    let temp = Project::deployed();

    temp.rb().args(&["create-point", "qa"]).exits(1).stderr_has("unknown environment: qa");
    temp.rb().args(&["list-points"]).passes().stdout_eq("No rollback points\n");
}

#[test]
fn failed_capture_creates_no_point() {
    let temp = Project::deployed();
    std::fs::remove_file(temp.path().join("staging/data.txt")).unwrap();

    temp.rb().args(&["create-point", "staging"]).exits(1).stderr_has("data-store");
    temp.rb().args(&["list-points", "staging"]).passes().stdout_eq("No rollback points\n");
}

#[test]
fn list_points_filters_by_environment_newest_first() {
    let temp = Project::deployed();
    let first = temp.create_point("staging");
    let second = temp.create_point("staging");
    let other = temp.create_point("production");

    let listed = temp.rb().args(&["list-points", "staging", "-o", "json"]).passes().json();
    let ids: Vec<_> = listed.as_array().unwrap().iter().map(|p| p["id"].clone()).collect();
    assert_eq!(ids, vec![Value::from(second.clone()), Value::from(first.clone())]);

    temp.rb()
        .args(&["list-points"])
        .passes()
        .stdout_has(&first)
        .stdout_has(&second)
        .stdout_has(&other)
        .stdout_has("ENVIRONMENT");
}

#[test]
fn list_points_honours_limit() {
    let temp = Project::deployed();
    temp.create_point("staging");
    temp.create_point("staging");
    temp.create_point("staging");

    temp.rb()
        .args(&["list-points", "-n", "2"])
        .passes()
        .stdout_has("... 1 more not shown");
}

#[test]
fn show_point_accepts_unique_prefix() {
    let temp = Project::deployed();
    let id = temp.create_point("staging");

    temp.rb()
        .args(&["show-point", &id[..10]])
        .passes()
        .stdout_has(&format!("Point:       {id}"))
        .stdout_has("Environment: staging")
        .stdout_has("data-store")
        .stdout_has("configuration")
        .stdout_has("application-code");
}

#[test]
fn show_missing_point_fails() {
    let temp = Project::deployed();

    temp.rb()
        .args(&["show-point", "rbp-doesnotexist"])
        .exits(1)
        .stderr_has("rollback point not found: rbp-doesnotexist");
}
