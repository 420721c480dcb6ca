//! Successful rollback specs

use crate::prelude::*;

#[test]
fn rollback_returns_environment_to_point() {
    let temp = Project::deployed();
    let v1 = temp.head("production");
    let id = temp.create_point("production");
    temp.deploy("production", "v2");

    temp.rb()
        .args(&["rollback", "production", &id])
        .passes()
        .stdout_has("Validating production")
        .stdout_has("Rolling back production")
        .stdout_has("Verifying production")
        .stdout_has("ok restore-data-store")
        .stdout_has("succeeded")
        .stdout_has(&format!("production is at point {id}"));

    assert_eq!(temp.read("production/data.txt"), "rows=v1\n");
    assert_eq!(temp.read("production/app.toml"), "release = \"v1\"\n");
    assert_eq!(temp.head("production"), v1);
    assert_eq!(temp.read("production/repo/VERSION"), "v1\n");
    assert!(!temp.path().join("production/stopped").exists());
}

#[test]
fn rollback_leaves_other_environments_alone() {
    let temp = Project::deployed();
    let id = temp.create_point("production");
    temp.deploy("production", "v2");
    temp.deploy("staging", "v2");

    temp.rb().args(&["rollback", "production", &id]).passes();

    assert_eq!(temp.read("staging/data.txt"), "rows=v2\n");
    assert_eq!(temp.read("staging/repo/VERSION"), "v2\n");
}

#[test]
fn rollback_json_reports_all_phases() {
    let temp = Project::deployed();
    let id = temp.create_point("staging");
    temp.deploy("staging", "v2");

    let exec = temp
        .rb()
        .args(&["rollback", "staging", &id, "--requested-by", "oncall", "-o", "json"])
        .passes()
        .json();

    assert_eq!(exec["status"], "succeeded");
    assert_eq!(exec["point_id"], id.as_str());
    assert_eq!(exec["requested_by"], "oncall");
    let steps = exec["steps"].as_array().unwrap();
    let count = |phase: &str| steps.iter().filter(|s| s["phase"] == phase).count();
    assert_eq!(count("pre-validation"), 3);
    assert_eq!(count("execution"), 6);
    assert_eq!(count("post-validation"), 4);
    assert!(steps.iter().all(|s| s["status"] == "success"));
    assert!(exec["safety_point_id"].as_str().unwrap().starts_with("rbp-"));
}

#[test]
fn rollback_to_same_point_twice_is_idempotent() {
    let temp = Project::deployed();
    let id = temp.create_point("staging");
    temp.deploy("staging", "v2");

    temp.rb().args(&["rollback", "staging", &id]).passes();
    temp.rb().args(&["rollback", "staging", &id]).passes();

    assert_eq!(temp.read("staging/data.txt"), "rows=v1\n");
}
