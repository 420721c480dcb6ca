//! Execution history specs

use crate::prelude::*;

fn rolled_back(temp: &Project, env: &str) -> (String, Value) {
    let id = temp.create_point(env);
    temp.deploy(env, "v2");
    let exec = temp.rb().args(&["rollback", env, &id, "-o", "json"]).passes().json();
    (id, exec)
}

#[test]
fn executions_are_listed_after_rollback() {
    let temp = Project::deployed();
    let (point, exec) = rolled_back(&temp, "staging");
    let exec_id = exec["id"].as_str().unwrap();

    temp.rb()
        .args(&["list-executions"])
        .passes()
        .stdout_has("REQUESTED BY")
        .stdout_has(exec_id)
        .stdout_has(&point)
        .stdout_has("spec")
        .stdout_has("succeeded");

    temp.rb()
        .args(&["list-executions", "production"])
        .passes()
        .stdout_eq("No rollback executions\n");
}

#[test]
fn show_execution_reports_steps() {
    let temp = Project::deployed();
    let (point, exec) = rolled_back(&temp, "production");
    let exec_id = exec["id"].as_str().unwrap();

    temp.rb()
        .args(&["show-execution", exec_id])
        .passes()
        .stdout_has(&format!("Execution:    {exec_id}"))
        .stdout_has(&format!("Point:        {point}"))
        .stdout_has("Status:       succeeded")
        .stdout_has("restore-application-code")
        .stdout_has("smoke-test");

    let shown = temp.rb().args(&["show-execution", exec_id, "-o", "json"]).passes().json();
    assert_eq!(shown, exec);
}

#[test]
fn failed_execution_is_kept_with_its_cause() {
    let temp = Project::deployed();
    let id = temp.create_point("staging");
    temp.deploy("staging", "v2");
    temp.break_operation("staging", "smoke-test");
    temp.rb().args(&["rollback", "staging", &id]).exits(1);

    let listed = temp.rb().args(&["list-executions", "-o", "json"]).passes().json();
    let exec = &listed.as_array().unwrap()[0];
    assert_eq!(exec["status"], "failed");
    assert_eq!(exec["failure"]["step"], "smoke-test");
    assert_eq!(exec["restore_attempts"].as_array().unwrap().len(), 3);

    temp.rb()
        .args(&["show-execution", exec["id"].as_str().unwrap()])
        .passes()
        .stdout_has("Failure:")
        .stdout_has("Auto-restore:")
        .stdout_has("restored the pre-rollback state");
}

#[test]
fn safety_point_is_listed_with_its_purpose() {
    let temp = Project::deployed();
    let (_, exec) = rolled_back(&temp, "staging");
    let safety = exec["safety_point_id"].as_str().unwrap();

    let points = temp.rb().args(&["list-points", "staging", "-o", "json"]).passes().json();
    let listed = points.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["id"], safety);
    assert_eq!(listed[0]["purpose"], "safety");
    assert_eq!(listed[0]["release_version"], "v2");
    assert_eq!(listed[0]["metadata"]["execution_id"], exec["id"]);

    temp.rb().args(&["list-points"]).passes().stdout_has("safety");
}

#[test]
fn show_missing_execution_fails() {
    let temp = Project::deployed();

    temp.rb()
        .args(&["show-execution", "rbx-nope"])
        .exits(1)
        .stderr_has("rollback execution not found: rbx-nope");
}
