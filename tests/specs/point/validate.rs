//! Rollback point validation specs

use crate::prelude::*;

#[test]
fn fresh_point_is_usable() {
    let temp = Project::deployed();
    let id = temp.create_point("staging");

    temp.rb()
        .args(&["validate-point", &id])
        .passes()
        .stdout_has("data-store")
        .stdout_has("valid")
        .stdout_has(&format!("Rollback point {id} is usable"));
}

#[test]
fn missing_dump_makes_point_unusable() {
    let temp = Project::deployed();
    let id = temp.create_point("staging");
    let point = temp.rb().args(&["show-point", &id, "-o", "json"]).passes().json();
    let dump = point["snapshots"]["data-store"]["locator"].as_str().unwrap().to_string();
    std::fs::remove_file(temp.state_dir().join("dumps").join(&dump)).unwrap();

    temp.rb()
        .args(&["validate-point", &id])
        .exits(1)
        .stdout_has("invalid")
        .stdout_has(&format!("Rollback point {id} is unusable"))
        .stderr_has("is not usable");
}

#[test]
fn validation_json_lists_every_kind() {
    let temp = Project::deployed();
    let id = temp.create_point("production");

    let validation = temp.rb().args(&["validate-point", &id, "-o", "json"]).passes().json();

    assert_eq!(validation["point_id"], id.as_str());
    let kinds: Vec<_> = validation["kinds"]
        .as_array()
        .unwrap()
        .iter()
        .map(|k| (k["kind"].as_str().unwrap().to_string(), k["valid"].as_bool().unwrap()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("data-store".to_string(), true),
            ("configuration".to_string(), true),
            ("application-code".to_string(), true),
        ]
    );
}

#[test]
fn validating_leaves_environment_untouched() {
    let temp = Project::deployed();
    let id = temp.create_point("staging");
    temp.deploy("staging", "v2");
    let head = temp.head("staging");

    temp.rb().args(&["validate-point", &id]).passes();

    assert_eq!(temp.read("staging/data.txt"), "rows=v2\n");
    assert_eq!(temp.head("staging"), head);
}

#[test]
fn validating_missing_point_fails() {
    let temp = Project::deployed();

    temp.rb()
        .args(&["validate-point", "rbp-nope"])
        .exits(1)
        .stderr_has("rollback point not found: rbp-nope");
}
