//! Serialization tests for brig-core types.

use brig_core::*;
use pretty_assertions::assert_eq;

#[test]
fn test_event_serializes_with_platform_names() {
    let event = Event::new(EventKind::CheckRunRerequested, "refs/heads/feature-x")
        .with_build_id("b-7");

    let value = serde_json::to_value(&event).expect("serialize");
    assert_eq!(value["type"], "check_run:rerequested");
    assert_eq!(value["revision"]["ref"], "refs/heads/feature-x");
    assert_eq!(value["build_id"], "b-7");
}

#[test]
fn test_event_defaults_missing_fields() {
    let event = Event::from_json(r#"{"type": "exec"}"#).expect("parse");
    assert_eq!(event.kind, EventKind::Exec);
    assert_eq!(event.git_ref(), "");
    assert_eq!(event.commit(), "");
    assert!(event.payload.is_empty());
}

#[test]
fn test_conclusion_snake_case() {
    let json = serde_json::to_string(&Conclusion::TimedOut).expect("serialize");
    assert_eq!(json, "\"timed_out\"");
}

#[test]
fn test_project_secrets_accept_platform_keys() {
    let json = r#"{
        "secrets": {
            "dockerhubRegistry": "quay.io",
            "dockerhubUsername": "bot",
            "dockerhubPassword": "s3cret"
        }
    }"#;

    let project: Project = serde_json::from_str(json).expect("deserialize");
    assert_eq!(project.secrets.registry(), "quay.io");
    assert_eq!(project.secrets.org(), "brigadecore");
    assert_eq!(project.secrets.username(), "bot");
    assert_eq!(project.name, "brigade-github-app");
}

#[test]
fn test_job_spec_deserializes_with_defaults() {
    let job: JobSpec = serde_json::from_str(r#"{"name": "tests", "image": "alpine"}"#)
        .expect("deserialize");
    assert_eq!(job, JobSpec::new("tests", "alpine"));
}
