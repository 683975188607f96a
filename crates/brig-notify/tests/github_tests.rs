//! GitHub Checks API delivery against a mock server.

use brig_core::{Conclusion, Event, EventKind, Notification, Notifier, Project};
use brig_notify::{CheckPayload, CheckRunRequest, GitHubCheckClient, GitHubNotifier};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn payload() -> String {
    json!({
        "type": "check_suite",
        "token": "ghs_installation",
        "body": {
            "repository": {"full_name": "brigadecore/brigade-github-app"},
            "check_suite": {"head_sha": "c0ffee", "head_branch": "feature-x"}
        }
    })
    .to_string()
}

#[tokio::test]
async fn test_create_run_posts_check_run() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/brigadecore/brigade-github-app/check-runs"))
        .and(header("authorization", "Bearer ghs_installation"))
        .and(header("accept", "application/vnd.github.antiope-preview+json"))
        .and(body_partial_json(json!({
            "name": "tests",
            "head_sha": "c0ffee",
            "status": "completed",
            "conclusion": "success"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 99})))
        .expect(1)
        .mount(&server)
        .await;

    let envelope = CheckPayload::parse(&payload()).unwrap();
    let target = envelope.target().unwrap();
    let request = CheckRunRequest {
        payload: payload(),
        name: "tests".to_string(),
        title: "Run Tests".to_string(),
        summary: "passed".to_string(),
        text: String::new(),
        conclusion: Some(Conclusion::Success),
        details_url: String::new(),
        external_id: "b-1".to_string(),
        started_at: "2024-01-01T00:00:00Z".to_string(),
        actions: vec![],
        base_url: None,
    };

    let client =
        GitHubCheckClient::new(Some(server.uri().as_str()), envelope.token.clone()).unwrap();
    let body = client
        .create_run(&target, &request.check_run(&target))
        .await
        .unwrap();
    assert!(body.contains("99"));
}

#[tokio::test]
async fn test_error_status_is_delivery_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(422).set_body_string("Validation Failed"))
        .mount(&server)
        .await;

    let mut request = CheckRunRequest::from_lookup(|_| None, None).unwrap();
    request.payload = payload();
    request.base_url = Some(server.uri());

    let err = GitHubCheckClient::submit(&request).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("422"));
    assert!(message.contains("Validation Failed"));
}

#[tokio::test]
async fn test_notifier_sends_in_progress_then_completed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/brigadecore/brigade-github-app/check-runs"))
        .and(body_partial_json(json!({"status": "in_progress"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/brigadecore/brigade-github-app/check-runs"))
        .and(body_partial_json(json!({"status": "completed", "conclusion": "failure"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 2})))
        .expect(1)
        .mount(&server)
        .await;

    let event = Event::new(EventKind::CheckSuiteRequested, "refs/heads/feature-x")
        .with_payload(payload())
        .with_build_id("b-1");
    let mut note = Notification::for_event("tests", &event, &Project::default());
    note.conclusion = None;

    let notifier = GitHubNotifier::new(Some(server.uri()));
    let first = notifier.send(&note.next_send()).await.unwrap();
    note.conclusion = Some(Conclusion::Failure);
    let second = notifier.send(&note.next_send()).await.unwrap();

    assert_eq!(first.id, "1");
    assert_eq!(second.id, "2");
}

#[tokio::test]
async fn test_notifier_rejects_payload_without_repository() {
    let mut note = Notification::new("tests");
    note.payload = json!({"type": "check_suite", "token": "t", "body": {}}).to_string();

    let err = GitHubNotifier::default()
        .send(&note.next_send())
        .await
        .unwrap_err();
    assert!(err.is_notify_failure());
}
