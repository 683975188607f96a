//! Job and check definitions.

use crate::dispatcher::PipelineConfig;
use brig_core::{Event, JobSpec, Notification, Project};

pub const TEST_JOB: &str = "tests";
pub const BUILD_JOB: &str = "build-and-publish-images";

/// Go import path the sources are mounted at inside the test image.
pub fn source_path(project: &Project, config: &PipelineConfig) -> String {
    format!(
        "{}/src/github.com/{}/{}",
        config.go_path.trim_end_matches('/'),
        project.org,
        project.name
    )
}

/// Verify vendored code, lint and run the unit tests.
pub fn test_job(project: &Project, config: &PipelineConfig) -> JobSpec {
    let local_path = source_path(project, config);
    JobSpec::new(TEST_JOB, &config.test_image)
        .mount_path(&local_path)
        .env("SKIP_DOCKER", "true")
        .task(format!("cd {}", local_path))
        .task("make verify-vendored-code lint test")
}

/// Build every image and push it to the project's registry.
///
/// An empty `version` builds the floating edge tags.
pub fn build_and_publish_job(project: &Project, config: &PipelineConfig, version: &str) -> JobSpec {
    let secrets = &project.secrets;
    let registry = secrets.registry();
    let org = secrets.org();

    JobSpec::new(BUILD_JOB, &config.build_image)
        .privileged(true)
        .task("apk add --update --no-cache make git")
        .task("dockerd-entrypoint.sh &")
        .task("sleep 20")
        .task("cd /src")
        .task(format!(
            "docker login {} -u {} -p {}",
            registry,
            secrets.username(),
            secrets.password()
        ))
        .task(format!(
            "DOCKER_REGISTRY={} DOCKER_ORG={} VERSION={} make build-all-images push-all-images",
            registry, org, version
        ))
        .task(format!("docker logout {}", registry))
}

/// The in-progress "Run Tests" check for an event.
pub fn test_check(event: &Event, project: &Project) -> Notification {
    let mut note = Notification::for_event(TEST_JOB, event, project);
    note.conclusion = None;
    note.title = "Run Tests".to_string();
    note.summary = format!("Running the test targets for {}", event.commit());
    note.text = "This test will ensure build, linting and tests all pass.".to_string();
    note
}
