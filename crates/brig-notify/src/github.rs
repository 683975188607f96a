//! Direct delivery of check runs through the GitHub Checks API.

use crate::check::{CheckPayload, CheckRun, CheckRunRequest, RepoTarget};
use crate::sender::NotifyError;
use async_trait::async_trait;
use brig_core::{NotificationSend, Notifier, NotifyAck};
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use tracing::{debug, info};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Preview media type the Checks API was released under.
const CHECKS_PREVIEW: &str = "application/vnd.github.antiope-preview+json";

/// Client for creating check runs with an installation token.
pub struct GitHubCheckClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl GitHubCheckClient {
    /// Create a client. `base_url` selects a GitHub Enterprise API.
    pub fn new(base_url: Option<&str>, token: impl Into<String>) -> Result<Self, NotifyError> {
        let token = token.into();
        if token.is_empty() {
            return Err(NotifyError::InvalidRequest(
                "installation token is required".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url
                .filter(|u| !u.is_empty())
                .unwrap_or(DEFAULT_API_URL)
                .trim_end_matches('/')
                .to_string(),
            token,
        })
    }

    /// Create a check run and return GitHub's response body.
    pub async fn create_run(
        &self,
        target: &RepoTarget,
        run: &CheckRun,
    ) -> Result<String, NotifyError> {
        let url = format!(
            "{}/repos/{}/{}/check-runs",
            self.base_url, target.owner, target.repo
        );
        debug!(url = %url, name = %run.name, status = ?run.status, "Creating check run");

        let response = self
            .client
            .post(&url)
            .header(ACCEPT, CHECKS_PREVIEW)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(USER_AGENT, concat!("brig/", env!("CARGO_PKG_VERSION")))
            .json(run)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(NotifyError::DeliveryFailed(format!(
                "GitHub returned {}: {}",
                status, body
            )));
        }

        info!(
            name = %run.name,
            owner = %target.owner,
            repo = %target.repo,
            "Check run created"
        );
        Ok(body)
    }

    /// Parse the payload of a request, then create its check run.
    pub async fn submit(request: &CheckRunRequest) -> Result<String, NotifyError> {
        let payload = CheckPayload::parse(&request.payload)?;
        let target = payload.target()?;
        let client = Self::new(request.base_url.as_deref(), payload.token.clone())?;
        client.create_run(&target, &request.check_run(&target)).await
    }
}

/// Notifier that calls the Checks API in-process instead of running a job.
#[derive(Debug, Clone, Default)]
pub struct GitHubNotifier {
    base_url: Option<String>,
}

impl GitHubNotifier {
    pub fn new(base_url: Option<String>) -> Self {
        Self { base_url }
    }
}

#[async_trait]
impl Notifier for GitHubNotifier {
    async fn send(&self, notification: &NotificationSend) -> brig_core::Result<NotifyAck> {
        let mut request = CheckRunRequest::from_lookup(
            |key| notification.env.get(key).cloned(),
            None,
        )
        .map_err(|e| e.into_pipeline_error(&notification.job_name))?;
        if request.base_url.is_none() {
            request.base_url = self.base_url.clone();
        }

        let response = GitHubCheckClient::submit(&request)
            .await
            .map_err(|e| e.into_pipeline_error(&notification.job_name))?;

        let id = serde_json::from_str::<serde_json::Value>(&response)
            .ok()
            .and_then(|v| v.get("id").and_then(|id| id.as_u64()))
            .map(|id| id.to_string())
            .unwrap_or_else(|| notification.job_name.clone());

        Ok(NotifyAck { id, response })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_token() {
        assert!(matches!(
            GitHubCheckClient::new(None, ""),
            Err(NotifyError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_enterprise_base_url_trimmed() {
        let client = GitHubCheckClient::new(Some("https://ghe.example.com/api/v3/"), "t").unwrap();
        assert_eq!(client.base_url, "https://ghe.example.com/api/v3");

        let client = GitHubCheckClient::new(Some(""), "t").unwrap();
        assert_eq!(client.base_url, DEFAULT_API_URL);
    }
}
