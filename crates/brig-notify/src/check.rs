//! GitHub check-run model and the CHECK_* request it is built from.

use crate::sender::NotifyError;
use brig_core::Conclusion;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Maximum length GitHub accepts for check-run summary and text.
pub const MAX_OUTPUT_CHARS: usize = 65535;

/// Where the check-run tool looks for text too large for an env var.
pub const TEXT_FILE: &str = "/check-run/text";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Queued,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutput {
    pub title: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
}

/// A button GitHub renders on the check run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckAction {
    pub label: String,
    pub description: String,
    pub identifier: String,
}

/// Body of a `POST /repos/{owner}/{repo}/check-runs` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRun {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub head_branch: String,
    pub head_sha: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub external_id: String,
    pub status: CheckStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<Conclusion>,
    pub started_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    pub output: CheckOutput,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<CheckAction>,
}

/// `owner/repo` plus the commit and branch a check run is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoTarget {
    pub owner: String,
    pub repo: String,
    pub commit: String,
    pub branch: String,
}

/// Webhook envelope forwarded in `CHECK_PAYLOAD`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckPayload {
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Installation token for the repository.
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub body: serde_json::Value,
    #[serde(default)]
    pub commit: String,
    #[serde(default)]
    pub branch: String,
}

#[derive(Debug, Default, Deserialize)]
struct Repository {
    #[serde(default)]
    full_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct SuiteRef {
    #[serde(default)]
    head_sha: Option<String>,
    #[serde(default)]
    head_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CheckSuiteEvent {
    #[serde(default)]
    repository: Repository,
    #[serde(default)]
    check_suite: SuiteRef,
}

#[derive(Debug, Default, Deserialize)]
struct RunRef {
    #[serde(default)]
    check_suite: SuiteRef,
}

#[derive(Debug, Deserialize)]
struct CheckRunEvent {
    #[serde(default)]
    repository: Repository,
    #[serde(default)]
    check_run: RunRef,
}

#[derive(Debug, Deserialize)]
struct IssueCommentEvent {
    #[serde(default)]
    repository: Repository,
}

impl CheckPayload {
    pub fn parse(raw: &str) -> Result<Self, NotifyError> {
        serde_json::from_str(raw)
            .map_err(|e| NotifyError::InvalidPayload(format!("could not parse payload: {}", e)))
    }

    /// Repository full name, head commit and head branch for this payload.
    pub fn repo_commit_branch(&self) -> Result<(String, String, String), NotifyError> {
        let body = || self.body.clone();
        let invalid = |e: serde_json::Error| NotifyError::InvalidPayload(e.to_string());

        match self.kind.as_str() {
            "check_run" => {
                let event: CheckRunEvent = serde_json::from_value(body()).map_err(invalid)?;
                let suite = event.check_run.check_suite;
                Ok((
                    event.repository.full_name,
                    suite.head_sha.unwrap_or_default(),
                    suite.head_branch.unwrap_or_default(),
                ))
            }
            "check_suite" => {
                let event: CheckSuiteEvent = serde_json::from_value(body()).map_err(invalid)?;
                let suite = event.check_suite;
                Ok((
                    event.repository.full_name,
                    suite.head_sha.unwrap_or_default(),
                    suite.head_branch.unwrap_or_default(),
                ))
            }
            "issue_comment" => {
                let event: IssueCommentEvent = serde_json::from_value(body()).map_err(invalid)?;
                // comments carry no commit, the envelope has to supply it
                if self.commit.is_empty() {
                    return Err(NotifyError::InvalidPayload("commit empty".to_string()));
                }
                if self.branch.is_empty() {
                    return Err(NotifyError::InvalidPayload("branch empty".to_string()));
                }
                Ok((
                    event.repository.full_name,
                    self.commit.clone(),
                    self.branch.clone(),
                ))
            }
            other => Err(NotifyError::InvalidPayload(format!(
                "unknown payload type {}",
                other
            ))),
        }
    }

    pub fn target(&self) -> Result<RepoTarget, NotifyError> {
        let (full_name, commit, branch) = self.repo_commit_branch()?;
        match full_name.split('/').collect::<Vec<_>>().as_slice() {
            [owner, repo] if !owner.is_empty() && !repo.is_empty() => Ok(RepoTarget {
                owner: owner.to_string(),
                repo: repo.to_string(),
                commit,
                branch,
            }),
            _ => Err(NotifyError::InvalidRequest(
                "CheckSuite.Repository.FullName is required".to_string(),
            )),
        }
    }
}

/// A check-run update described by CHECK_* variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRunRequest {
    pub payload: String,
    pub name: String,
    pub title: String,
    pub summary: String,
    pub text: String,
    pub conclusion: Option<Conclusion>,
    pub details_url: String,
    pub external_id: String,
    pub started_at: String,
    pub actions: Vec<CheckAction>,
    /// GitHub Enterprise API base, if any.
    pub base_url: Option<String>,
}

impl CheckRunRequest {
    /// Read the request from the process environment.
    pub fn from_env() -> Result<Self, NotifyError> {
        Self::from_lookup(|key| std::env::var(key).ok(), Some(Path::new(TEXT_FILE)))
    }

    /// Build a request from a variable lookup. When `CHECK_TEXT` is unset,
    /// the text is read from `text_file` if given and non-empty.
    pub fn from_lookup<F>(lookup: F, text_file: Option<&Path>) -> Result<Self, NotifyError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let text = match lookup("CHECK_TEXT") {
            Some(text) => text,
            None => text_file
                .and_then(|path| std::fs::read_to_string(path).ok())
                .unwrap_or_default(),
        };

        let conclusion = match lookup("CHECK_CONCLUSION").unwrap_or_default().as_str() {
            "" => None,
            raw => Some(Conclusion::parse_optional(raw).ok_or_else(|| {
                NotifyError::InvalidRequest(format!("unknown conclusion {}", raw))
            })?),
        };

        let actions = match lookup("CHECK_ACTIONS").filter(|a| !a.is_empty()) {
            Some(json) => serde_json::from_str(&json).map_err(|e| {
                NotifyError::InvalidRequest(format!("could not parse actions: {}", e))
            })?,
            None => Vec::new(),
        };

        Ok(Self {
            payload: lookup("CHECK_PAYLOAD").unwrap_or_default(),
            name: or("CHECK_NAME", "Brigade"),
            title: or("CHECK_TITLE", "Running Check"),
            summary: or("CHECK_SUMMARY", ""),
            text,
            conclusion,
            details_url: or("CHECK_DETAILS_URL", ""),
            external_id: or("CHECK_EXTERNAL_ID", ""),
            started_at: lookup("CHECK_STARTED_AT").unwrap_or_else(now_rfc3339),
            actions,
            base_url: lookup("GITHUB_BASE_URL").filter(|u| !u.is_empty()),
        })
    }

    /// The check run to create for `target`. A conclusion completes the run.
    pub fn check_run(&self, target: &RepoTarget) -> CheckRun {
        let (status, completed_at) = match self.conclusion {
            Some(_) => (CheckStatus::Completed, Some(now_rfc3339())),
            None => (CheckStatus::InProgress, None),
        };

        CheckRun {
            name: self.name.clone(),
            head_branch: target.branch.clone(),
            head_sha: target.commit.clone(),
            details_url: self.details_url.clone(),
            external_id: self.external_id.clone(),
            status,
            conclusion: self.conclusion,
            started_at: self.started_at.clone(),
            completed_at,
            output: CheckOutput {
                title: self.title.clone(),
                summary: truncate_tail(&self.summary, MAX_OUTPUT_CHARS),
                text: truncate_tail(&self.text, MAX_OUTPUT_CHARS),
            },
            actions: self.actions.clone(),
        }
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Keep at most `max` trailing characters of `s`.
pub fn truncate_tail(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max {
        return s.to_string();
    }
    s.chars().skip(len - max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn suite_payload() -> CheckPayload {
        CheckPayload::parse(
            r#"{
                "type": "check_suite",
                "token": "ghs_abc",
                "body": {
                    "repository": {"full_name": "brigadecore/brigade"},
                    "check_suite": {"head_sha": "deadbeef", "head_branch": "feature-x"}
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_defaults_from_empty_environment() {
        let req = CheckRunRequest::from_lookup(lookup(&[]), None).unwrap();
        assert_eq!(req.name, "Brigade");
        assert_eq!(req.title, "Running Check");
        assert_eq!(req.conclusion, None);
        assert!(req.actions.is_empty());
        assert!(!req.started_at.is_empty());
    }

    #[test]
    fn test_invalid_actions_rejected() {
        let err = CheckRunRequest::from_lookup(lookup(&[("CHECK_ACTIONS", "[{")]), None)
            .unwrap_err();
        assert!(matches!(err, NotifyError::InvalidRequest(_)));
    }

    #[test]
    fn test_check_suite_target() {
        let target = suite_payload().target().unwrap();
        assert_eq!(target.owner, "brigadecore");
        assert_eq!(target.repo, "brigade");
        assert_eq!(target.commit, "deadbeef");
        assert_eq!(target.branch, "feature-x");
    }

    #[test]
    fn test_check_run_target() {
        let payload = CheckPayload::parse(
            r#"{
                "type": "check_run",
                "body": {
                    "repository": {"full_name": "o/r"},
                    "check_run": {"check_suite": {"head_sha": "abc", "head_branch": "main"}}
                }
            }"#,
        )
        .unwrap();
        assert_eq!(
            payload.repo_commit_branch().unwrap(),
            ("o/r".to_string(), "abc".to_string(), "main".to_string())
        );
    }

    #[test]
    fn test_issue_comment_requires_envelope_commit() {
        let mut payload = CheckPayload {
            kind: "issue_comment".to_string(),
            body: serde_json::json!({"repository": {"full_name": "o/r"}}),
            ..Default::default()
        };
        assert!(payload.repo_commit_branch().is_err());

        payload.commit = "abc".to_string();
        payload.branch = "main".to_string();
        assert_eq!(payload.repo_commit_branch().unwrap().1, "abc");
    }

    #[test]
    fn test_unknown_payload_type() {
        let payload = CheckPayload {
            kind: "pull_request".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            payload.repo_commit_branch(),
            Err(NotifyError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_conclusion_completes_run() {
        let req = CheckRunRequest::from_lookup(
            lookup(&[("CHECK_CONCLUSION", "failure"), ("CHECK_TEXT", "boom")]),
            None,
        )
        .unwrap();
        let run = req.check_run(&suite_payload().target().unwrap());

        assert_eq!(run.status, CheckStatus::Completed);
        assert_eq!(run.conclusion, Some(Conclusion::Failure));
        assert!(run.completed_at.is_some());
        assert_eq!(run.output.text, "boom");
    }

    #[test]
    fn test_running_check_serializes_without_conclusion() {
        let req = CheckRunRequest::from_lookup(lookup(&[]), None).unwrap();
        let run = req.check_run(&suite_payload().target().unwrap());
        let json = serde_json::to_value(&run).unwrap();

        assert_eq!(json["status"], "in_progress");
        assert!(json.get("conclusion").is_none());
        assert!(json.get("completed_at").is_none());
    }

    #[test]
    fn test_truncate_tail() {
        assert_eq!(truncate_tail("abcdef", 3), "def");
        assert_eq!(truncate_tail("abc", 3), "abc");
        assert_eq!(truncate_tail("héllo", 4), "éllo");
    }
}
