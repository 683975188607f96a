//! Inbound events delivered by the host platform.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The event names the pipeline reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "exec")]
    Exec,
    #[serde(rename = "push")]
    Push,
    #[serde(rename = "check_suite:requested")]
    CheckSuiteRequested,
    #[serde(rename = "check_suite:rerequested")]
    CheckSuiteRerequested,
    #[serde(rename = "check_run:rerequested")]
    CheckRunRerequested,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Exec,
        EventKind::Push,
        EventKind::CheckSuiteRequested,
        EventKind::CheckSuiteRerequested,
        EventKind::CheckRunRerequested,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Exec => "exec",
            EventKind::Push => "push",
            EventKind::CheckSuiteRequested => "check_suite:requested",
            EventKind::CheckSuiteRerequested => "check_suite:rerequested",
            EventKind::CheckRunRerequested => "check_run:rerequested",
        }
    }

    /// Check-suite and check-run requests, which are answered with check runs.
    pub fn is_check_request(&self) -> bool {
        matches!(
            self,
            EventKind::CheckSuiteRequested
                | EventKind::CheckSuiteRerequested
                | EventKind::CheckRunRerequested
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::UnknownEvent(s.to_string()))
    }
}

/// The revision an event refers to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    /// Branch or tag reference, e.g. `refs/heads/master` or `refs/tags/v1.0.0`.
    #[serde(rename = "ref", default)]
    pub git_ref: String,
    /// Commit SHA, when the platform provides one.
    #[serde(default)]
    pub commit: Option<String>,
}

/// An event as supplied by the host platform. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default)]
    pub revision: Revision,
    /// Raw webhook payload, forwarded verbatim to check-run notifications.
    #[serde(default)]
    pub payload: String,
    #[serde(default, alias = "buildID")]
    pub build_id: String,
}

impl Event {
    pub fn new(kind: EventKind, git_ref: impl Into<String>) -> Self {
        Self {
            kind,
            revision: Revision {
                git_ref: git_ref.into(),
                commit: None,
            },
            payload: String::new(),
            build_id: String::new(),
        }
    }

    pub fn with_commit(mut self, commit: impl Into<String>) -> Self {
        self.revision.commit = Some(commit.into());
        self
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn with_build_id(mut self, build_id: impl Into<String>) -> Self {
        self.build_id = build_id.into();
        self
    }

    pub fn git_ref(&self) -> &str {
        &self.revision.git_ref
    }

    pub fn commit(&self) -> &str {
        self.revision.commit.as_deref().unwrap_or("")
    }

    /// Parse an event from its JSON form. An unrecognised `type` is an
    /// [`Error::UnknownEvent`]; any other malformed input is invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| Error::InvalidEvent(e.to_string()))?;
        if let Some(kind) = value.get("type").and_then(serde_json::Value::as_str) {
            kind.parse::<EventKind>()?;
        }
        serde_json::from_value(value).map_err(|e| Error::InvalidEvent(e.to_string()))
    }
}
