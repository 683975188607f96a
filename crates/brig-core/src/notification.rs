//! Check-run notifications.

use crate::event::Event;
use crate::project::Project;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Terminal status attached to a check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conclusion {
    Success,
    Failure,
    Neutral,
    Cancelled,
    TimedOut,
}

impl Conclusion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Conclusion::Success => "success",
            Conclusion::Failure => "failure",
            Conclusion::Neutral => "neutral",
            Conclusion::Cancelled => "cancelled",
            Conclusion::TimedOut => "timed_out",
        }
    }

    /// Parse a conclusion; the empty string means "still running".
    pub fn parse_optional(s: &str) -> Option<Conclusion> {
        match s {
            "success" => Some(Conclusion::Success),
            "failure" => Some(Conclusion::Failure),
            "neutral" => Some(Conclusion::Neutral),
            "cancelled" => Some(Conclusion::Cancelled),
            "timed_out" => Some(Conclusion::TimedOut),
            _ => None,
        }
    }
}

impl fmt::Display for Conclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A check-run notification for one event.
///
/// Constructed per check and mutated in place across its sends. Every call
/// to [`Notification::next_send`] bumps the counter, so the derived job name
/// is unique per attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub name: String,
    pub payload: String,
    /// `None` while the check is in progress.
    pub conclusion: Option<Conclusion>,
    pub title: String,
    pub summary: String,
    pub text: String,
    pub external_id: String,
    pub details_url: String,
    count: u64,
}

impl Notification {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: String::new(),
            conclusion: Some(Conclusion::Neutral),
            title: "running check".to_string(),
            summary: String::new(),
            text: String::new(),
            external_id: String::new(),
            details_url: String::new(),
            count: 0,
        }
    }

    /// A notification bound to an event's payload and build.
    pub fn for_event(name: impl Into<String>, event: &Event, project: &Project) -> Self {
        Self {
            payload: event.payload.clone(),
            external_id: event.build_id.clone(),
            details_url: project.details_url(&event.build_id),
            ..Self::new(name)
        }
    }

    /// Number of sends so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Take a snapshot for the next send, advancing the counter by one.
    pub fn next_send(&mut self) -> NotificationSend {
        self.count += 1;
        NotificationSend {
            job_name: format!("{}-notification-{}", self.name, self.count),
            sequence: self.count,
            name: self.name.clone(),
            conclusion: self.conclusion,
            env: self.env(),
        }
    }

    /// The CHECK_* variables the check-run tool consumes.
    pub fn env(&self) -> BTreeMap<String, String> {
        let conclusion = self.conclusion.map(|c| c.as_str()).unwrap_or("");
        [
            ("CHECK_CONCLUSION", conclusion),
            ("CHECK_NAME", self.name.as_str()),
            ("CHECK_TITLE", self.title.as_str()),
            ("CHECK_PAYLOAD", self.payload.as_str()),
            ("CHECK_SUMMARY", self.summary.as_str()),
            ("CHECK_TEXT", self.text.as_str()),
            ("CHECK_DETAILS_URL", self.details_url.as_str()),
            ("CHECK_EXTERNAL_ID", self.external_id.as_str()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }
}

/// Immutable snapshot of a notification at the moment it is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationSend {
    /// `{name}-notification-{sequence}`, unique per attempt.
    pub job_name: String,
    pub sequence: u64,
    pub name: String,
    pub conclusion: Option<Conclusion>,
    pub env: BTreeMap<String, String>,
}

impl NotificationSend {
    pub fn get(&self, key: &str) -> &str {
        self.env.get(key).map(String::as_str).unwrap_or("")
    }
}
