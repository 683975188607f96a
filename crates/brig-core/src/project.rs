//! Project context: identity, secrets and their documented defaults.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_REGISTRY: &str = "docker.io";
pub const DEFAULT_ORG: &str = "brigadecore";
pub const DEFAULT_PROJECT: &str = "brigade-github-app";
pub const DEFAULT_DETAILS_URL_BASE: &str = "https://brigadecore.github.io/kashti/builds";

/// Secrets the host platform injects into a project.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSecrets {
    #[serde(default, alias = "dockerhubRegistry")]
    pub dockerhub_registry: Option<String>,
    #[serde(default, alias = "dockerhubOrg")]
    pub dockerhub_org: Option<String>,
    #[serde(default, alias = "dockerhubUsername")]
    pub dockerhub_username: Option<String>,
    #[serde(default, alias = "dockerhubPassword")]
    pub dockerhub_password: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl ProjectSecrets {
    /// Image registry, `docker.io` unless configured.
    pub fn registry(&self) -> &str {
        non_empty(&self.dockerhub_registry).unwrap_or(DEFAULT_REGISTRY)
    }

    /// Image organisation, `brigadecore` unless configured.
    pub fn org(&self) -> &str {
        non_empty(&self.dockerhub_org).unwrap_or(DEFAULT_ORG)
    }

    pub fn username(&self) -> &str {
        self.dockerhub_username.as_deref().unwrap_or("")
    }

    pub fn password(&self) -> &str {
        self.dockerhub_password.as_deref().unwrap_or("")
    }
}

impl fmt::Debug for ProjectSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "***");
        f.debug_struct("ProjectSecrets")
            .field("dockerhub_registry", &self.dockerhub_registry)
            .field("dockerhub_org", &self.dockerhub_org)
            .field("dockerhub_username", &redact(&self.dockerhub_username))
            .field("dockerhub_password", &redact(&self.dockerhub_password))
            .finish()
    }
}

/// The project an event is dispatched for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Source organisation, used for the Go import path.
    #[serde(default = "default_org")]
    pub org: String,
    #[serde(default = "default_name")]
    pub name: String,
    /// Base URL build details are linked under.
    #[serde(default = "default_details_url_base")]
    pub details_url_base: String,
    #[serde(default)]
    pub secrets: ProjectSecrets,
}

fn default_org() -> String {
    DEFAULT_ORG.to_string()
}

fn default_name() -> String {
    DEFAULT_PROJECT.to_string()
}

fn default_details_url_base() -> String {
    DEFAULT_DETAILS_URL_BASE.to_string()
}

impl Default for Project {
    fn default() -> Self {
        Self {
            org: default_org(),
            name: default_name(),
            details_url_base: default_details_url_base(),
            secrets: ProjectSecrets::default(),
        }
    }
}

impl Project {
    pub fn with_secrets(mut self, secrets: ProjectSecrets) -> Self {
        self.secrets = secrets;
        self
    }

    /// Link to the build page for a build id.
    pub fn details_url(&self, build_id: &str) -> String {
        format!("{}/{}", self.details_url_base.trim_end_matches('/'), build_id)
    }
}
