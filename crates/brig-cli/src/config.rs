//! CLI configuration management.

use brig_core::Project;
use brig_dispatch::PipelineConfig;
use brig_notify::DEFAULT_CHECK_RUN_IMAGE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// How check-run notifications are delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifierMode {
    /// Run the check-run image as a job.
    #[default]
    Job,
    /// Call the GitHub Checks API directly.
    Api,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default)]
    pub mode: NotifierMode,
    #[serde(default = "default_check_run_image")]
    pub check_run_image: String,
    /// GitHub Enterprise API base for `api` mode.
    #[serde(default)]
    pub github_base_url: Option<String>,
}

fn default_check_run_image() -> String {
    DEFAULT_CHECK_RUN_IMAGE.to_string()
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            mode: NotifierMode::default(),
            check_run_image: default_check_run_image(),
            github_base_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerSettings {
    /// Kill jobs after this many seconds; unset leaves it to the platform.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    /// Working directory for `--local` runs.
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,
}

fn default_workspace() -> PathBuf {
    PathBuf::from(".")
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: None,
            workspace: default_workspace(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrigConfig {
    #[serde(default)]
    pub project: Project,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub runner: RunnerSettings,
}

impl BrigConfig {
    /// Load from `path`, or from the default location if it exists, then
    /// apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::config_path()?;
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let dirs = directories::ProjectDirs::from("io", "brigadecore", "brig")
            .ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.yaml"))
    }

    /// Secrets injected through the environment win over the file.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let secrets = &mut self.project.secrets;
        let overrides = [
            ("DOCKERHUB_REGISTRY", &mut secrets.dockerhub_registry),
            ("DOCKERHUB_ORG", &mut secrets.dockerhub_org),
            ("DOCKERHUB_USERNAME", &mut secrets.dockerhub_username),
            ("DOCKERHUB_PASSWORD", &mut secrets.dockerhub_password),
        ];
        for (key, slot) in overrides {
            if let Some(value) = lookup(key) {
                *slot = Some(value);
            }
        }
        if let Some(url) = lookup("GITHUB_BASE_URL") {
            self.notifier.github_base_url = Some(url);
        }
    }

    /// YAML rendering with the registry credentials masked.
    pub fn redacted_yaml(&self) -> Result<String, ConfigError> {
        let mut shown = self.clone();
        let secrets = &mut shown.project.secrets;
        for slot in [&mut secrets.dockerhub_username, &mut secrets.dockerhub_password] {
            if slot.is_some() {
                *slot = Some("***".to_string());
            }
        }
        Ok(serde_yaml::to_string(&shown)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "project:\n  secrets:\n    dockerhubOrg: acme\nnotifier:\n  mode: api"
        )
        .unwrap();

        let config = BrigConfig::from_file(file.path()).unwrap();
        assert_eq!(config.project.secrets.org(), "acme");
        assert_eq!(config.project.secrets.registry(), "docker.io");
        assert_eq!(config.notifier.mode, NotifierMode::Api);
        assert_eq!(config.notifier.check_run_image, DEFAULT_CHECK_RUN_IMAGE);
        assert_eq!(config.pipeline.main_branch, "refs/heads/master");
    }

    #[test]
    fn test_env_overrides_secrets() {
        let env: HashMap<&str, &str> = [
            ("DOCKERHUB_USERNAME", "bot"),
            ("DOCKERHUB_PASSWORD", "pw"),
        ]
        .into();
        let mut config = BrigConfig::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.project.secrets.username(), "bot");
        assert_eq!(config.project.secrets.password(), "pw");
        assert_eq!(config.project.secrets.dockerhub_registry, None);
    }

    #[test]
    fn test_redacted_yaml_hides_credentials() {
        let mut config = BrigConfig::default();
        config.project.secrets.dockerhub_username = Some("release-bot".to_string());
        config.project.secrets.dockerhub_password = Some("hunter2".to_string());

        let yaml = config.redacted_yaml().unwrap();
        assert!(!yaml.contains("hunter2"));
        assert!(!yaml.contains("release-bot"));
        assert!(yaml.contains("***"));
    }
}
