//! Ref matching for push and check events.

use regex::Regex;
use std::sync::LazyLock;

/// Release tags: `refs/tags/vMAJOR[.MINOR[.PATCH...]][-pre]`.
static RELEASE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^refs/tags/(v[0-9]+(?:\.[0-9]+)*(?:-.+)?)$").expect("valid release tag pattern")
});

/// The version named by a release tag ref, verbatim from the tag.
pub fn release_version(git_ref: &str) -> Option<&str> {
    RELEASE_TAG
        .captures(git_ref)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// What a ref means to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind<'a> {
    Release { version: &'a str },
    MainBranch,
    Other,
}

/// Classifies refs against the configured main branch.
#[derive(Debug, Clone)]
pub struct RefMatcher {
    main_branch: String,
}

impl RefMatcher {
    /// `main_branch` may be a full ref (`refs/heads/master`) or a bare name.
    pub fn new(main_branch: impl Into<String>) -> Self {
        let main_branch = main_branch.into();
        let main_branch = match main_branch.strip_prefix("refs/heads/") {
            Some(name) => name.to_string(),
            None => main_branch,
        };
        Self { main_branch }
    }

    pub fn main_ref(&self) -> String {
        format!("refs/heads/{}", self.main_branch)
    }

    /// Push events carry full refs.
    pub fn is_main_ref(&self, git_ref: &str) -> bool {
        git_ref
            .strip_prefix("refs/heads/")
            .is_some_and(|name| name == self.main_branch)
    }

    /// Check events may carry either the bare head branch or a full ref.
    pub fn is_main_branch(&self, git_ref: &str) -> bool {
        git_ref == self.main_branch || self.is_main_ref(git_ref)
    }

    pub fn classify<'a>(&self, git_ref: &'a str) -> RefKind<'a> {
        if let Some(version) = release_version(git_ref) {
            return RefKind::Release { version };
        }
        if self.is_main_ref(git_ref) {
            return RefKind::MainBranch;
        }
        RefKind::Other
    }
}

impl Default for RefMatcher {
    fn default() -> Self {
        Self::new("master")
    }
}
