use crate::error::{GitError, GitResult};
use std::fmt;
use tokio::process::Command;

/// Oldest git that ships `git switch`, which branch checkout relies on
const MIN_GIT_VERSION: GitVersion = GitVersion {
    major: 2,
    minor: 23,
    patch: 0,
};

/// Installed git version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GitVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl GitVersion {
    /// Run `git --version` and parse the result
    pub async fn detect() -> GitResult<Self> {
        let output = Command::new("git")
            .arg("--version")
            .env("LC_ALL", "C")
            .output()
            .await
            .map_err(|e| GitError::GitVersionDetectionFailed(format!("Failed to execute git: {}", e)))?;

        if !output.status.success() {
            return Err(GitError::GitVersionDetectionFailed(
                "git --version exited with an error".to_string(),
            ));
        }

        Self::parse(&String::from_utf8_lossy(&output.stdout))
    }

    /// Parse strings like "git version 2.39.2" or "git version 2.39.2.windows.1"
    pub fn parse(version_str: &str) -> GitResult<Self> {
        let numbers = version_str
            .trim()
            .strip_prefix("git version ")
            .and_then(|rest| rest.split_whitespace().next())
            .ok_or_else(|| {
                GitError::ParseError(format!("Unexpected git version format: {}", version_str.trim()))
            })?;

        let mut parts = numbers.split('.');
        let mut component = |name: &str, required: bool| -> GitResult<u32> {
            match parts.next() {
                Some(part) => {
                    // Suffixes like "3-rc1" keep their leading digits
                    let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
                    match digits.parse() {
                        Ok(n) => Ok(n),
                        Err(_) if !required => Ok(0),
                        Err(_) => Err(GitError::ParseError(format!("Invalid {} version: {}", name, part))),
                    }
                }
                None if !required => Ok(0),
                None => Err(GitError::ParseError(format!("Missing {} version in {}", name, numbers))),
            }
        };

        let major = component("major", true)?;
        let minor = component("minor", true)?;
        let patch = component("patch", false)?;

        Ok(GitVersion { major, minor, patch })
    }

    pub fn is_supported(&self) -> bool {
        *self >= MIN_GIT_VERSION
    }

    /// Detect the installed git and refuse versions that are too old
    pub async fn validate() -> GitResult<Self> {
        let version = Self::detect().await?;
        if !version.is_supported() {
            return Err(GitError::GitVersionTooOld(version.to_string()));
        }
        Ok(version)
    }
}

impl fmt::Display for GitVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
