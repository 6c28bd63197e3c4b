use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid file path: expected a string, got {0}")]
    NotAString(String),

    #[error("Invalid file path: path is empty")]
    EmptyPath,

    #[error("Invalid file path: absolute paths are not allowed: {0}")]
    AbsolutePath(String),

    #[error("Invalid file path: path traversal detected: {0}")]
    PathTraversal(String),

    #[error("Invalid config key: {key}. Allowed keys: {}", allowed.join(", "))]
    ConfigKeyNotAllowed {
        key: String,
        allowed: Vec<&'static str>,
    },

    #[error("Invalid config value for {0}: value must be a string")]
    ConfigValueNotString(String),

    #[error("Invalid config value for {0}: value must not be empty")]
    ConfigValueEmpty(String),

    #[error("Invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("Commit message must not be empty")]
    EmptyCommitMessage,

    #[error("Cannot set upstream: HEAD is not on a branch")]
    DetachedHead,

    #[error("Invalid port number: {0}")]
    InvalidPort(String),

    #[error("Malformed request body: {0}")]
    MalformedBody(String),
}

/// A caller-supplied path that has passed [`PathValidator`] checks.
///
/// Always relative, `/`-separated and free of `..` segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoPath(String);

impl RepoPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RepoPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Confines caller-supplied paths to the repository root.
///
/// Validation is purely lexical: nothing on disk is read, so it can run
/// before any backend call and cannot race with other requests.
#[derive(Debug, Clone)]
pub struct PathValidator {
    root: PathBuf,
}

impl PathValidator {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate a single path
    pub fn validate(&self, input: &str) -> Result<RepoPath, ValidationError> {
        if input.is_empty() {
            return Err(ValidationError::EmptyPath);
        }

        // NUL cannot appear in a real path and truncates C strings downstream
        if input.contains('\0') {
            return Err(ValidationError::PathTraversal(input.escape_default().to_string()));
        }

        let normalized = normalize(input);

        if is_absolute(&normalized) {
            return Err(ValidationError::AbsolutePath(input.to_string()));
        }

        if normalized.split('/').any(|segment| segment == "..") {
            return Err(ValidationError::PathTraversal(input.to_string()));
        }

        // Resolve against the root and make sure the result is still inside it
        let resolved = lexical_resolve(&self.root.join(&normalized));
        let root = lexical_resolve(&self.root);
        match resolved.strip_prefix(&root) {
            Ok(relative) => {
                if relative
                    .components()
                    .next()
                    .is_some_and(|c| matches!(c, Component::ParentDir))
                {
                    return Err(ValidationError::PathTraversal(input.to_string()));
                }
            }
            Err(_) => return Err(ValidationError::PathTraversal(input.to_string())),
        }

        Ok(RepoPath(normalized))
    }

    /// Validate a batch; a single bad element rejects the whole batch
    pub fn validate_all<S: AsRef<str>>(&self, inputs: &[S]) -> Result<Vec<RepoPath>, ValidationError> {
        inputs
            .iter()
            .map(|input| self.validate(input.as_ref()))
            .collect()
    }

    /// Validate untyped JSON input: either one string or an array of strings
    pub fn validate_json(&self, value: &Value) -> Result<Vec<RepoPath>, ValidationError> {
        match value {
            Value::String(path) => Ok(vec![self.validate(path)?]),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(path) => self.validate(path),
                    other => Err(ValidationError::NotAString(json_type_name(other).to_string())),
                })
                .collect(),
            other => Err(ValidationError::NotAString(json_type_name(other).to_string())),
        }
    }
}

/// Lexically collapse `.` and `..` segments, treating both `/` and `\` as separators.
///
/// Leading `..` segments of a relative path are kept; `..` above an absolute
/// root is dropped. An empty result becomes `.`.
pub fn normalize(input: &str) -> String {
    let absolute = input.starts_with(['/', '\\']);
    let mut segments: Vec<&str> = Vec::new();

    for segment in input.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if absolute {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

fn is_absolute(normalized: &str) -> bool {
    if normalized.starts_with('/') {
        return true;
    }
    // Windows drive prefix such as `C:` or `c:foo`
    let bytes = normalized.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn lexical_resolve(path: &Path) -> PathBuf {
    let mut resolved = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() {
                    resolved.push("..");
                }
            }
            other => resolved.push(other.as_os_str()),
        }
    }
    resolved
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
