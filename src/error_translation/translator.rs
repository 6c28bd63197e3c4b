use crate::error::{GatewayError, GitError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFriendlyError {
    pub simple_message: String,
    pub suggestion: Option<String>,
    pub raw_error: String,
}

/// Turns raw gateway failures into short explanations for the browser client.
///
/// The raw error is always preserved; translation only adds context.
pub struct ErrorTranslator;

impl ErrorTranslator {
    pub fn translate_gateway_error(error: &GatewayError) -> UserFriendlyError {
        match error {
            GatewayError::Backend(git_err) => Self::translate(git_err),
            GatewayError::Forbidden => UserFriendlyError {
                simple_message: "Request rejected: session token missing or stale.".to_string(),
                suggestion: Some("Reload the page to obtain a fresh token.".to_string()),
                raw_error: error.to_string(),
            },
            GatewayError::Validation(_) | GatewayError::NotFound(_) => UserFriendlyError {
                simple_message: error.to_string(),
                suggestion: None,
                raw_error: error.to_string(),
            },
        }
    }

    /// Translate a GitError into a user-friendly error message
    pub fn translate(error: &GitError) -> UserFriendlyError {
        let raw_error = error.to_string();

        let (simple_message, suggestion) = match error {
            GitError::NotARepository => (
                "The served directory is not a git repository.".to_string(),
                Some("Restart webgit with --dir pointing at a repository.".to_string()),
            ),
            GitError::LockContention(_) => (
                "Another git process is working in this repository.".to_string(),
                Some("Wait for it to finish and retry. Remove .git/index.lock only if no git process is running.".to_string()),
            ),
            GitError::Timeout(..) => (
                "The git command took too long and was stopped.".to_string(),
                Some("Check network connectivity for remote operations, then retry.".to_string()),
            ),
            _ => Self::match_error_patterns(error.stderr().unwrap_or(&raw_error)),
        };

        UserFriendlyError {
            simple_message,
            suggestion,
            raw_error,
        }
    }

    /// Match common git error patterns
    fn match_error_patterns(error_text: &str) -> (String, Option<String>) {
        let lower = error_text.to_lowercase();

        if lower.contains("no upstream") || lower.contains("does not have an upstream") {
            return (
                "No remote branch is configured for tracking.".to_string(),
                Some("Push with \"set upstream\" enabled to create one.".to_string()),
            );
        }

        if lower.contains("conflict") {
            return (
                "The operation stopped with conflicts that need to be resolved.".to_string(),
                Some("Fix the conflicted files, stage them and commit (or continue the rebase).".to_string()),
            );
        }

        if lower.contains("nothing to commit") || lower.contains("no changes added to commit") {
            return ("No files staged for commit.".to_string(), Some("Stage files first.".to_string()));
        }

        if lower.contains("pathspec") && lower.contains("did not match") {
            return (
                "File path not found in the repository.".to_string(),
                Some("Refresh the status view and try again.".to_string()),
            );
        }

        if lower.contains("already exists") && (lower.contains("branch") || lower.contains("ref")) {
            return (
                "A branch with that name already exists.".to_string(),
                Some("Use a different name or delete the existing branch first.".to_string()),
            );
        }

        if lower.contains("not fully merged") {
            return (
                "The branch has commits that are not merged anywhere else.".to_string(),
                Some("Merge it first if you want to keep its commits.".to_string()),
            );
        }

        if lower.contains("authentication failed")
            || lower.contains("permission denied")
            || lower.contains("terminal prompts disabled")
        {
            return (
                "Authentication with the remote failed.".to_string(),
                Some("Configure a credential helper or SSH key; webgit cannot prompt for passwords.".to_string()),
            );
        }

        if lower.contains("would be overwritten") {
            return (
                "Operation would overwrite uncommitted changes.".to_string(),
                Some("Commit or discard your changes first.".to_string()),
            );
        }

        if lower.contains("non-fast-forward") || lower.contains("fetch first") || lower.contains("diverged") {
            return (
                "Local and remote branches have diverged.".to_string(),
                Some("Pull the remote changes first.".to_string()),
            );
        }

        if lower.contains("could not resolve host") || lower.contains("could not read from remote") {
            return (
                "The remote repository could not be reached.".to_string(),
                Some("Check the remote URL and your network connection.".to_string()),
            );
        }

        (error_text.to_string(), None)
    }
}
