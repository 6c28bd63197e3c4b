use crate::error::{GitError, GitResult};
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

/// Default upper bound for a single git invocation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of executing a git command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub success: bool,
}

/// Executes git commands within a repository
///
/// Arguments are passed as a vector straight to the `git` binary; nothing
/// goes through a shell.
#[derive(Debug, Clone)]
pub struct GitExecutor {
    repo_path: PathBuf,
    timeout: Duration,
}

impl GitExecutor {
    /// Create a new GitExecutor for the given repository path
    pub fn new<P: AsRef<Path>>(repo_path: P) -> Self {
        Self {
            repo_path: repo_path.as_ref().to_path_buf(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Execute a git command and fail on a non-zero exit
    ///
    /// Example: `executor.execute(&["status", "--porcelain=v2"])`
    pub async fn execute<S: AsRef<str>>(&self, args: &[S]) -> GitResult<CommandOutput> {
        let output = self.run(args).await?;
        if !output.success {
            return Err(self.failure(args, &output));
        }
        Ok(output)
    }

    /// Execute a git command and return its output whatever the exit code
    ///
    /// Spawn failures and timeouts are still errors.
    pub async fn run<S: AsRef<str>>(&self, args: &[S]) -> GitResult<CommandOutput> {
        let args: Vec<&str> = args.iter().map(|a| a.as_ref()).collect();
        if args.is_empty() {
            return Err(GitError::CommandFailed {
                command: String::new(),
                exit_code: -1,
                stderr: "Empty command".to_string(),
            });
        }

        let mut command = Command::new("git");
        command
            .args(&args)
            .current_dir(&self.repo_path)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_LITERAL_PATHSPECS", "1")
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn()?;
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(subcommand = args[0], timeout = ?self.timeout, "git command timed out");
                return Err(GitError::Timeout(args[0].to_string(), self.timeout));
            }
        };

        let output = Self::process_output(output);
        tracing::debug!(subcommand = args[0], exit_code = output.exit_code, "git command finished");
        Ok(output)
    }

    /// Process raw process output into a CommandOutput
    fn process_output(output: Output) -> CommandOutput {
        CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            success: output.status.success(),
        }
    }

    /// Map a failed command onto the error taxonomy
    fn failure<S: AsRef<str>>(&self, args: &[S], output: &CommandOutput) -> GitError {
        if is_lock_contention(&output.stderr) {
            return GitError::LockContention(output.stderr.trim().to_string());
        }

        // Some failures (nothing to commit, merge conflicts) are reported on stdout
        let stderr = [output.stderr.trim(), output.stdout.trim()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("\n");

        // Only the subcommand is reported; config values and paths stay out of messages
        GitError::CommandFailed {
            command: args.first().map(|a| a.as_ref().to_string()).unwrap_or_default(),
            exit_code: output.exit_code,
            stderr,
        }
    }

    /// Get the repository path
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn is_lock_contention(stderr: &str) -> bool {
    stderr.contains("index.lock")
        || (stderr.contains("Unable to create") && stderr.contains(".lock"))
        || stderr.contains("cannot lock ref")
}
