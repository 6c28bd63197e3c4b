use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::audit::{AuditLogger, Outcome};
use crate::error::{GatewayError, GatewayResult, GitError, GitResult};
use crate::git::executor::{CommandOutput, GitExecutor};
use crate::git::gateway::{
    Ack, BranchResult, BranchSummary, CommitDetail, CommitRecord, CommitResult, ConfigSnapshot,
    PullResult, RemoteEntry, RepositoryGateway, StatusSnapshot,
};
use crate::git::parser::{self, LOG_FORMAT};
use crate::security::{ConfigEntry, RepoPath, ValidationError};

/// A git working directory fixed at startup
#[derive(Debug, Clone)]
pub struct Repository {
    path: PathBuf,
    executor: GitExecutor,
}

impl Repository {
    /// Open the repository rooted at `dir`
    ///
    /// The directory must exist and contain a `.git` entry (a directory, or a
    /// gitfile for worktrees and submodules). The canonical path becomes the
    /// root all caller paths are validated against.
    pub fn open<P: AsRef<Path>>(dir: P) -> GitResult<Self> {
        let path = dir.as_ref().canonicalize()?;
        if !path.is_dir() || !path.join(".git").exists() {
            return Err(GitError::NotARepository);
        }
        Ok(Self::new(path))
    }

    /// Create a Repository for a path without checking it
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let executor = GitExecutor::new(&path);

        Self { path, executor }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.executor = self.executor.with_timeout(timeout);
        self
    }

    /// Get the repository path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the git executor for this repository
    pub fn executor(&self) -> &GitExecutor {
        &self.executor
    }
}

/// [`RepositoryGateway`] backed by the `git` binary.
///
/// Holds no cached state: every read re-derives from the live repository,
/// which other tools may change at any time. No lock is taken around
/// operations; git's own index and ref locks serialize writers, and a
/// contended lock surfaces as a retryable [`GitError::LockContention`].
#[derive(Debug)]
pub struct GitGateway {
    repo: Repository,
    audit: Option<Arc<AuditLogger>>,
}

impl GitGateway {
    pub fn new(repo: Repository) -> Self {
        Self { repo, audit: None }
    }

    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = Some(Arc::new(audit));
        self
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    async fn git<S: AsRef<str>>(&self, args: &[S]) -> GitResult<CommandOutput> {
        self.repo.executor.execute(args).await
    }

    /// Run a query whose non-zero exit is an answer, not a failure
    async fn try_git<S: AsRef<str>>(&self, args: &[S]) -> GitResult<CommandOutput> {
        self.repo.executor.run(args).await
    }

    async fn has_head(&self) -> GitResult<bool> {
        Ok(self.try_git(&["rev-parse", "--verify", "--quiet", "HEAD"]).await?.success)
    }

    async fn current_branch(&self) -> GitResult<Option<String>> {
        let output = self.git(&["branch", "--show-current"]).await?;
        let branch = output.stdout.trim();
        Ok((!branch.is_empty()).then(|| branch.to_string()))
    }

    /// Commits in each direction between HEAD and `upstream`; unknown counts as zero
    async fn ahead_behind(&self, upstream: &str) -> (u32, u32) {
        let range = format!("HEAD...{}", upstream);
        match self.try_git(&["rev-list", "--left-right", "--count", range.as_str()]).await {
            Ok(output) if output.success => parser::parse_ahead_behind(&output.stdout).unwrap_or((0, 0)),
            Ok(output) => {
                tracing::debug!(upstream, stderr = output.stderr.trim(), "ahead/behind unavailable");
                (0, 0)
            }
            Err(e) => {
                tracing::debug!(upstream, error = %e, "ahead/behind unavailable");
                (0, 0)
            }
        }
    }

    /// Reject names git would refuse or read as an option
    async fn check_branch_name(&self, name: &str) -> GatewayResult<()> {
        if name.is_empty() || name.starts_with('-') || name.contains("@{") {
            return Err(ValidationError::InvalidBranchName(name.to_string()).into());
        }
        let output = self.try_git(&["check-ref-format", "--branch", name]).await?;
        if !output.success {
            return Err(ValidationError::InvalidBranchName(name.to_string()).into());
        }
        Ok(())
    }

    async fn audit<T>(&self, operation: &str, target: &str, result: &GatewayResult<T>) {
        let outcome = match result {
            Ok(_) => {
                tracing::info!(operation, target, "repository operation completed");
                Outcome::Ok
            }
            Err(e) => {
                tracing::warn!(operation, error = %e, "repository operation failed");
                Outcome::Failed
            }
        };

        let Some(audit) = self.audit.clone() else {
            return;
        };
        let operation = operation.to_string();
        let target = target.to_string();
        let repo = self.repo.path().to_path_buf();

        // File I/O stays off the async workers
        let written = tokio::task::spawn_blocking(move || audit.record(&operation, &target, &repo, outcome)).await;
        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "failed to write audit log"),
            Err(e) => tracing::warn!(error = %e, "audit log task did not complete"),
        }
    }
}

fn describe_paths(paths: &[RepoPath]) -> String {
    match paths.len() {
        0 => "all paths".to_string(),
        1 => "1 path".to_string(),
        n => format!("{} paths", n),
    }
}

fn with_paths<'a>(mut args: Vec<&'a str>, paths: &'a [RepoPath], all: &'a str) -> Vec<&'a str> {
    args.push("--");
    if paths.is_empty() {
        args.push(all);
    } else {
        args.extend(paths.iter().map(RepoPath::as_str));
    }
    args
}

/// Abbreviated or full hex object name
fn looks_like_object_name(hash: &str) -> bool {
    (4..=64).contains(&hash.len()) && hash.chars().all(|c| c.is_ascii_hexdigit())
}

#[async_trait]
impl RepositoryGateway for GitGateway {
    fn root(&self) -> &Path {
        self.repo.path()
    }

    async fn get_status(&self) -> GatewayResult<StatusSnapshot> {
        let output = self
            .git(&["status", "--porcelain=v2", "--branch", "-z"])
            .await
            .map_err(|e| match e {
                GitError::CommandFailed { ref stderr, .. } if stderr.contains("not a git repository") => {
                    GitError::NotARepository
                }
                other => other,
            })?;
        let porcelain = parser::parse_status_porcelain_v2(&output.stdout)?;

        let (ahead, behind) = match &porcelain.upstream {
            Some(upstream) => self.ahead_behind(upstream).await,
            None => (0, 0),
        };

        Ok(StatusSnapshot {
            current: porcelain.head.clone(),
            tracking: porcelain.upstream.clone(),
            ahead,
            behind,
            files: parser::categorize(&porcelain.entries),
            is_clean: porcelain.entries.is_empty(),
        })
    }

    async fn get_branches(&self) -> GatewayResult<BranchSummary> {
        let current = self.current_branch().await?;
        let local = self.git(&["for-each-ref", "--format=%(refname)", "refs/heads/"]).await?;
        let remote = self.git(&["for-each-ref", "--format=%(refname)", "refs/remotes/"]).await?;

        Ok(BranchSummary {
            current,
            local: parser::parse_ref_names(&local.stdout, "refs/heads/"),
            remote: parser::parse_ref_names(&remote.stdout, "refs/remotes/"),
        })
    }

    async fn create_branch(&self, name: &str, checkout: bool) -> GatewayResult<BranchResult> {
        let result = async {
            self.check_branch_name(name).await?;
            if checkout {
                self.git(&["switch", "-c", name]).await?;
            } else {
                self.git(&["branch", name]).await?;
            }
            Ok::<_, GatewayError>(BranchResult::ok(name))
        }
        .await;
        self.audit("create_branch", name, &result).await;
        result
    }

    async fn checkout_branch(&self, name: &str) -> GatewayResult<BranchResult> {
        let result = async {
            self.check_branch_name(name).await?;
            match self.git(&["switch", name]).await {
                Ok(_) => Ok::<_, GatewayError>(BranchResult::ok(name)),
                Err(GitError::CommandFailed { ref stderr, .. }) if stderr.contains("invalid reference") => {
                    Err(GatewayError::NotFound(format!("Branch not found: {}", name)))
                }
                Err(e) => Err(e.into()),
            }
        }
        .await;
        self.audit("checkout_branch", name, &result).await;
        result
    }

    async fn delete_branch(&self, name: &str) -> GatewayResult<BranchResult> {
        let result = async {
            self.check_branch_name(name).await?;
            // -d, not -D: refusing to drop unmerged work is git's call and must reach the caller
            match self.git(&["branch", "-d", name]).await {
                Ok(_) => Ok::<_, GatewayError>(BranchResult::ok(name)),
                Err(GitError::CommandFailed { ref stderr, .. }) if stderr.contains("not found") => {
                    Err(GatewayError::NotFound(format!("Branch not found: {}", name)))
                }
                Err(e) => Err(e.into()),
            }
        }
        .await;
        self.audit("delete_branch", name, &result).await;
        result
    }

    async fn get_commit_history(&self, limit: usize) -> GatewayResult<Vec<CommitRecord>> {
        if limit == 0 || !self.has_head().await? {
            return Ok(Vec::new());
        }

        let count = limit.to_string();
        let output = self.git(&["log", "-n", count.as_str(), LOG_FORMAT]).await?;
        Ok(parser::parse_log(&output.stdout)?)
    }

    async fn get_commit_details(&self, hash: &str) -> GatewayResult<CommitDetail> {
        let not_found = || GatewayError::NotFound(format!("Commit not found: {}", hash));

        if !looks_like_object_name(hash) {
            return Err(not_found());
        }

        // Fails for unknown and for ambiguous abbreviations alike
        let spec = format!("{}^{{commit}}", hash);
        let resolved = self.try_git(&["rev-parse", "--verify", "--quiet", spec.as_str()]).await?;
        if !resolved.success {
            return Err(not_found());
        }
        let full = resolved.stdout.trim().to_string();

        let log = self.git(&["log", "-1", LOG_FORMAT, full.as_str()]).await?;
        let record = parser::parse_log(&log.stdout)?
            .into_iter()
            .next()
            .ok_or_else(not_found)?;

        let parent = format!("{}^", full);
        let has_parent = self
            .try_git(&["rev-parse", "--verify", "--quiet", parent.as_str()])
            .await?
            .success;
        let diff = if has_parent {
            self.git(&["diff", parent.as_str(), full.as_str()]).await?
        } else {
            // Root commit: compare against the empty tree
            self.git(&["diff-tree", "-r", "-p", "--root", "--no-commit-id", full.as_str()])
                .await?
        };

        let stats = self.git(&["show", "--stat", "--format=", full.as_str()]).await?;
        let name_status = self.git(&["show", "--name-status", "--format=", full.as_str()]).await?;

        Ok(CommitDetail {
            record,
            diff: diff.stdout,
            stats: stats.stdout,
            name_status: name_status.stdout,
        })
    }

    async fn get_diff(&self, path: Option<&RepoPath>, staged: bool) -> GatewayResult<String> {
        let mut args = vec!["diff"];
        if staged {
            args.push("--cached");
        }
        if let Some(path) = path {
            args.push("--");
            args.push(path.as_str());
        }
        Ok(self.git(args.as_slice()).await?.stdout)
    }

    async fn stage_files(&self, paths: &[RepoPath]) -> GatewayResult<Ack> {
        let result = async {
            if paths.is_empty() {
                self.git(&["add", "-A"]).await?;
            } else {
                self.git(with_paths(vec!["add"], paths, ".").as_slice()).await?;
            }
            Ok::<_, GatewayError>(Ack::ok())
        }
        .await;
        self.audit("stage", &describe_paths(paths), &result).await;
        result
    }

    async fn unstage_files(&self, paths: &[RepoPath]) -> GatewayResult<Ack> {
        let result = async {
            if self.has_head().await? {
                self.git(with_paths(vec!["reset", "-q", "HEAD"], paths, ".").as_slice()).await?;
            } else {
                // Nothing to reset to yet: drop the entries from the index
                let args = with_paths(vec!["rm", "--cached", "-r", "-q", "--ignore-unmatch"], paths, ".");
                self.git(args.as_slice()).await?;
            }
            Ok::<_, GatewayError>(Ack::ok())
        }
        .await;
        self.audit("unstage", &describe_paths(paths), &result).await;
        result
    }

    async fn commit(&self, message: &str) -> GatewayResult<CommitResult> {
        let result = async {
            if message.trim().is_empty() {
                return Err(ValidationError::EmptyCommitMessage.into());
            }
            let output = self.git(&["commit", "-m", message]).await?;
            let (commit, summary) = parser::parse_commit_output(&output.stdout)?;
            Ok::<_, GatewayError>(CommitResult {
                success: true,
                commit,
                summary,
            })
        }
        .await;
        let target = match &result {
            Ok(commit) => commit.commit.clone(),
            Err(_) => String::new(),
        };
        self.audit("commit", &target, &result).await;
        result
    }

    async fn discard_changes(&self, paths: &[RepoPath]) -> GatewayResult<Ack> {
        let result = async {
            self.git(with_paths(vec!["checkout"], paths, ".").as_slice()).await?;
            Ok::<_, GatewayError>(Ack::ok())
        }
        .await;
        self.audit("discard", &describe_paths(paths), &result).await;
        result
    }

    async fn get_remotes(&self) -> GatewayResult<Vec<RemoteEntry>> {
        let output = self.git(&["remote", "-v"]).await?;
        Ok(parser::parse_remotes(&output.stdout))
    }

    async fn fetch(&self) -> GatewayResult<Ack> {
        let result = async {
            self.git(&["fetch", "--all"]).await?;
            Ok::<_, GatewayError>(Ack::ok())
        }
        .await;
        self.audit("fetch", "all remotes", &result).await;
        result
    }

    async fn pull(&self, rebase: bool) -> GatewayResult<PullResult> {
        let result = async {
            let args: &[&str] = if rebase {
                &["pull", "--rebase"]
            } else {
                &["pull", "--no-rebase", "--no-edit"]
            };
            let output = self.git(args).await?;
            Ok::<_, GatewayError>(PullResult {
                success: true,
                result: output.stdout.trim().to_string(),
            })
        }
        .await;
        self.audit("pull", if rebase { "rebase" } else { "merge" }, &result).await;
        result
    }

    async fn push(&self, force: bool, set_upstream: bool) -> GatewayResult<Ack> {
        let result = async {
            let mut args = vec!["push".to_string()];
            if force {
                args.push("--force".to_string());
            }
            if set_upstream {
                // Read then push: a branch switch in between is not guarded against
                let branch = self
                    .current_branch()
                    .await?
                    .ok_or(GatewayError::Validation(ValidationError::DetachedHead))?;
                args.extend(["-u".to_string(), "origin".to_string(), branch]);
            }
            self.git(args.as_slice()).await?;
            Ok::<_, GatewayError>(Ack::ok())
        }
        .await;
        let target = match (force, set_upstream) {
            (true, true) => "force, set upstream",
            (true, false) => "force",
            (false, true) => "set upstream",
            (false, false) => "",
        };
        self.audit("push", target, &result).await;
        result
    }

    async fn get_config(&self) -> GatewayResult<ConfigSnapshot> {
        let read = |key: &'static str| async move {
            let output = self.try_git(&["config", "--get", key]).await?;
            Ok::<_, GitError>(output.success.then(|| output.stdout.trim().to_string()))
        };

        Ok(ConfigSnapshot {
            user_name: read("user.name").await?.unwrap_or_default(),
            user_email: read("user.email").await?.unwrap_or_default(),
            default_branch: read("init.defaultbranch")
                .await?
                .unwrap_or_else(|| "main".to_string()),
        })
    }

    async fn set_config(&self, entry: &ConfigEntry) -> GatewayResult<Ack> {
        let result = async {
            self.git(&["config", "--local", "--", entry.key(), entry.value()]).await?;
            Ok::<_, GatewayError>(Ack::ok())
        }
        .await;
        self.audit("set_config", entry.key(), &result).await;
        result
    }
}
