use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GatewayResult;
use crate::security::{ConfigEntry, RepoPath};

/// Default number of commits returned by history queries
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Working tree and branch state, re-read from the repository on every call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub current: Option<String>,
    pub tracking: Option<String>,
    pub ahead: u32,
    pub behind: u32,
    pub files: FileLists,
    pub is_clean: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLists {
    pub modified: Vec<String>,
    pub added: Vec<String>,
    pub deleted: Vec<String>,
    pub untracked: Vec<String>,
    pub staged: Vec<String>,
    pub renamed: Vec<RenamedFile>,
    pub conflicted: Vec<String>,
}

impl FileLists {
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty()
            && self.added.is_empty()
            && self.deleted.is_empty()
            && self.untracked.is_empty()
            && self.staged.is_empty()
            && self.renamed.is_empty()
            && self.conflicted.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenamedFile {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchSummary {
    pub current: Option<String>,
    pub local: Vec<String>,
    pub remote: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    pub hash: String,
    pub short_hash: String,
    /// Subject line
    pub message: String,
    pub body: String,
    pub author: String,
    pub email: String,
    /// Author date, strict ISO 8601
    pub date: String,
    /// Ref decorations, empty when the commit has none
    pub refs: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitDetail {
    #[serde(flatten)]
    pub record: CommitRecord,
    pub diff: String,
    pub stats: String,
    pub name_status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEntry {
    pub name: String,
    pub fetch_url: String,
    pub push_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSnapshot {
    pub user_name: String,
    pub user_email: String,
    pub default_branch: String,
}

/// Plain acknowledgement for operations with nothing else to report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchResult {
    pub success: bool,
    pub branch: String,
}

impl BranchResult {
    pub fn ok(branch: &str) -> Self {
        Self {
            success: true,
            branch: branch.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub changes: u32,
    pub insertions: u32,
    pub deletions: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitResult {
    pub success: bool,
    /// Abbreviated hash of the new commit
    pub commit: String,
    pub summary: CommitSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullResult {
    pub success: bool,
    /// Backend output describing what was integrated
    pub result: String,
}

/// The fixed set of version-control operations exposed over HTTP.
///
/// Path and config inputs arrive as [`RepoPath`] / [`ConfigEntry`], which can
/// only be built by the validators, so implementations never see unchecked
/// caller input. An empty path list means "every path".
#[async_trait]
pub trait RepositoryGateway: Send + Sync {
    /// Repository root every path is relative to
    fn root(&self) -> &Path;

    async fn get_status(&self) -> GatewayResult<StatusSnapshot>;

    async fn get_branches(&self) -> GatewayResult<BranchSummary>;

    async fn create_branch(&self, name: &str, checkout: bool) -> GatewayResult<BranchResult>;

    async fn checkout_branch(&self, name: &str) -> GatewayResult<BranchResult>;

    async fn delete_branch(&self, name: &str) -> GatewayResult<BranchResult>;

    /// Most recent first, at most `limit` entries; empty on an unborn branch
    async fn get_commit_history(&self, limit: usize) -> GatewayResult<Vec<CommitRecord>>;

    async fn get_commit_details(&self, hash: &str) -> GatewayResult<CommitDetail>;

    async fn get_diff(&self, path: Option<&RepoPath>, staged: bool) -> GatewayResult<String>;

    async fn stage_files(&self, paths: &[RepoPath]) -> GatewayResult<Ack>;

    async fn unstage_files(&self, paths: &[RepoPath]) -> GatewayResult<Ack>;

    async fn commit(&self, message: &str) -> GatewayResult<CommitResult>;

    async fn discard_changes(&self, paths: &[RepoPath]) -> GatewayResult<Ack>;

    async fn get_remotes(&self) -> GatewayResult<Vec<RemoteEntry>>;

    async fn fetch(&self) -> GatewayResult<Ack>;

    async fn pull(&self, rebase: bool) -> GatewayResult<PullResult>;

    async fn push(&self, force: bool, set_upstream: bool) -> GatewayResult<Ack>;

    async fn get_config(&self) -> GatewayResult<ConfigSnapshot>;

    async fn set_config(&self, entry: &ConfigEntry) -> GatewayResult<Ack>;
}
