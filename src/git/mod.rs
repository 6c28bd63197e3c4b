pub mod executor;
pub mod gateway;
pub mod parser;
pub mod repository;
pub mod version;

// Re-export commonly used types
pub use executor::{CommandOutput, GitExecutor};
pub use gateway::{
    Ack, BranchResult, BranchSummary, CommitDetail, CommitRecord, CommitResult, CommitSummary,
    ConfigSnapshot, FileLists, PullResult, RemoteEntry, RenamedFile, RepositoryGateway,
    StatusSnapshot, DEFAULT_HISTORY_LIMIT,
};
pub use parser::{
    EntryKind, PorcelainStatus, StatusEntry, categorize, parse_ahead_behind, parse_commit_output,
    parse_log, parse_ref_names, parse_remotes, parse_status_porcelain_v2,
};
pub use repository::{GitGateway, Repository};
pub use version::GitVersion;
