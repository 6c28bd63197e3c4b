pub mod audit;
pub mod config;
pub mod error;
pub mod error_translation;
pub mod git;
pub mod security;
pub mod server;

// Re-export commonly used types for convenience
pub use error::{AppError, GatewayError, GitError};
pub use git::{GitGateway, GitVersion, Repository, RepositoryGateway};
pub use security::{ConfigPolicy, PathValidator, SessionGuard};
pub use server::{router, AppState};
