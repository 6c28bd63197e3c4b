pub mod config_policy;
pub mod session;
pub mod validator;

pub use config_policy::{ConfigEntry, ConfigPolicy};
pub use session::{SessionGuard, SessionToken, CSRF_HEADER};
pub use validator::{PathValidator, RepoPath, ValidationError};

/// Allowlist of configuration keys that callers may write
///
/// The config primitive accepts any key, so anything outside this list
/// (core.hooksPath, url.*.insteadOf, core.sshCommand, ...) would let a
/// caller change how git executes. Keys are stored lowercase; git treats
/// section and variable names case-insensitively.
///
/// Adding a key here requires careful security review.
pub const ALLOWED_CONFIG_KEYS: &[&str] = &[
    "user.name",
    "user.email",
    "init.defaultbranch",
];
