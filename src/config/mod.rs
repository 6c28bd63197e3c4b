pub mod settings;

pub use settings::{parse_port, AuditConfig, Config, ConfigError, GitConfig, HistoryConfig, ServerConfig};
