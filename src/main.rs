use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use webgit::audit::AuditLogger;
use webgit::config::{parse_port, Config};
use webgit::error::AppResult;
use webgit::git::{GitGateway, GitVersion, Repository};
use webgit::security::SessionGuard;
use webgit::server::{self, AppState};

/// Serve a local git repository to the browser
#[derive(Debug, Parser)]
#[command(name = "webgit", version, about)]
struct Cli {
    /// Port to listen on (loopback only)
    #[arg(short, long)]
    port: Option<String>,

    /// Repository directory, defaults to the current directory
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Open the UI in the default browser once the server is up
    #[arg(short, long)]
    open: bool,

    /// Read settings from this file instead of ~/.config/webgit/config.toml
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("webgit=info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let port = match cli.port.as_deref() {
        Some(raw) => parse_port(raw)?,
        None => config.server.port,
    };

    let version = GitVersion::validate().await?;
    tracing::info!(%version, "git detected");

    let dir = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let repo = Repository::open(&dir)?.with_timeout(Duration::from_secs(config.git.timeout_seconds));
    let root = repo.path().to_path_buf();

    let mut gateway = GitGateway::new(repo);
    if config.audit.enabled {
        let path = match config.audit.path.clone() {
            Some(path) => path,
            None => AuditLogger::default_log_path()?,
        };
        tracing::info!(path = %path.display(), "audit log enabled");
        gateway = gateway.with_audit(AuditLogger::with_path(path)?);
    }

    let state = AppState::new(Arc::new(gateway), SessionGuard::new())
        .with_history_limit(config.history.default_limit);

    let listener = server::bind(port).await?;
    let url = format!("http://localhost:{}", port);
    tracing::info!(%url, repository = %root.display(), "webgit is running, press Ctrl-C to stop");

    if cli.open {
        if let Err(e) = open::that(&url) {
            tracing::warn!(error = %e, "could not open a browser");
        }
    }

    server::serve(listener, state).await?;
    Ok(())
}
