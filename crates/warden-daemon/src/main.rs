//! # warden-daemon
//!
//! Serves the Warden intent router over HTTP.
//!
//! ```text
//! WARDEN_HOOK_TOKEN=... warden-daemon --project-root . --bind 127.0.0.1:18790
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use warden_daemon::{init_tracing, resolve_token, serve, AppState};
use warden_router::{Router, RouterConfig};

/// Warden hook daemon.
#[derive(Parser)]
#[command(name = "warden-daemon", about = "Policy-gated intent router over HTTP")]
struct Cli {
    /// Project root holding .warden/ (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:18790")]
    bind: SocketAddr,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,

    /// Shared secret for POST /hooks/agent.
    #[arg(long, env = "WARDEN_HOOK_TOKEN", hide_env_values = true)]
    hook_token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json)?;

    let project_root = cli
        .project_root
        .canonicalize()
        .with_context(|| format!("project root {} not found", cli.project_root.display()))?;
    tracing::info!(root = %project_root.display(), "starting warden daemon");

    let config = RouterConfig::for_project(&project_root)?;
    let router = Router::from_config(config)?;

    let token = resolve_token(cli.hook_token);

    serve(AppState::new(router, token), cli.bind).await
}
