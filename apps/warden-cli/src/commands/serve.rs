// serve.rs — Run the hook daemon from the CLI.
//
// Same startup as the `warden-daemon` binary, so `warden serve` works
// without knowing the daemon's binary name.

use std::net::SocketAddr;
use std::path::Path;

use warden_daemon::{init_tracing, resolve_token, serve, AppState};
use warden_router::{Router, RouterConfig};

pub fn execute(
    project_root: &Path,
    bind: SocketAddr,
    log_json: bool,
    hook_token: Option<String>,
) -> anyhow::Result<()> {
    init_tracing(log_json)?;

    let config = RouterConfig::for_project(project_root)?;
    let router = Router::from_config(config)?;
    let token = resolve_token(hook_token);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(serve(AppState::new(router, token), bind))
}
