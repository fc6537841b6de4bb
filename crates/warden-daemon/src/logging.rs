// logging.rs — tracing-subscriber setup shared by the daemon and the CLI.

use tracing_subscriber::EnvFilter;

/// Log to stderr without ANSI colours. `RUST_LOG` adds to the defaults.
pub fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("warden_router=info".parse()?)
        .add_directive("warden_daemon=info".parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))
}
