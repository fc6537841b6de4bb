// main.rs — `warden`: operator CLI for the Warden intent router.

mod commands;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use warden_router::RouterConfig;

#[derive(Parser)]
#[command(name = "warden", version, about = "Warden: policy-gated intent router")]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a message (keyword-only) and show the tier it would get.
    Classify {
        /// The message text.
        message: String,
        /// Sender identity.
        #[arg(long, default_value = "cli")]
        sender: String,
        /// Channel the message arrived on.
        #[arg(long, default_value = "cli")]
        channel: String,
    },
    /// Resolve the autonomy tier for a message under a given category.
    Tier {
        /// The message text.
        message: String,
        /// Intent category (query, command, monitor, conversation, social, schedule, system).
        #[arg(long)]
        category: String,
        /// Sender identity.
        #[arg(long, default_value = "cli")]
        sender: String,
    },
    /// Inspect the outcome log.
    #[command(subcommand)]
    Outcomes(commands::outcomes::OutcomesCommands),
    /// Run the HTTP hook daemon in-process.
    Serve {
        /// Address to listen on.
        #[arg(long, default_value = "127.0.0.1:18790")]
        bind: SocketAddr,
        /// Emit logs as JSON lines.
        #[arg(long)]
        log_json: bool,
        /// Shared secret for POST /hooks/agent.
        #[arg(long, env = "WARDEN_HOOK_TOKEN", hide_env_values = true)]
        hook_token: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let load = || RouterConfig::for_project(&cli.project_root);

    match &cli.command {
        Commands::Classify {
            message,
            sender,
            channel,
        } => commands::classify::execute(&load()?, message, sender, channel),
        Commands::Tier {
            message,
            category,
            sender,
        } => commands::tier::execute(&load()?, message, category, sender),
        Commands::Outcomes(cmd) => commands::outcomes::execute(cmd, &load()?),
        Commands::Serve {
            bind,
            log_json,
            hook_token,
        } => commands::serve::execute(&cli.project_root, *bind, *log_json, hook_token.clone()),
    }
}
