//! rcon-hub daemon
//!
//! Accepts SSH logins from operators and gives each a shell from which
//! game server RCON consoles can be attached, watched and driven.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rh_core::config::{self, HubConfig};
use rh_hub::server::{load_host_key, SshServer};
use rh_hub::HubState;

#[derive(Parser)]
#[command(name = "rcon-hub")]
#[command(about = "SSH gateway for game server RCON consoles")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "RH_CONFIG")]
    config: Option<PathBuf>,

    /// SSH bind address, `host:port` or `:port` (overrides config)
    #[arg(short, long, env = "RH_BIND")]
    bind: Option<String>,

    /// SSH host key file (overrides config)
    #[arg(long, env = "RH_HOST_KEY_FILE")]
    host_key_file: Option<PathBuf>,

    /// Extra SSH user, added when a password is also given
    #[arg(long, env = "RH_USER", default_value = "user")]
    user: String,

    /// Password for --user
    #[arg(long, env = "RH_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Extra console as name=password@host:port (repeatable)
    #[arg(long = "connection", env = "RH_CONNECTIONS", value_delimiter = ',')]
    connections: Vec<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "RH_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(Command::Version) = args.command {
        println!(
            "rcon-hub {} ({}-{})",
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH
        );
        return Ok(());
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| args.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("rcon-hub starting...");

    let config = build_config(&args)?;
    let bind_addr = config.bind_address();
    tracing::info!(
        "Loaded {} user(s) and {} connection(s)",
        config.users.len(),
        config.connections.len()
    );

    let host_key = load_host_key(config.host_key_file.as_deref())?;
    let state = Arc::new(HubState::new(config));

    // Create cancellation token for graceful shutdown
    let cancel = CancellationToken::new();
    tokio::spawn(wait_for_shutdown(cancel.clone()));

    let server = SshServer::new(host_key, state, cancel);
    server.run(&bind_addr).await?;

    tracing::info!("rcon-hub shutdown complete");
    Ok(())
}

/// Load the config file and apply command line overrides
fn build_config(args: &Args) -> Result<HubConfig> {
    let mut config: HubConfig = match args.config.clone().or_else(config::find_config_file) {
        Some(path) => config::load_config(&path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => {
            tracing::warn!("No config file found, using defaults");
            HubConfig::default()
        }
    };

    if let Some(bind) = &args.bind {
        config.bind = bind.clone();
    }
    if let Some(path) = &args.host_key_file {
        config.host_key_file = Some(path.clone());
    }
    if let Some(password) = args.password.as_deref().filter(|p| !p.is_empty()) {
        if !args.user.is_empty() {
            config.add_user(args.user.clone(), password);
        }
    }
    for entry in &args.connections {
        config.add_extra_connection(entry)?;
    }

    config.validate()?;
    Ok(config)
}

/// Cancel `cancel` on Ctrl+C or SIGTERM
async fn wait_for_shutdown(cancel: CancellationToken) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown...");
        }
    }

    cancel.cancel();
}
