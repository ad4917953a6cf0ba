//! mtm-orchestrator - music tagging pipeline orchestrator
//!
//! Drives a remote processing service through Scan → Identify → Tag →
//! Organize and serves the album session to a front end over HTTP + SSE.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{info, warn};

use mtm_common::config::{TomlConfig, ENV_CONFIG_FILE};
use mtm_common::events::{EventBus, OrganizeOutcome};
use mtm_orchestrator::config::{CliOverrides, Settings};
use mtm_orchestrator::gateway::{HttpGateway, ProcessingGateway};
use mtm_orchestrator::session::PipelineStatus;
use mtm_orchestrator::{AppState, EVENT_BUS_CAPACITY};

/// Command-line arguments for mtm-orchestrator
#[derive(Parser, Debug)]
#[command(name = "mtm-orchestrator")]
#[command(about = "Music tagging pipeline orchestrator")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.config/mtm/config.toml)
    #[arg(short, long, env = ENV_CONFIG_FILE, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the processing service API
    #[arg(long, global = true)]
    service_url: Option<String>,

    /// Log level or filter directive (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP control API (default)
    Serve {
        /// Address to listen on
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Run the whole pipeline once and exit
    Run {
        /// Folder to scan
        input: String,
        /// Folder organized albums are moved into
        output: String,
    },
    /// Report processing service health and exit
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let toml_config = TomlConfig::load_or_default(cli.config.as_deref());
    let bind_override = match &cli.command {
        Some(Command::Serve { bind }) => bind.clone(),
        _ => None,
    };
    let settings = Settings::resolve(
        &toml_config,
        &CliOverrides {
            service_url: cli.service_url.clone(),
            bind_address: bind_override,
            log_level: cli.log_level.clone(),
        },
    );

    mtm_orchestrator::logging::init(&settings.log_level.value, settings.log_file.as_deref())
        .context("Failed to initialize logging")?;

    info!("Starting mtm-orchestrator");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    settings.log_sources();

    let gateway: Arc<dyn ProcessingGateway> = Arc::new(
        HttpGateway::new(
            &settings.service_url.value,
            &settings.user_agent,
            settings.request_timeout,
        )
        .context("Failed to build processing service client")?,
    );

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { .. } => serve(gateway, &settings).await,
        Command::Run { input, output } => run_once(gateway, &input, &output).await,
        Command::Status => print_status(gateway).await,
    }
}

async fn serve(gateway: Arc<dyn ProcessingGateway>, settings: &Settings) -> Result<()> {
    let addr: SocketAddr = settings
        .bind_address
        .value
        .parse()
        .with_context(|| format!("Invalid bind address: {}", settings.bind_address.value))?;

    let event_bus = EventBus::new(EVENT_BUS_CAPACITY);
    let state = AppState::new(gateway, event_bus);
    let app = mtm_orchestrator::build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Headless run: progress goes to the log, the summary to stdout
async fn run_once(gateway: Arc<dyn ProcessingGateway>, input: &str, output: &str) -> Result<()> {
    let state = AppState::new(gateway, EventBus::new(EVENT_BUS_CAPACITY));

    let summary = state
        .controller
        .run(input, output)
        .await
        .context("Pipeline run failed")?;

    let session = state.store.snapshot();
    println!("{}", serde_json::to_string_pretty(&summary)?);
    for album in session.identified.iter().filter(|a| a.status.needs_attention()) {
        println!("needs attention: {} ({})", album.id, album.status);
    }
    for (album_id, outcome) in &session.organize_outcomes {
        if let OrganizeOutcome::Failed(message) = outcome {
            println!("not organized: {} ({})", album_id, message);
        }
    }
    if summary.failed > 0 {
        warn!(failed = summary.failed, "Some albums could not be organized");
    }
    if session.status != PipelineStatus::Finished {
        anyhow::bail!("Run ended in state {:?}", session.status);
    }
    Ok(())
}

async fn print_status(gateway: Arc<dyn ProcessingGateway>) -> Result<()> {
    let health = gateway
        .health()
        .await
        .context("Processing service unreachable")?;
    println!("service: {}", health.status);

    match gateway.metadata_connectivity().await {
        Ok(connectivity) => println!(
            "metadata: {} {}",
            if connectivity.is_online() { "online" } else { "offline" },
            connectivity.message
        ),
        Err(e) => println!("metadata: unknown ({})", e.detail()),
    }
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
