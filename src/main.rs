//! websub-hub - WebSub hub daemon.
//!
//! This is the binary entry point. See the `websub_hub` library for the
//! subscription and delivery logic.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use websub_hub::request_log::RequestLog;
use websub_hub::server::{self, AppState};
use websub_hub::{
    signer, ChallengeVerifier, Config, Hub, NotificationDispatcher, PeriodicPublisher,
    SubscriptionHandler, SubscriptionRegistry,
};

// CLI
#[derive(Parser)]
#[command(name = "websub-hub")]
#[command(version)]
#[command(about = "Minimal WebSub hub with verified subscriptions and signed delivery")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the hub
    Serve {
        /// Path to a JSON config file
        #[arg(long)]
        config: Option<PathBuf>,
        /// IP address to bind
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
        /// Topic for periodic test notifications
        #[arg(long)]
        topic: Option<String>,
        /// Seconds between test notifications (0 disables)
        #[arg(long)]
        interval: Option<u64>,
        /// Append inbound requests to this file
        #[arg(long)]
        request_log: Option<PathBuf>,
    },
    /// Print the X-Hub-Signature header value for a payload
    Sign {
        /// Subscriber secret
        #[arg(long, default_value = "")]
        secret: String,
        /// Payload file (reads stdin if omitted)
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

fn init_logging() -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format_timestamp_secs();

    if let Ok(path) = std::env::var("WEBSUB_HUB_LOG_FILE") {
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file at {}", path))?;
        builder.target(env_logger::Target::Pipe(Box::new(log_file)));
    }

    builder.init();
    Ok(())
}

/// Waits for Ctrl-C and cancels `shutdown`.
fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Shutdown signal received");
                shutdown.cancel();
            }
            Err(e) => log::error!("Failed to listen for shutdown signal: {}", e),
        }
    });
}

async fn run_serve(mut config: Config) -> Result<()> {
    let addr = config.socket_addr()?;

    let registry = Arc::new(SubscriptionRegistry::new());
    let verifier = ChallengeVerifier::new(config.verification_timeout())
        .context("Failed to build verification client")?;
    let dispatcher = NotificationDispatcher::new(Arc::clone(&registry), config.delivery_timeout())
        .context("Failed to build delivery client")?;

    let hub: Arc<dyn SubscriptionHandler> = Arc::new(Hub::new(Arc::clone(&registry), verifier));
    let mut state = AppState::new(hub);
    if let Some(path) = config.request_log.take() {
        log::info!("Logging requests to {}", path.display());
        state = state.with_request_log(RequestLog::new(path));
    }

    let listener = server::bind(addr).await?;

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let publisher = PeriodicPublisher::new(
        dispatcher,
        config.default_topic.clone(),
        config.publish_interval(),
    )
    .spawn(shutdown.clone());

    let result = server::serve(listener, server::build_router(state), shutdown.clone()).await;

    // Stop the publisher even if the server failed.
    shutdown.cancel();
    if let Err(e) = publisher.await {
        log::error!("Publisher task failed: {}", e);
    }

    result?;
    log::info!("Hub stopped");
    Ok(())
}

fn run_sign(secret: &str, file: Option<PathBuf>) -> Result<()> {
    let payload = match file {
        Some(path) => std::fs::read(&path)
            .with_context(|| format!("Failed to read payload from {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read payload from stdin")?;
            buf
        }
    };
    println!("{}", signer::signature_header(secret, &payload));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            bind,
            port,
            topic,
            interval,
            request_log,
        } => {
            let mut settings =
                Config::load(config.as_deref()).context("Failed to load configuration")?;
            if let Some(bind) = bind {
                settings.bind_address = bind;
            }
            if let Some(port) = port {
                settings.port = port;
            }
            if let Some(topic) = topic {
                settings.default_topic = topic;
            }
            if let Some(interval) = interval {
                settings.publish_interval_secs = interval;
            }
            if request_log.is_some() {
                settings.request_log = request_log;
            }

            log::info!(
                "Starting websub-hub v{} on {}:{}",
                env!("CARGO_PKG_VERSION"),
                settings.bind_address,
                settings.port
            );
            run_serve(settings).await?;
        }
        Commands::Sign { secret, file } => {
            run_sign(&secret, file)?;
        }
    }

    Ok(())
}
