//! Agora Watcher — curated signal and whale dashboard
//!
//! Usage:
//!   agora-watcher serve --port 5000      — Launch the dashboard (reader)
//!   agora-watcher refresh                — Replace signals every interval (writer)
//!   agora-watcher whales                 — Upsert the whale list once (writer)
//!   agora-watcher inject                 — Upsert the urgent signal once (writer)

mod config;
mod routes;
mod views;

use clap::{Parser, Subcommand};
use config::Config;
use persistence::{Database, RetryPolicy};
use refresher::{
    inject_signal, signal_from_json_file, sync_whales, urgent_signal, RefreshProgress,
    SignalBatch, SignalRefresher, WhaleBatch,
};
use routes::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

const APP_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "-", env!("GIT_HASH"));

#[derive(Parser)]
#[command(name = "agora-watcher")]
#[command(about = "Curated trading signal and whale wallet dashboard", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the dashboard web server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to listen on
        #[arg(short, long, default_value_t = 5000)]
        port: u16,
    },
    /// Reset the signals table, then replace its contents every interval
    Refresh {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
        /// JSON array of signals to write instead of the built-in batch
        #[arg(long)]
        batch: Option<PathBuf>,
        /// Seconds between cycles (overrides AGORA_REFRESH_INTERVAL_SECS)
        #[arg(long)]
        interval_secs: Option<u64>,
    },
    /// Upsert the whale list once (whales missing from the batch are kept)
    Whales {
        /// JSON array of whales to upsert instead of the built-in list
        #[arg(long)]
        batch: Option<PathBuf>,
    },
    /// Upsert a single signal without touching the others
    Inject {
        /// JSON object of the signal to inject instead of the built-in one
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug,persistence=debug,refresher=debug,agora_watcher=debug")
    } else {
        EnvFilter::new("info,persistence=info,refresher=info,agora_watcher=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    match cli.command {
        Commands::Serve { host, port } => {
            cmd_serve(&config, &host, port).await?;
        }
        Commands::Refresh {
            once,
            batch,
            interval_secs,
        } => {
            cmd_refresh(&config, once, batch, interval_secs).await?;
        }
        Commands::Whales { batch } => {
            cmd_whales(&config, batch).await?;
        }
        Commands::Inject { file } => {
            cmd_inject(&config, file).await?;
        }
    }

    Ok(())
}

/// Open the shared store. Failure here is fatal for every role.
async fn open_store(config: &Config) -> anyhow::Result<Database> {
    let db = Database::open(&config.store_options()).await.map_err(|e| {
        error!("Failed to open store: {}", e);
        anyhow::anyhow!("Store initialization failed: {}", e)
    })?;
    info!("Store opened: {}", config.db_path.display());
    Ok(db)
}

// ============================================================================
// Serve command — reader role
// ============================================================================

async fn cmd_serve(config: &Config, host: &str, port: u16) -> anyhow::Result<()> {
    info!("Agora Watcher v{} starting...", APP_VERSION);

    let db = open_store(config).await?;
    db.ensure_schema().await?;

    let state = AppState {
        db: Arc::new(db),
        operator: Arc::from(config.operator.as_str()),
    };
    let app = routes::router(state);

    let addr: std::net::SocketAddr = format!("{}:{}", host, port).parse()?;
    println!("\n=== Agora Watcher v{} ===", APP_VERSION);
    println!("Listening on http://{}", addr);
    println!("\nEndpoints:");
    println!("  GET  /                 - Dashboard");
    println!("  GET  /whales           - Whale leaderboard");
    println!("  GET  /signal/{{id}}      - Signal detail");
    println!("  GET  /api/signals      - Signals (JSON, newest first)");
    println!("  GET  /api/bankroll     - Bankroll (static stub)");
    println!("  GET  /api/health       - Health check");
    println!("\n  Store: {}", config.db_path.display());
    println!("\nPress Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Ctrl+C received, shutting down");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Writer commands
// ============================================================================

async fn cmd_refresh(
    config: &Config,
    once: bool,
    batch: Option<PathBuf>,
    interval_secs: Option<u64>,
) -> anyhow::Result<()> {
    let batch = match batch {
        Some(path) => SignalBatch::from_json_file(&path)?,
        None => SignalBatch::curated(),
    };
    let interval = config.refresh_interval_with(interval_secs)?;

    let db = open_store(config).await?;
    db.init_signals().await?;

    let refresher = SignalRefresher::new(db.pool_clone(), batch).with_interval(interval);

    if once {
        let rows = refresher.run_cycle().await?;
        println!("Signals refreshed: {} rows", rows);
        return Ok(());
    }

    // Stop between ticks on Ctrl+C
    let progress = Arc::new(RefreshProgress::new());
    let progress_for_ctrlc = progress.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl+C received, stopping refresher...");
        progress_for_ctrlc.cancel();
    });

    refresher.run(&progress).await;

    println!(
        "Refresher stopped after {} ticks ({} failed)",
        progress.ticks(),
        progress.failed_ticks()
    );
    Ok(())
}

async fn cmd_whales(config: &Config, batch: Option<PathBuf>) -> anyhow::Result<()> {
    let batch = match batch {
        Some(path) => WhaleBatch::from_json_file(&path)?,
        None => WhaleBatch::curated(),
    };

    let db = open_store(config).await?;
    let upserted = sync_whales(&db, &batch, RetryPolicy::default()).await?;

    println!("Whale list synced: {} wallets", upserted);
    Ok(())
}

async fn cmd_inject(config: &Config, file: Option<PathBuf>) -> anyhow::Result<()> {
    let record = match file {
        Some(path) => signal_from_json_file(&path)?,
        None => urgent_signal(),
    };

    let db = open_store(config).await?;
    db.ensure_schema().await?;
    inject_signal(db.pool(), &record, RetryPolicy::default()).await?;

    println!("Signal injected: {}", record.id);
    Ok(())
}
