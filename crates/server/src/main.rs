mod api;
mod cli;
mod metrics;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blackhole_core::{
    load_config, run_startup_checks, validate_config, AlertSink, ArrClient, Config,
    DiscordNotifier, LogAlertSink, ManagerKind, RealDebridClient, WatchLoop, WatchSummary,
};

use api::create_router;
use cli::{Cli, Command};
use state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    info!("Blackhole v{}", VERSION);
    info!("Loading configuration from {:?}", cli.config);
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    validate_config(&config).context("Configuration validation failed")?;

    info!("Debrid host: {}", config.debrid.host);
    info!(
        "Mount path: {}",
        config.blackhole.mount_torrents_path.display()
    );
    info!(
        "Fail if not cached: {}",
        config.blackhole.fail_if_not_cached
    );

    let debrid =
        RealDebridClient::new(config.debrid.clone()).context("Failed to create debrid client")?;
    run_startup_checks(&debrid, &config.blackhole.mount_torrents_path).await?;

    match cli.command {
        Command::Validate => {
            info!("Configuration and services look good");
            Ok(())
        }
        Command::Run { manager } => {
            let watch_loop = build_watch_loop(&config, manager, debrid)?;
            let summary = watch_loop.run_until_idle().await?;
            log_summary(&summary);
            Ok(())
        }
        Command::Watch {
            manager,
            interval_secs,
        } => watch(config, manager, debrid, interval_secs).await,
    }
}

fn build_watch_loop(
    config: &Config,
    kind: ManagerKind,
    debrid: RealDebridClient,
) -> Result<WatchLoop> {
    let manager = ArrClient::new(kind, config.arr(kind).clone())
        .with_context(|| format!("Failed to create {} client", kind))?;

    let alerts: Arc<dyn AlertSink> = match &config.discord {
        Some(discord) if discord.enabled => {
            info!(
                "Discord alerts enabled (updates: {})",
                discord.update_enabled
            );
            Arc::new(DiscordNotifier::new(discord.clone()))
        }
        _ => {
            info!("Discord alerts disabled, alerts go to the log");
            Arc::new(LogAlertSink)
        }
    };

    Ok(WatchLoop::new(
        Arc::new(debrid),
        Arc::new(manager),
        alerts,
        kind,
        config.blackhole.clone(),
    ))
}

async fn watch(
    config: Config,
    kind: ManagerKind,
    debrid: RealDebridClient,
    interval_secs: Option<u64>,
) -> Result<()> {
    let mut watch_loop = build_watch_loop(&config, kind, debrid)?;
    if let Some(secs) = interval_secs {
        watch_loop = watch_loop.with_interval(Duration::from_secs(secs));
    }

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let server = if config.server.enabled {
        let addr = SocketAddr::new(config.server.host, config.server.port);
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;
        info!("Serving health and metrics on http://{}", addr);

        let app = create_router(Arc::new(AppState::new(config.clone(), kind)));
        let mut server_rx = shutdown_tx.subscribe();
        Some(tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = server_rx.recv().await;
                })
                .await
        }))
    } else {
        None
    };

    let mut loop_rx = shutdown_tx.subscribe();
    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, finishing running items");
        let _ = signal_tx.send(());
    });

    let summary = watch_loop
        .run_until(async move {
            let _ = loop_rx.recv().await;
        })
        .await?;
    log_summary(&summary);

    if let Some(handle) = server {
        handle
            .await
            .context("HTTP server task panicked")?
            .context("HTTP server error")?;
    }

    info!("Blackhole shutdown complete");
    Ok(())
}

fn log_summary(summary: &WatchSummary) {
    info!(
        claimed = summary.claimed,
        deferred = summary.deferred,
        published = summary.published,
        failed = summary.failed,
        folder_not_found = summary.folder_not_found,
        crashed = summary.crashed,
        "Run finished"
    );
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
