// Testbed Monitor
// Dashboard client for a testbed relay with a time-travel console and HTTP state endpoint

use testbed_relay::config::MonitorConfig;
use testbed_relay::dashboard::Dashboard;
use testbed_relay::net::http;
use testbed_relay::net::monitor::stdin_console;
use testbed_relay::net::{Connection, ControlMessage, Monitor};
use tokio::sync::mpsc;
use clap::Parser;
use tracing::{info, error, warn};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = MonitorConfig::parse();

    init_logging(config.verbose);

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let result = runtime.block_on(run(config));
    // a console read still parked on stdin must not hold up exit
    runtime.shutdown_background();
    result
}

async fn run(config: MonitorConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut dashboard = Dashboard::new();
    if let Some(path) = &config.import {
        match dashboard.load_history_from(path) {
            Ok(()) => info!("Imported {} snapshots from {}", dashboard.history().len(), path.display()),
            Err(e) => warn!("Import of {} failed, starting empty: {}", path.display(), e),
        }
    }
    let (mut monitor, state_rx) = Monitor::new(dashboard);

    if let Some(port) = config.http_port {
        match tokio::net::TcpListener::bind((std::net::Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                let app = http::router(state_rx.clone(), config.static_dir.clone());
                tokio::spawn(http::serve(listener, app));
            }
            Err(e) => error!("HTTP server failed to bind to port {}: {}", port, e),
        }
    }

    let mut relay = match Connection::connect(&config.relay).await {
        Ok(conn) => conn,
        Err(e) => {
            error!("Failed to connect to relay {}: {}", config.relay, e);
            return Err(e.into());
        }
    };
    info!("Connected to relay {}", relay.peer_addr());

    if let Some(ip) = &config.remote {
        info!("Asking relay to bridge to {}", ip);
        relay.send(&ControlMessage::Connect { ip: ip.clone() }).await?;
    }

    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal (Ctrl+C)");
                let _ = shutdown_tx.send(()).await;
            }
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        }
    });

    monitor.run(&mut relay, Some(stdin_console()), &mut shutdown_rx).await?;

    let _ = relay.shutdown().await;
    info!("Monitor stopped with {} snapshots", monitor.dashboard().history().len());
    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool) {
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr);

    if verbose {
        subscriber.with_max_level(tracing::Level::DEBUG).init();
        info!("Verbose logging enabled (DEBUG level)");
    } else {
        subscriber.with_max_level(tracing::Level::INFO).init();
    }
}
