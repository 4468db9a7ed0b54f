// Testbed Relay - Main Entry Point
// Bridges local motes and an optional upstream relay to one monitoring client

use testbed_relay::config::RelayConfig;
use testbed_relay::net::RelayServer;
use tokio::signal;
use clap::Parser;
use tracing::{info, error};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = RelayConfig::parse();

    init_logging(config.verbose);

    info!("Starting testbed relay");
    if config.no_serial {
        info!("Serial ingestion disabled");
    } else if config.devices.is_empty() {
        info!("Serial devices will be discovered under /dev");
    }

    let mut server = match RelayServer::start(config.listen, config.relay_options()).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to listen on {}: {}", config.listen, e);
            return Err(e.into());
        }
    };
    info!("Relay listening on {}", server.addr());

    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal (Ctrl+C)"),
        Err(err) => {
            error!("Unable to listen for shutdown signal: {}", err);
            return Err(err.into());
        }
    }

    info!("Shutting down...");
    server.shutdown().await;
    // let the session task kill its subprocesses
    tokio::task::yield_now().await;

    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool) {
    use tracing_subscriber::fmt::format::FmtSpan;

    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_span_events(if verbose {
            FmtSpan::ENTER | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        });

    if verbose {
        subscriber
            .with_max_level(tracing::Level::DEBUG)
            .init();
        info!("Verbose logging enabled (DEBUG level)");
    } else {
        subscriber
            .with_max_level(tracing::Level::INFO)
            .init();
    }
}
