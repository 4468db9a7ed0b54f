// Command-line configuration
// clap parsers for the relay and the monitor

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use clap::Parser;

use crate::constants::{DEFAULT_RELAY_PORT, DEFAULT_SERIALDUMP, SYNC_INTERVAL_SECS};
use crate::net::ingest::IngestConfig;
use crate::net::relay::RelayOptions;

/// Testbed relay configuration
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Relays testbed events to a monitor with clock-corrected latencies", long_about = None)]
pub struct RelayConfig {
    /// Address to accept the monitor connection on.
    #[arg(long, value_name = "ADDR", default_value_t = SocketAddr::from(([0, 0, 0, 0], DEFAULT_RELAY_PORT)))]
    pub listen: SocketAddr,

    /// Port used for upstream relays when `connect` names a bare host.
    #[arg(long, default_value_t = DEFAULT_RELAY_PORT)]
    pub upstream_port: u16,

    /// Seconds between clock-sync probes on the upstream link.
    #[arg(long, value_name = "SECS", default_value_t = SYNC_INTERVAL_SECS)]
    pub sync_interval: u64,

    /// Seconds to wait for an upstream connection.
    #[arg(long, value_name = "SECS", default_value_t = 5)]
    pub connect_timeout: u64,

    /// Path of the serialdump tool.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_SERIALDUMP)]
    pub serialdump: PathBuf,

    /// Serial device under /dev to read (repeatable). Discovered when omitted.
    #[arg(long = "device", value_name = "NAME")]
    pub devices: Vec<String>,

    /// Don't read local motes, only relay upstream traffic.
    #[arg(long, default_value_t = false)]
    pub no_serial: bool,

    /// Verbose logging (DEBUG level)
    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,
}

impl RelayConfig {
    pub fn relay_options(&self) -> RelayOptions {
        RelayOptions {
            default_upstream_port: self.upstream_port,
            sync_interval: Duration::from_secs(self.sync_interval.max(1)),
            connect_timeout: Duration::from_secs(self.connect_timeout),
            ingest: IngestConfig {
                enabled: !self.no_serial,
                serialdump: self.serialdump.clone(),
                devices: self.devices.clone(),
            },
        }
    }
}

/// Monitor configuration
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Testbed dashboard with time travel", long_about = None)]
pub struct MonitorConfig {
    /// Relay to connect to.
    #[arg(long, value_name = "HOST:PORT", default_value = "127.0.0.1:8001")]
    pub relay: String,

    /// Ask the relay to bridge to this remote relay.
    #[arg(long, value_name = "IP")]
    pub remote: Option<String>,

    /// Serve the current snapshot over HTTP on this port.
    #[arg(long, value_name = "PORT")]
    pub http_port: Option<u16>,

    /// Static files served next to the HTTP state endpoints.
    #[arg(long, value_name = "DIR")]
    pub static_dir: Option<PathBuf>,

    /// Start from a previously saved history.
    #[arg(long, value_name = "FILE")]
    pub import: Option<PathBuf>,

    /// Verbose logging (DEBUG level)
    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,
}
