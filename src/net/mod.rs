// Network layer module
// Line-delimited JSON links between monitor, relay and upstream relays

pub mod connection;
pub mod http;
pub mod ingest;
pub mod listener;
pub mod messages;
pub mod monitor;
pub mod relay;

pub use connection::Connection;
pub use listener::RelayServer;
pub use messages::{ControlMessage, EventEnvelope};
pub use monitor::Monitor;
pub use relay::{RelayOptions, RelaySession};
