// Shared constants for the relay and monitor

/// Default TCP port the relay listens on for its downstream client.
pub const DEFAULT_RELAY_PORT: u16 = 8001;

/// Interval between clock-sync probes on an upstream link (seconds).
pub const SYNC_INTERVAL_SECS: u64 = 5;

/// Number of round-trip deltas kept in the clock-sync window.
pub const SYNC_WINDOW: usize = 5;

/// Baud rate handed to serialdump.
pub const SERIAL_BAUD: u32 = 115200;

/// Default serialdump binary, relative to the relay's working directory.
pub const DEFAULT_SERIALDUMP: &str = "../../sky/serialdump-linux";

/// Device name fragment used when discovering attached motes under /dev.
pub const SERIAL_DEVICE_PATTERN: &str = "ttyUSB";

/// Id of the sink / root node; every other node gets an IP hop from it.
pub const ROOT_NODE: u32 = 1;

/// Display group for the root node and for every other node.
pub const ROOT_GROUP: u32 = 10;
pub const NODE_GROUP: u32 = 2;

/// Default latency histogram bucket size carried in every snapshot.
pub const DEFAULT_BUCKET_SIZE: u32 = 50;

/// Capacity of the channel between ingestion subprocesses and the relay session.
pub const INGEST_CHANNEL_CAPACITY: usize = 256;
