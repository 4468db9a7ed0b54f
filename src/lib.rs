pub mod constants;
pub mod events;
pub mod decoder;
pub mod clocksync;
pub mod latency;
pub mod history;
pub mod dashboard;
pub mod net;
pub mod config;
