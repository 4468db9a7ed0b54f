// JSON message type definitions
// Control and event messages exchanged between monitor, relay and upstream peer

use serde::{Deserialize, Serialize};

use crate::events::Event;

/// One decoded event as forwarded to the monitoring client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(flatten)]
    pub event: Event,
    /// Only on matched receives
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<f64>,
    /// Clock offset to the upstream peer at forward time, null while unknown
    #[serde(rename = "clockDelta", default)]
    pub clock_delta: Option<f64>,
}

impl EventEnvelope {
    pub fn new(event: Event, clock_delta: Option<f64>) -> Self {
        EventEnvelope {
            event,
            latency: None,
            clock_delta,
        }
    }
}

/// Every message on a relay link, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Ask the relay to open its upstream link.
    #[serde(rename = "connect")]
    Connect { ip: String },

    #[serde(rename = "request-sync")]
    RequestSync,

    #[serde(rename = "sync-1")]
    Sync1 { timestamp: f64 },

    #[serde(rename = "sync-2")]
    Sync2 { t1: f64, timestamp: f64 },

    #[serde(rename = "sync-3")]
    Sync3 { t1: f64, t2: f64 },

    /// Sent to a client that connects while another session is active.
    #[serde(rename = "busy")]
    Busy,

    #[serde(rename = "message")]
    Message(EventEnvelope),
}

impl ControlMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ControlMessage::Connect { .. } => "connect",
            ControlMessage::RequestSync => "request-sync",
            ControlMessage::Sync1 { .. } => "sync-1",
            ControlMessage::Sync2 { .. } => "sync-2",
            ControlMessage::Sync3 { .. } => "sync-3",
            ControlMessage::Busy => "busy",
            ControlMessage::Message(_) => "message",
        }
    }
}
