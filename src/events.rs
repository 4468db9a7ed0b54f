// Testbed events
// Typed records produced by the command decoder and carried by the relay

use serde::{Deserialize, Serialize};

/// Direction of a packet event as reported by the mote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacketPhase {
    #[serde(rename = "sent")]
    Sent,
    #[serde(rename = "rec")]
    Received,
}

/// One decoded testbed event.
///
/// The serde representation is the `name`-tagged object the dashboard consumes, with the
/// field names the motes' firmware has always used (`nbrId`, `seqNum`, `dcOn`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum Event {
    /// Node transmitted something worth flashing.
    #[serde(rename = "H")]
    Highlight { id: u32 },

    /// Link-layer hop from `src` to `dst`.
    #[serde(rename = "L")]
    LinkHop { src: u32, dst: u32 },

    /// RPL rank announcement.
    #[serde(rename = "R")]
    Rank { id: u32, rank: u32 },

    /// Neighbor discovered.
    #[serde(rename = "N")]
    Neighbor {
        id: u32,
        #[serde(rename = "nbrId")]
        neighbor_id: u32,
    },

    /// Application packet sent or received. `timestamp` is milliseconds in the clock of the
    /// machine that stamped the event.
    #[serde(rename = "P")]
    Packet {
        from: u32,
        to: u32,
        #[serde(rename = "seqNum")]
        seq_num: u32,
        #[serde(rename = "mod")]
        phase: PacketPhase,
        timestamp: f64,
    },

    /// Mote-side delivery report.
    #[serde(rename = "DR")]
    DeliveryReport {
        id: u32,
        from: u32,
        #[serde(rename = "rec")]
        received: u32,
        #[serde(rename = "exp")]
        expected: u32,
    },

    /// Radio duty cycle in ticks.
    #[serde(rename = "DC")]
    DutyCycle {
        id: u32,
        #[serde(rename = "dcOn")]
        on_ticks: u64,
        #[serde(rename = "total")]
        total_ticks: u64,
    },
}

impl Event {
    /// Short wire name of the event kind.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Highlight { .. } => "H",
            Event::LinkHop { .. } => "L",
            Event::Rank { .. } => "R",
            Event::Neighbor { .. } => "N",
            Event::Packet { .. } => "P",
            Event::DeliveryReport { .. } => "DR",
            Event::DutyCycle { .. } => "DC",
        }
    }

    /// Copy of this event with the packet timestamp replaced. Non-packet events are returned
    /// unchanged.
    pub fn with_timestamp(&self, ts: f64) -> Event {
        match self {
            Event::Packet { from, to, seq_num, phase, .. } => Event::Packet {
                from: *from,
                to: *to,
                seq_num: *seq_num,
                phase: *phase,
                timestamp: ts,
            },
            other => other.clone(),
        }
    }
}
