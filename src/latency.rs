// Packet latency correlation and delivery bookkeeping

use std::collections::{BTreeMap, HashMap};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Identifies one packet on the air: (from, to, seqNum).
pub type PacketKey = (u32, u32, u32);

/// Which link a send was observed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Local serial ingestion, already in local clock terms.
    Local,
    /// Forwarded from the upstream peer.
    Upstream,
}

/// A send still waiting for its receive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingSend {
    /// Send time (ms), local clock when `corrected`
    pub timestamp: f64,
    /// False when a remote timestamp had to be stored raw because no offset was known yet
    pub corrected: bool,
    pub origin: Origin,
}

/// Matches packet receives against earlier sends.
#[derive(Debug, Default)]
pub struct LatencyCorrelator {
    pending: HashMap<PacketKey, PendingSend>,
}

impl LatencyCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a send. A later send with the same key replaces the earlier one.
    pub fn on_sent(&mut self, from: u32, to: u32, seq_num: u32, timestamp: f64, corrected: bool, origin: Origin) {
        let prev = self.pending.insert(
            (from, to, seq_num),
            PendingSend { timestamp, corrected, origin },
        );
        if prev.is_some() {
            debug!("Send {}->{} #{} registered twice, keeping the newest", from, to, seq_num);
        }
    }

    /// Resolve a receive stamped `timestamp`. `corrected` says whether that timestamp is in
    /// local terms, as for sends.
    ///
    /// Consumes the pending send. Returns the latency (ms) only when both timestamps come from
    /// the same clock and the difference is not negative; None otherwise, or when no send is
    /// known for the key.
    pub fn on_received(&mut self, from: u32, to: u32, seq_num: u32, timestamp: f64, corrected: bool) -> Option<f64> {
        let pending = self.pending.remove(&(from, to, seq_num))?;
        if pending.corrected != corrected {
            debug!("Send and receive of {}->{} #{} are on different clocks, no latency", from, to, seq_num);
            return None;
        }
        let latency = timestamp - pending.timestamp;
        if latency < 0.0 {
            debug!("Negative latency {:.1}ms for {}->{} #{}, dropped", latency, from, to, seq_num);
            return None;
        }
        Some(latency)
    }

    pub fn get(&self, key: &PacketKey) -> Option<&PendingSend> {
        self.pending.get(key)
    }

    /// Drop all sends observed on one link.
    pub fn discard_origin(&mut self, origin: Origin) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, p| p.origin != origin);
        before - self.pending.len()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Per-source delivery counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryCounter {
    pub sent: u64,
    pub received: u64,
    /// -1 until the first receive
    pub last_seq_num: i64,
}

impl DeliveryCounter {
    pub fn ratio(&self) -> f64 {
        if self.sent == 0 {
            0.0
        } else {
            self.received as f64 / self.sent as f64
        }
    }
}

impl Default for DeliveryCounter {
    fn default() -> Self {
        DeliveryCounter { sent: 0, received: 0, last_seq_num: -1 }
    }
}

/// Delivery counters keyed by source node, ordered by node id.
#[derive(Debug, Clone, Default)]
pub struct DeliveryCounters {
    counters: BTreeMap<u32, DeliveryCounter>,
}

impl DeliveryCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_sent(&mut self, from: u32) {
        self.counters.entry(from).or_default().sent += 1;
    }

    /// Count a receive unless it repeats or precedes the newest sequence number seen.
    /// Returns whether the receive was counted. Receives from a source that never sent
    /// anything are not counted either.
    pub fn on_received(&mut self, from: u32, seq_num: u32) -> bool {
        let Some(counter) = self.counters.get_mut(&from) else {
            return false;
        };
        let seq = i64::from(seq_num);
        if seq <= counter.last_seq_num {
            return false;
        }
        counter.received += 1;
        counter.last_seq_num = seq;
        true
    }

    pub fn get(&self, from: u32) -> Option<&DeliveryCounter> {
        self.counters.get(&from)
    }

    /// Put back a counter taken from a saved snapshot.
    pub fn restore(&mut self, from: u32, counter: DeliveryCounter) {
        self.counters.insert(from, counter);
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &DeliveryCounter)> {
        self.counters.iter().map(|(id, c)| (*id, c))
    }

    /// Mean of the per-source ratios, None with no sources.
    pub fn average_ratio(&self) -> Option<f64> {
        if self.counters.is_empty() {
            return None;
        }
        let sum: f64 = self.counters.values().map(DeliveryCounter::ratio).sum();
        Some(sum / self.counters.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}
