// Dashboard state
// Derives topology, latency, delivery and duty-cycle series from relayed events and records
// every change in the history store

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{DEFAULT_BUCKET_SIZE, NODE_GROUP, ROOT_GROUP, ROOT_NODE};
use crate::events::{Event, PacketPhase};
use crate::history::{HistoryError, HistoryStore, Snapshot, ViewMode};
use crate::latency::{DeliveryCounter, DeliveryCounters};
use crate::net::messages::EventEnvelope;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub group: u32,
}

/// Undirected radio link, `source` is always the lower node id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub source: String,
    pub target: String,
    pub value: u32,
}

/// Logical IP hop from the root to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpHop {
    pub id: String,
    pub source: String,
    pub target: String,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacketRecord {
    pub from: u32,
    pub to: u32,
    pub seq_num: u32,
    pub latency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRatio {
    pub id: u32,
    pub sent: u64,
    pub received: u64,
    pub last_seq_num: i64,
}

/// One point of an aggregate series. `time_index` is the history index of the snapshot the
/// point was computed for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub timestamp: f64,
    pub time_index: usize,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HopCount {
    pub dst: u32,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextHop {
    pub id: u32,
    pub hops: Vec<HopCount>,
}

/// Every derived series at one point of the event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StateSnapshot {
    pub bucket_size: u32,
    pub latencies: Arc<Vec<f64>>,
    pub avg_latencies: Arc<Vec<SeriesPoint>>,
    pub nodes: Arc<Vec<Node>>,
    pub links: Arc<Vec<Link>>,
    pub ip_hops: Arc<Vec<IpHop>>,
    pub packets: Arc<Vec<PacketRecord>>,
    pub delivery_ratios: Arc<Vec<DeliveryRatio>>,
    pub avg_ratios: Arc<Vec<SeriesPoint>>,
    pub next_hops: Arc<Vec<NextHop>>,
    pub duty_cycles: Arc<Vec<BTreeMap<u32, f64>>>,
    pub avg_duty_cycles: Arc<Vec<SeriesPoint>>,
}

impl Default for StateSnapshot {
    fn default() -> Self {
        StateSnapshot {
            bucket_size: DEFAULT_BUCKET_SIZE,
            latencies: Arc::default(),
            avg_latencies: Arc::default(),
            nodes: Arc::default(),
            links: Arc::default(),
            ip_hops: Arc::default(),
            packets: Arc::default(),
            delivery_ratios: Arc::default(),
            avg_ratios: Arc::default(),
            next_hops: Arc::default(),
            duty_cycles: Arc::default(),
            avg_duty_cycles: Arc::default(),
        }
    }
}

/// Partial update: `Some` fields replace the previous snapshot's.
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    pub bucket_size: Option<u32>,
    pub latencies: Option<Arc<Vec<f64>>>,
    pub avg_latencies: Option<Arc<Vec<SeriesPoint>>>,
    pub nodes: Option<Arc<Vec<Node>>>,
    pub links: Option<Arc<Vec<Link>>>,
    pub ip_hops: Option<Arc<Vec<IpHop>>>,
    pub packets: Option<Arc<Vec<PacketRecord>>>,
    pub delivery_ratios: Option<Arc<Vec<DeliveryRatio>>>,
    pub avg_ratios: Option<Arc<Vec<SeriesPoint>>>,
    pub next_hops: Option<Arc<Vec<NextHop>>>,
    pub duty_cycles: Option<Arc<Vec<BTreeMap<u32, f64>>>>,
    pub avg_duty_cycles: Option<Arc<Vec<SeriesPoint>>>,
}

fn pick<T>(update: Option<Arc<T>>, prev: &Arc<T>) -> Arc<T> {
    update.unwrap_or_else(|| Arc::clone(prev))
}

impl Snapshot for StateSnapshot {
    type Update = StateUpdate;

    fn merge(&self, u: StateUpdate) -> Self {
        StateSnapshot {
            bucket_size: u.bucket_size.unwrap_or(self.bucket_size),
            latencies: pick(u.latencies, &self.latencies),
            avg_latencies: pick(u.avg_latencies, &self.avg_latencies),
            nodes: pick(u.nodes, &self.nodes),
            links: pick(u.links, &self.links),
            ip_hops: pick(u.ip_hops, &self.ip_hops),
            packets: pick(u.packets, &self.packets),
            delivery_ratios: pick(u.delivery_ratios, &self.delivery_ratios),
            avg_ratios: pick(u.avg_ratios, &self.avg_ratios),
            next_hops: pick(u.next_hops, &self.next_hops),
            duty_cycles: pick(u.duty_cycles, &self.duty_cycles),
            avg_duty_cycles: pick(u.avg_duty_cycles, &self.avg_duty_cycles),
        }
    }
}

/// Copy of `series` with `item` appended; `series` itself stays as published.
fn extended<T: Clone>(series: &Arc<Vec<T>>, item: T) -> Arc<Vec<T>> {
    let mut next = Vec::with_capacity(series.len() + 1);
    next.extend_from_slice(series);
    next.push(item);
    Arc::new(next)
}

fn node_name(id: u32) -> String {
    format!("node-{}", id)
}

/// Display hints that only make sense while watching live.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    HighlightNode { id: u32 },
    HighlightLink { src: u32, dst: u32 },
    AnnotateRank { id: u32, rank: u32 },
    AnnotateDutyCycle { id: u32, on_ticks: u64, total_ticks: u64 },
    HighlightIpHop { from: u32, to: u32 },
}

/// Wall-clock seconds used to stamp aggregate points.
pub fn wall_clock_secs() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Turns relayed events into history snapshots.
#[derive(Debug)]
pub struct Dashboard {
    history: HistoryStore<StateSnapshot>,
    delivery: DeliveryCounters,
    next_hops: BTreeMap<u32, BTreeMap<u32, u64>>,
    duty_cycles: BTreeMap<u32, f64>,
    clock: fn() -> f64,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::with_clock(wall_clock_secs)
    }

    /// Dashboard stamping aggregate points with `clock` instead of the wall clock.
    pub fn with_clock(clock: fn() -> f64) -> Self {
        Dashboard {
            history: HistoryStore::new(),
            delivery: DeliveryCounters::new(),
            next_hops: BTreeMap::new(),
            duty_cycles: BTreeMap::new(),
            clock,
        }
    }

    pub fn history(&self) -> &HistoryStore<StateSnapshot> {
        &self.history
    }

    pub fn current(&self) -> Arc<StateSnapshot> {
        self.history.current()
    }

    pub fn set_view(&mut self, view: ViewMode) -> ViewMode {
        self.history.set_view(view)
    }

    pub fn delivery(&self) -> &DeliveryCounters {
        &self.delivery
    }

    /// Apply one relayed envelope.
    pub fn apply(&mut self, envelope: &EventEnvelope) -> Vec<Notice> {
        self.apply_event(&envelope.event, envelope.latency)
    }

    /// Apply one event; `latency` is the relay's latency for matched receives.
    pub fn apply_event(&mut self, event: &Event, latency: Option<f64>) -> Vec<Notice> {
        let mut notices = Vec::new();
        match *event {
            Event::Highlight { id } => notices.push(Notice::HighlightNode { id }),
            Event::LinkHop { src, dst } => {
                self.link_layer_hop(src, dst);
                notices.push(Notice::HighlightLink { src, dst });
            }
            Event::Rank { id, rank } => notices.push(Notice::AnnotateRank { id, rank }),
            Event::Neighbor { id, neighbor_id } => {
                self.add_node(id);
                self.add_node(neighbor_id);
                self.add_link(id, neighbor_id);
            }
            Event::Packet { from, phase: PacketPhase::Sent, .. } => {
                self.delivery.on_sent(from);
            }
            Event::Packet { from, to, seq_num, phase: PacketPhase::Received, .. } => {
                if self.packet_received(from, to, seq_num, latency) {
                    notices.push(Notice::HighlightIpHop { from, to });
                }
            }
            Event::DeliveryReport { .. } => {}
            Event::DutyCycle { id, on_ticks, total_ticks } => {
                if self.duty_cycle(id, on_ticks, total_ticks) {
                    notices.push(Notice::AnnotateDutyCycle { id, on_ticks, total_ticks });
                }
            }
        }

        if self.history.is_live() {
            notices
        } else {
            Vec::new()
        }
    }

    fn add_node(&mut self, id: u32) {
        let name = node_name(id);
        let state = self.history.latest();
        if state.nodes.iter().any(|n| n.id == name) {
            return;
        }

        let group = if id == ROOT_NODE { ROOT_GROUP } else { NODE_GROUP };
        let nodes = extended(&state.nodes, Node { id: name.clone(), group });

        let mut update = StateUpdate {
            nodes: Some(nodes),
            ..Default::default()
        };
        if id != ROOT_NODE {
            update.ip_hops = Some(extended(
                &state.ip_hops,
                IpHop {
                    id: format!("hop-{}-{}", ROOT_NODE, id),
                    source: node_name(ROOT_NODE),
                    target: name,
                    value: 1,
                },
            ));
        }
        self.history.append(update);
    }

    fn add_link(&mut self, a: u32, b: u32) {
        if a == b {
            return;
        }
        let (source, target) = (node_name(a.min(b)), node_name(a.max(b)));
        let state = self.history.latest();
        if state.links.iter().any(|l| l.source == source && l.target == target) {
            return;
        }
        let links = extended(&state.links, Link { source, target, value: 1 });
        self.history.append(StateUpdate {
            links: Some(links),
            ..Default::default()
        });
    }

    fn link_layer_hop(&mut self, src: u32, dst: u32) {
        *self.next_hops.entry(src).or_default().entry(dst).or_insert(0) += 1;

        let next_hops = self
            .next_hops
            .iter()
            .map(|(id, hops)| NextHop {
                id: *id,
                hops: hops.iter().map(|(dst, count)| HopCount { dst: *dst, count: *count }).collect(),
            })
            .collect();

        self.history.append(StateUpdate {
            next_hops: Some(Arc::new(next_hops)),
            ..Default::default()
        });
    }

    /// Returns false when the sample was unusable.
    fn duty_cycle(&mut self, id: u32, on_ticks: u64, total_ticks: u64) -> bool {
        if total_ticks == 0 {
            debug!("Ignoring duty cycle with zero total ticks from node {}", id);
            return false;
        }
        self.duty_cycles.insert(id, on_ticks as f64 / total_ticks as f64);

        let state = self.history.latest();
        let avg = self.duty_cycles.values().sum::<f64>() / self.duty_cycles.len() as f64;
        let point = SeriesPoint {
            timestamp: (self.clock)(),
            time_index: self.history.len(),
            value: avg,
        };

        self.history.append(StateUpdate {
            duty_cycles: Some(extended(&state.duty_cycles, self.duty_cycles.clone())),
            avg_duty_cycles: Some(extended(&state.avg_duty_cycles, point)),
            ..Default::default()
        });
        true
    }

    /// Returns whether anything was recorded.
    fn packet_received(&mut self, from: u32, to: u32, seq_num: u32, latency: Option<f64>) -> bool {
        let counted = self.delivery.on_received(from, seq_num);
        if latency.is_none() && !counted {
            return false;
        }

        let state = self.history.latest();
        let now = (self.clock)();
        let time_index = self.history.len();
        let mut update = StateUpdate::default();

        if let Some(latency) = latency {
            let latencies = extended(&state.latencies, latency);
            let avg = latencies.iter().sum::<f64>() / latencies.len() as f64;
            update.avg_latencies = Some(extended(
                &state.avg_latencies,
                SeriesPoint { timestamp: now, time_index, value: avg },
            ));
            update.latencies = Some(latencies);
            update.packets = Some(extended(&state.packets, PacketRecord { from, to, seq_num, latency }));
        }

        let ratios: Vec<DeliveryRatio> = self
            .delivery
            .iter()
            .map(|(id, c)| DeliveryRatio {
                id,
                sent: c.sent,
                received: c.received,
                last_seq_num: c.last_seq_num,
            })
            .collect();
        update.delivery_ratios = Some(Arc::new(ratios));
        if let Some(avg) = self.delivery.average_ratio() {
            update.avg_ratios = Some(extended(
                &state.avg_ratios,
                SeriesPoint { timestamp: now, time_index, value: avg },
            ));
        }

        self.history.append(update);
        true
    }

    /// Export the history as JSON.
    pub fn save_history(&self) -> Result<String, HistoryError> {
        self.history.save()
    }

    pub fn save_history_to(&self, path: &Path) -> Result<(), HistoryError> {
        self.history.save_to_path(path)
    }

    /// Import a history document and continue from its newest snapshot.
    pub fn load_history(&mut self, json: &str) -> Result<(), HistoryError> {
        self.history.load(json)?;
        self.restore_aggregates();
        Ok(())
    }

    pub fn load_history_from(&mut self, path: &Path) -> Result<(), HistoryError> {
        self.history.load_from_path(path)?;
        self.restore_aggregates();
        Ok(())
    }

    /// Rebuild running counters from the newest snapshot so later events extend the imported
    /// series instead of restarting them.
    fn restore_aggregates(&mut self) {
        let state = self.history.latest();

        self.delivery = DeliveryCounters::new();
        for r in state.delivery_ratios.iter() {
            self.delivery.restore(
                r.id,
                DeliveryCounter {
                    sent: r.sent,
                    received: r.received,
                    last_seq_num: r.last_seq_num,
                },
            );
        }

        self.next_hops = state
            .next_hops
            .iter()
            .map(|n| (n.id, n.hops.iter().map(|h| (h.dst, h.count)).collect()))
            .collect();

        self.duty_cycles = state.duty_cycles.last().cloned().unwrap_or_default();
    }
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_clock() -> f64 {
        42.0
    }

    fn dashboard() -> Dashboard {
        Dashboard::with_clock(fixed_clock)
    }

    fn sent(from: u32, seq: u32) -> Event {
        Event::Packet { from, to: 1, seq_num: seq, phase: PacketPhase::Sent, timestamp: 0.0 }
    }

    fn received(from: u32, seq: u32) -> Event {
        Event::Packet { from, to: 1, seq_num: seq, phase: PacketPhase::Received, timestamp: 0.0 }
    }

    #[test]
    fn test_neighbor_adds_nodes_hops_and_link() {
        let mut d = dashboard();
        d.apply_event(&Event::Neighbor { id: 1, neighbor_id: 3 }, None);

        let s = d.current();
        assert_eq!(d.history().len(), 3);
        assert_eq!(
            *s.nodes,
            vec![
                Node { id: "node-1".into(), group: ROOT_GROUP },
                Node { id: "node-3".into(), group: NODE_GROUP },
            ]
        );
        assert_eq!(s.ip_hops.len(), 1);
        assert_eq!(s.ip_hops[0].id, "hop-1-3");
        assert_eq!(s.links[0].source, "node-1");
        assert_eq!(s.links[0].target, "node-3");
    }

    #[test]
    fn test_duplicate_topology_is_not_appended() {
        let mut d = dashboard();
        d.apply_event(&Event::Neighbor { id: 4, neighbor_id: 2 }, None);
        let len = d.history().len();
        d.apply_event(&Event::Neighbor { id: 2, neighbor_id: 4 }, None);
        d.apply_event(&Event::Neighbor { id: 2, neighbor_id: 2 }, None);
        assert_eq!(d.history().len(), len);
        let s = d.current();
        assert_eq!(s.links.len(), 1);
        assert_eq!(s.links[0].source, "node-2");
        assert_eq!(s.links[0].target, "node-4");
    }

    #[test]
    fn test_received_with_latency() {
        let mut d = dashboard();
        d.apply_event(&sent(2, 7), None);
        assert!(d.history().is_empty());

        let notices = d.apply_event(&received(2, 7), Some(45.0));
        assert_eq!(notices, vec![Notice::HighlightIpHop { from: 2, to: 1 }]);

        let s = d.current();
        assert_eq!(*s.latencies, vec![45.0]);
        assert_eq!(*s.packets, vec![PacketRecord { from: 2, to: 1, seq_num: 7, latency: 45.0 }]);
        assert_eq!(*s.avg_latencies, vec![SeriesPoint { timestamp: 42.0, time_index: 0, value: 45.0 }]);
        assert_eq!(s.delivery_ratios[0].received, 1);
        assert_eq!(s.avg_ratios[0].value, 1.0);
    }

    #[test]
    fn test_received_without_latency_still_counts_delivery() {
        let mut d = dashboard();
        d.apply_event(&sent(2, 1), None);
        d.apply_event(&sent(2, 2), None);
        d.apply_event(&received(2, 1), None);

        let s = d.current();
        assert!(s.latencies.is_empty());
        assert!(s.packets.is_empty());
        assert_eq!(s.delivery_ratios[0].received, 1);
        assert_eq!(s.avg_ratios.last().unwrap().value, 0.5);
    }

    #[test]
    fn test_duplicate_receive_without_latency_changes_nothing() {
        let mut d = dashboard();
        d.apply_event(&sent(2, 1), None);
        d.apply_event(&received(2, 1), None);
        let len = d.history().len();
        assert!(d.apply_event(&received(2, 1), None).is_empty());
        assert_eq!(d.history().len(), len);
        assert_eq!(d.delivery().get(2).unwrap().received, 1);
    }

    #[test]
    fn test_average_points_carry_history_index() {
        let mut d = dashboard();
        d.apply_event(&Event::Neighbor { id: 1, neighbor_id: 2 }, None);
        d.apply_event(&sent(2, 1), None);
        d.apply_event(&received(2, 1), Some(10.0));
        d.apply_event(&sent(2, 2), None);
        d.apply_event(&received(2, 2), Some(30.0));

        let s = d.current();
        let points: Vec<(usize, f64)> = s.avg_latencies.iter().map(|p| (p.time_index, p.value)).collect();
        assert_eq!(points, vec![(3, 10.0), (4, 20.0)]);
        for p in s.avg_latencies.iter() {
            let at = d.history().get(p.time_index).unwrap();
            assert_eq!(at.avg_latencies.last(), Some(p));
        }
    }

    #[test]
    fn test_duty_cycle_average() {
        let mut d = dashboard();
        d.apply_event(&Event::DutyCycle { id: 2, on_ticks: 10, total_ticks: 100 }, None);
        d.apply_event(&Event::DutyCycle { id: 3, on_ticks: 30, total_ticks: 100 }, None);
        assert!(d.apply_event(&Event::DutyCycle { id: 4, on_ticks: 1, total_ticks: 0 }, None).is_empty());

        let s = d.current();
        assert_eq!(s.duty_cycles.len(), 2);
        assert_eq!(s.duty_cycles[1].get(&3), Some(&0.3));
        let avg = s.avg_duty_cycles.last().unwrap().value;
        assert!((avg - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_next_hops_counted() {
        let mut d = dashboard();
        d.apply_event(&Event::LinkHop { src: 3, dst: 1 }, None);
        d.apply_event(&Event::LinkHop { src: 3, dst: 1 }, None);
        d.apply_event(&Event::LinkHop { src: 3, dst: 2 }, None);

        let s = d.current();
        assert_eq!(
            *s.next_hops,
            vec![NextHop {
                id: 3,
                hops: vec![HopCount { dst: 1, count: 2 }, HopCount { dst: 2, count: 1 }],
            }]
        );
    }

    #[test]
    fn test_notices_only_while_live() {
        let mut d = dashboard();
        d.apply_event(&Event::Neighbor { id: 1, neighbor_id: 2 }, None);
        assert_eq!(
            d.apply_event(&Event::Rank { id: 2, rank: 256 }, None),
            vec![Notice::AnnotateRank { id: 2, rank: 256 }]
        );

        d.set_view(ViewMode::Frozen(0));
        assert!(d.apply_event(&Event::Highlight { id: 2 }, None).is_empty());
        assert!(d.apply_event(&Event::LinkHop { src: 2, dst: 1 }, None).is_empty());
        // frozen view still shows snapshot 0 while history grows
        assert_eq!(d.current(), d.history().get(0).unwrap());
        assert_eq!(d.history().len(), 4);
    }

    #[test]
    fn test_snapshots_share_untouched_series() {
        let mut d = dashboard();
        d.apply_event(&Event::Neighbor { id: 1, neighbor_id: 2 }, None);
        d.apply_event(&Event::LinkHop { src: 2, dst: 1 }, None);
        let before = d.history().get(2).unwrap();
        let after = d.history().get(3).unwrap();
        assert!(Arc::ptr_eq(&before.nodes, &after.nodes));
        assert!(!Arc::ptr_eq(&before.next_hops, &after.next_hops));
    }

    #[test]
    fn test_export_import_round_trip_and_resume() {
        let mut d = dashboard();
        d.apply_event(&Event::Neighbor { id: 1, neighbor_id: 2 }, None);
        d.apply_event(&sent(2, 1), None);
        d.apply_event(&received(2, 1), Some(12.5));
        d.apply_event(&Event::LinkHop { src: 2, dst: 1 }, None);
        d.apply_event(&Event::DutyCycle { id: 2, on_ticks: 5, total_ticks: 50 }, None);
        let json = d.save_history().unwrap();

        let mut restored = dashboard();
        restored.load_history(&json).unwrap();
        assert_eq!(restored.history().len(), d.history().len());
        for (a, b) in d.history().iter().zip(restored.history().iter()) {
            assert_eq!(a, b);
        }

        // counters continue from the imported state
        restored.apply_event(&sent(2, 2), None);
        restored.apply_event(&received(2, 2), None);
        let ratio = &restored.current().delivery_ratios[0];
        assert_eq!((ratio.sent, ratio.received, ratio.last_seq_num), (2, 2, 2));
        restored.apply_event(&Event::LinkHop { src: 2, dst: 1 }, None);
        assert_eq!(restored.current().next_hops[0].hops[0].count, 2);
    }

    #[test]
    fn test_export_import_exact_for_fractional_averages() {
        let mut d = Dashboard::new();
        for seq in 0..300u32 {
            let from = 2 + seq % 3;
            d.apply_event(&sent(from, seq), None);
            if seq % 7 != 0 {
                let latency = f64::from(seq * 7 % 23) + 0.1 * f64::from(seq);
                d.apply_event(&received(from, seq), Some(latency));
            }
            d.apply_event(&Event::DutyCycle { id: from, on_ticks: u64::from(seq % 11), total_ticks: 97 }, None);
        }
        let json = d.save_history().unwrap();

        let mut restored = dashboard();
        restored.load_history(&json).unwrap();
        assert_eq!(restored.history().len(), d.history().len());
        for (i, (a, b)) in d.history().iter().zip(restored.history().iter()).enumerate() {
            assert_eq!(a, b, "snapshot {} differs", i);
        }
    }

    #[test]
    fn test_import_failure_keeps_dashboard() {
        let mut d = dashboard();
        d.apply_event(&Event::Neighbor { id: 1, neighbor_id: 2 }, None);
        assert!(d.load_history("[{\"nodes\": 5}]").is_err());
        assert_eq!(d.history().len(), 3);
    }

    #[test]
    fn test_snapshot_json_uses_camel_case() {
        let json = serde_json::to_value(StateSnapshot::default()).unwrap();
        assert_eq!(json["bucketSize"], 50);
        assert!(json["avgLatencies"].is_array());
        assert!(json["ipHops"].is_array());
        assert!(json["avgDutyCycles"].is_array());
    }
}
