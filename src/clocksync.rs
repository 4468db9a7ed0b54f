// Clock synchronization between the relay and its upstream peer
//
// Three-message round trip after a `request-sync` probe:
//   initiator -> request-sync
//   responder -> sync-1 { timestamp: Tresp1 }
//   initiator -> sync-2 { t1 = now - Tresp1, timestamp: now }
//   responder -> sync-3 { t1, t2 = now - sync2.timestamp }
// The initiator then records delta = (t2 - t1) / 2 with remote ≈ local + delta.

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::constants::SYNC_WINDOW;
use crate::net::messages::ControlMessage;

/// Current local wall clock in milliseconds since the Unix epoch.
pub fn now_millis() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

/// One completed round trip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockSample {
    /// (t1 + t2) / 2, the one-way delay estimate (ms)
    pub round_trip_half: f64,
    /// (t2 - t1) / 2 (ms)
    pub estimated_offset: f64,
    /// Local time the sample was taken (ms)
    pub observed_at: f64,
}

impl ClockSample {
    pub fn from_round_trip(t1: f64, t2: f64, observed_at: f64) -> Self {
        ClockSample {
            round_trip_half: (t1 + t2) / 2.0,
            estimated_offset: (t2 - t1) / 2.0,
            observed_at,
        }
    }
}

/// Where the initiator is within a sync cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncPhase {
    Idle,
    AwaitingSync1 { requested_at: f64 },
    AwaitingSync3 { replied_at: f64 },
}

/// Initiator side of the clock-sync protocol plus the sample window.
///
/// One instance lives exactly as long as one upstream link; a fresh link starts from an empty
/// window.
#[derive(Debug)]
pub struct ClockSync {
    window: VecDeque<ClockSample>,
    capacity: usize,
    phase: SyncPhase,
}

impl ClockSync {
    pub fn new() -> Self {
        Self::with_capacity(SYNC_WINDOW)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        ClockSync {
            window: VecDeque::with_capacity(capacity),
            capacity,
            phase: SyncPhase::Idle,
        }
    }

    /// Begin a new cycle. An unanswered previous cycle is abandoned.
    pub fn start_probe(&mut self, now: f64) -> ControlMessage {
        if self.phase != SyncPhase::Idle {
            debug!("Abandoning unanswered sync cycle ({:?})", self.phase);
        }
        self.phase = SyncPhase::AwaitingSync1 { requested_at: now };
        ControlMessage::RequestSync
    }

    /// Handle `sync-1`; returns the `sync-2` reply, or None when no cycle is waiting for it.
    pub fn on_sync1(&mut self, remote_timestamp: f64, now: f64) -> Option<ControlMessage> {
        match self.phase {
            SyncPhase::AwaitingSync1 { .. } => {
                let t1 = now - remote_timestamp;
                self.phase = SyncPhase::AwaitingSync3 { replied_at: now };
                Some(ControlMessage::Sync2 { t1, timestamp: now })
            }
            _ => {
                debug!("Ignoring sync-1 outside of a sync cycle");
                None
            }
        }
    }

    /// Handle `sync-3`; records and returns the new sample.
    pub fn on_sync3(&mut self, t1: f64, t2: f64, now: f64) -> Option<ClockSample> {
        match self.phase {
            SyncPhase::AwaitingSync3 { .. } => {
                self.phase = SyncPhase::Idle;
                let sample = ClockSample::from_round_trip(t1, t2, now);
                self.record(sample);
                Some(sample)
            }
            _ => {
                debug!("Ignoring sync-3 outside of a sync cycle");
                None
            }
        }
    }

    /// Push a sample, evicting the oldest once the window is full.
    pub fn record(&mut self, sample: ClockSample) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(sample);
    }

    /// Minimum offset over the window, None before the first sample.
    pub fn current_offset(&self) -> Option<f64> {
        self.window
            .iter()
            .map(|s| s.estimated_offset)
            .reduce(f64::min)
    }

    pub fn samples(&self) -> impl Iterator<Item = &ClockSample> {
        self.window.iter()
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Forget everything; used when the upstream link goes away.
    pub fn reset(&mut self) {
        self.window.clear();
        self.phase = SyncPhase::Idle;
    }
}

impl Default for ClockSync {
    fn default() -> Self {
        Self::new()
    }
}

/// Responder reply to `request-sync`.
pub fn answer_request(now: f64) -> ControlMessage {
    ControlMessage::Sync1 { timestamp: now }
}

/// Responder reply to `sync-2`.
pub fn answer_sync2(t1: f64, initiator_timestamp: f64, now: f64) -> ControlMessage {
    ControlMessage::Sync3 {
        t1,
        t2: now - initiator_timestamp,
    }
}

/// Translate a timestamp from the peer's clock into local terms.
pub fn to_local(remote_ts: f64, offset: f64) -> f64 {
    remote_ts - offset
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_cycle(sync: &mut ClockSync, t1: f64, t2: f64) -> ClockSample {
        sync.start_probe(0.0);
        // pick a sync-1 timestamp that yields the wanted t1
        let reply = sync.on_sync1(1000.0 - t1, 1000.0).unwrap();
        assert_eq!(reply, ControlMessage::Sync2 { t1, timestamp: 1000.0 });
        sync.on_sync3(t1, t2, 1100.0).unwrap()
    }

    #[test]
    fn test_offset_unknown_before_first_sample() {
        let sync = ClockSync::new();
        assert_eq!(sync.current_offset(), None);
    }

    #[test]
    fn test_responder_delay_bias() {
        let mut sync = ClockSync::new();
        let sample = run_cycle(&mut sync, 50.0, 30.0);
        assert_eq!(sample.estimated_offset, -10.0);
        assert_eq!(sample.round_trip_half, 40.0);
        assert_eq!(sync.current_offset(), Some(-10.0));
    }

    #[test]
    fn test_offset_is_minimum_of_window() {
        let mut sync = ClockSync::new();
        for delta in [-10.0, -8.0, -12.0, -9.0, -11.0] {
            // t1 = 0, t2 = 2 * delta gives exactly that delta
            run_cycle(&mut sync, 0.0, 2.0 * delta);
            let seen: Vec<f64> = sync.samples().map(|s| s.estimated_offset).collect();
            let min = seen.iter().cloned().fold(f64::INFINITY, f64::min);
            assert_eq!(sync.current_offset(), Some(min));
        }
        assert_eq!(sync.current_offset(), Some(-12.0));
    }

    #[test]
    fn test_sixth_sample_evicts_oldest() {
        let mut sync = ClockSync::new();
        for delta in [-20.0, -8.0, -7.0, -9.0, -6.0] {
            run_cycle(&mut sync, 0.0, 2.0 * delta);
        }
        assert_eq!(sync.current_offset(), Some(-20.0));
        run_cycle(&mut sync, 0.0, -2.0);
        assert_eq!(sync.samples().count(), 5);
        assert_eq!(sync.current_offset(), Some(-9.0));
    }

    #[test]
    fn test_custom_window_capacity() {
        let mut sync = ClockSync::with_capacity(2);
        for delta in [-30.0, -5.0, -4.0] {
            run_cycle(&mut sync, 0.0, 2.0 * delta);
        }
        assert_eq!(sync.samples().count(), 2);
        assert_eq!(sync.current_offset(), Some(-5.0));

        // zero is bumped to a single-sample window
        let mut single = ClockSync::with_capacity(0);
        run_cycle(&mut single, 0.0, -6.0);
        run_cycle(&mut single, 0.0, 4.0);
        assert_eq!(single.current_offset(), Some(2.0));
    }

    #[test]
    fn test_out_of_order_replies_ignored() {
        let mut sync = ClockSync::new();
        assert!(sync.on_sync1(5.0, 10.0).is_none());
        assert!(sync.on_sync3(1.0, 2.0, 10.0).is_none());

        sync.start_probe(0.0);
        assert!(sync.on_sync3(1.0, 2.0, 10.0).is_none());
        assert!(matches!(sync.phase(), SyncPhase::AwaitingSync1 { .. }));
        assert_eq!(sync.current_offset(), None);
    }

    #[test]
    fn test_reset_clears_window_and_cycle() {
        let mut sync = ClockSync::new();
        run_cycle(&mut sync, 50.0, 30.0);
        sync.start_probe(0.0);
        sync.reset();
        assert_eq!(sync.current_offset(), None);
        assert_eq!(sync.phase(), SyncPhase::Idle);
    }

    #[test]
    fn test_full_exchange_recovers_offset() {
        // remote clock runs 250ms ahead, one-way delay 40ms each way
        let offset = 250.0;
        let delay = 40.0;
        let mut sync = ClockSync::new();

        let local_send = 10_000.0;
        sync.start_probe(local_send);
        let sync1 = answer_request(local_send + delay + offset);
        let ControlMessage::Sync1 { timestamp } = sync1 else { panic!("expected sync-1") };

        let local_recv = local_send + 2.0 * delay;
        let ControlMessage::Sync2 { t1, timestamp: ts2 } = sync.on_sync1(timestamp, local_recv).unwrap()
        else {
            panic!("expected sync-2")
        };
        let sync3 = answer_sync2(t1, ts2, local_recv + delay + offset);
        let ControlMessage::Sync3 { t1, t2 } = sync3 else { panic!("expected sync-3") };

        let sample = sync.on_sync3(t1, t2, local_recv + 2.0 * delay).unwrap();
        assert_eq!(sample.estimated_offset, offset);
        assert_eq!(sample.round_trip_half, delay);
        assert_eq!(to_local(20_000.0, offset), 19_750.0);
    }
}
