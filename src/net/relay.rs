// Relay session
// Owns the downstream client link, the optional upstream link, clock sync and latency state
// for as long as one client stays connected

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::clocksync::{self, now_millis, ClockSync};
use crate::events::{Event, PacketPhase};
use crate::latency::{LatencyCorrelator, Origin};

use super::connection::{parse_line, Connection};
use super::ingest::{Ingest, IngestConfig};
use super::messages::{ControlMessage, EventEnvelope};

/// Settings shared by every session of one relay.
#[derive(Debug, Clone)]
pub struct RelayOptions {
    /// Port used when a `connect` request names a bare host
    pub default_upstream_port: u16,
    pub sync_interval: Duration,
    pub connect_timeout: Duration,
    pub ingest: IngestConfig,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    ClientLeft,
    Shutdown,
}

/// Append the default port when `ip` has none.
pub fn upstream_address(ip: &str, default_port: u16) -> String {
    let ip = ip.trim();
    if ip.parse::<std::net::SocketAddr>().is_ok() {
        return ip.to_string();
    }
    match ip.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && !host.contains(':') && port.parse::<u16>().is_ok() => {
            ip.to_string()
        }
        _ if ip.contains(':') => format!("[{}]:{}", ip.trim_start_matches('[').trim_end_matches(']'), default_port),
        _ => format!("{}:{}", ip, default_port),
    }
}

/// Upstream connect in flight, polled from the session loop.
type PendingConnect = Pin<Box<dyn Future<Output = io::Result<Connection>> + Send>>;

/// One downstream client and everything it owns.
pub struct RelaySession {
    downstream: Connection,
    upstream: Option<Connection>,
    connecting: Option<(String, PendingConnect)>,
    sync_timer: Option<Interval>,
    clock: ClockSync,
    correlator: LatencyCorrelator,
    ingest: Ingest,
    options: RelayOptions,
}

impl RelaySession {
    /// New session; starts serial ingestion right away.
    pub async fn start(downstream: Connection, options: RelayOptions) -> Self {
        let ingest = Ingest::start(&options.ingest).await;
        Self::with_ingest(downstream, options, ingest)
    }

    pub fn with_ingest(downstream: Connection, options: RelayOptions, ingest: Ingest) -> Self {
        RelaySession {
            downstream,
            upstream: None,
            connecting: None,
            sync_timer: None,
            clock: ClockSync::new(),
            correlator: LatencyCorrelator::new(),
            ingest,
            options,
        }
    }

    /// Process messages until the client leaves or `shutdown` fires.
    ///
    /// Clients connecting on `listener` meanwhile are told the relay is busy.
    pub async fn run(&mut self, listener: &TcpListener, shutdown: &mut mpsc::Receiver<()>) -> SessionEnd {
        let peer = self.downstream.peer_addr();
        loop {
            tokio::select! {
                line = self.downstream.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            if let Err(e) = self.handle_downstream_line(&line).await {
                                info!("Client {} write error: {}", peer, e);
                                return SessionEnd::ClientLeft;
                            }
                        }
                        Ok(None) => {
                            info!("Client {} disconnected", peer);
                            return SessionEnd::ClientLeft;
                        }
                        Err(e) => {
                            info!("Client {} read error: {}", peer, e);
                            return SessionEnd::ClientLeft;
                        }
                    }
                }
                line = next_upstream_line(&mut self.upstream) => {
                    let result = match line {
                        Ok(Some(line)) => self.handle_upstream_line(&line).await,
                        Ok(None) => {
                            info!("Upstream closed the connection");
                            self.close_upstream().await;
                            Ok(())
                        }
                        Err(e) => {
                            warn!("Upstream read error: {}", e);
                            self.close_upstream().await;
                            Ok(())
                        }
                    };
                    if let Err(e) = result {
                        info!("Client {} write error: {}", peer, e);
                        return SessionEnd::ClientLeft;
                    }
                }
                (addr, result) = next_connect(&mut self.connecting) => {
                    self.connecting = None;
                    self.finish_connect(&addr, result);
                }
                event = self.ingest.recv() => {
                    if let Err(e) = self.forward_event(event, Origin::Local).await {
                        info!("Client {} write error: {}", peer, e);
                        return SessionEnd::ClientLeft;
                    }
                }
                _ = next_tick(&mut self.sync_timer) => {
                    self.send_probe().await;
                }
                accepted = listener.accept() => {
                    if let Ok((stream, other)) = accepted {
                        warn!("Rejecting {}: already serving {}", other, peer);
                        let mut conn = Connection::new(stream, other);
                        let _ = conn.send(&ControlMessage::Busy).await;
                        let _ = conn.shutdown().await;
                    }
                }
                _ = shutdown.recv() => {
                    return SessionEnd::Shutdown;
                }
            }
        }
    }

    /// Tear down everything the session owns.
    pub async fn close(&mut self) {
        self.connecting = None;
        self.ingest.shutdown().await;
        self.close_upstream().await;
        self.correlator.clear();
        let _ = self.downstream.shutdown().await;
    }

    async fn handle_downstream_line(&mut self, line: &str) -> io::Result<()> {
        let msg = match parse_line(line) {
            Ok(Some(msg)) => msg,
            Ok(None) => return Ok(()),
            Err(e) => {
                warn!("Failed to parse client message: {}", e);
                return Ok(());
            }
        };

        match msg {
            ControlMessage::Connect { ip } => {
                self.open_upstream(&ip).await;
                Ok(())
            }
            ControlMessage::RequestSync => {
                self.downstream.send(&clocksync::answer_request(now_millis())).await
            }
            ControlMessage::Sync2 { t1, timestamp } => {
                self.downstream.send(&clocksync::answer_sync2(t1, timestamp, now_millis())).await
            }
            other => {
                debug!("Ignoring {} from client", other.kind());
                Ok(())
            }
        }
    }

    /// Errors returned here are downstream write failures; upstream failures close the
    /// upstream link only.
    async fn handle_upstream_line(&mut self, line: &str) -> io::Result<()> {
        let msg = match parse_line(line) {
            Ok(Some(msg)) => msg,
            Ok(None) => return Ok(()),
            Err(e) => {
                warn!("Failed to parse upstream message: {}", e);
                return Ok(());
            }
        };

        match msg {
            ControlMessage::Message(envelope) => self.forward_event(envelope.event, Origin::Upstream).await,
            ControlMessage::Sync1 { timestamp } => {
                if let Some(reply) = self.clock.on_sync1(timestamp, now_millis()) {
                    self.send_upstream(&reply).await;
                }
                Ok(())
            }
            ControlMessage::Sync3 { t1, t2 } => {
                if let Some(sample) = self.clock.on_sync3(t1, t2, now_millis()) {
                    debug!(
                        "Clock sample: delta {:.1}ms, one-way {:.1}ms, offset now {:?}",
                        sample.estimated_offset,
                        sample.round_trip_half,
                        self.clock.current_offset()
                    );
                }
                Ok(())
            }
            ControlMessage::RequestSync => {
                self.send_upstream(&clocksync::answer_request(now_millis())).await;
                Ok(())
            }
            ControlMessage::Sync2 { t1, timestamp } => {
                self.send_upstream(&clocksync::answer_sync2(t1, timestamp, now_millis())).await;
                Ok(())
            }
            ControlMessage::Busy => {
                warn!("Upstream is serving another client");
                self.close_upstream().await;
                Ok(())
            }
            ControlMessage::Connect { .. } => {
                debug!("Ignoring connect from upstream");
                Ok(())
            }
        }
    }

    /// Correlate and forward one event downstream.
    async fn forward_event(&mut self, event: Event, origin: Origin) -> io::Result<()> {
        let envelope = self.correlate(event, origin);
        self.downstream.send(&ControlMessage::Message(envelope)).await
    }

    /// Run packet events through the correlator, re-stamping upstream timestamps with the offset
    /// known right now.
    pub fn correlate(&mut self, event: Event, origin: Origin) -> EventEnvelope {
        let offset = self.clock.current_offset();
        let Event::Packet { from, to, seq_num, phase, timestamp } = event else {
            return EventEnvelope::new(event, offset);
        };

        let (local_ts, corrected) = match (origin, offset) {
            (Origin::Local, _) => (timestamp, true),
            (Origin::Upstream, Some(off)) => (clocksync::to_local(timestamp, off), true),
            (Origin::Upstream, None) => (timestamp, false),
        };

        let mut envelope = EventEnvelope::new(event.with_timestamp(local_ts), offset);
        match phase {
            PacketPhase::Sent => {
                self.correlator.on_sent(from, to, seq_num, local_ts, corrected, origin);
            }
            PacketPhase::Received => {
                envelope.latency = self.correlator.on_received(from, to, seq_num, local_ts, corrected);
                if envelope.latency.is_none() {
                    debug!("No send recorded for {}->{} #{}", from, to, seq_num);
                }
            }
        }
        envelope
    }

    /// Start replacing the upstream link. The connect completes in the session loop;
    /// failure leaves the session without one.
    async fn open_upstream(&mut self, ip: &str) {
        if self.upstream.is_some() {
            info!("Replacing upstream connection");
            self.close_upstream().await;
        }

        let addr = upstream_address(ip, self.options.default_upstream_port);
        if let Some((previous, _)) = self.connecting.take() {
            info!("Abandoning connect to {}", previous);
        }
        info!("Connecting to upstream {}", addr);

        let limit = self.options.connect_timeout;
        let target = addr.clone();
        let connect = async move {
            match time::timeout(limit, Connection::connect(&target)).await {
                Ok(result) => result,
                Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "connect timed out")),
            }
        };
        self.connecting = Some((addr, Box::pin(connect)));
    }

    fn finish_connect(&mut self, addr: &str, result: io::Result<Connection>) {
        match result {
            Ok(conn) => {
                info!("Connected to upstream {}", conn.peer_addr());
                let mut timer = time::interval(self.options.sync_interval);
                timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
                self.upstream = Some(conn);
                self.sync_timer = Some(timer);
            }
            Err(e) => warn!("Failed to connect to upstream {}: {}", addr, e),
        }
    }

    /// Drop the upstream link and everything tied to it.
    async fn close_upstream(&mut self) {
        self.sync_timer = None;
        self.clock.reset();
        let dropped = self.correlator.discard_origin(Origin::Upstream);
        if dropped > 0 {
            debug!("Discarded {} pending upstream sends", dropped);
        }
        if let Some(mut conn) = self.upstream.take() {
            let _ = conn.shutdown().await;
            info!("Upstream {} closed", conn.peer_addr());
        }
    }

    async fn send_probe(&mut self) {
        if self.upstream.is_none() {
            return;
        }
        let probe = self.clock.start_probe(now_millis());
        self.send_upstream(&probe).await;
    }

    async fn send_upstream(&mut self, msg: &ControlMessage) {
        let Some(conn) = self.upstream.as_mut() else {
            return;
        };
        if let Err(e) = conn.send(msg).await {
            warn!("Upstream write error: {}", e);
            self.close_upstream().await;
        }
    }
}

async fn next_upstream_line(upstream: &mut Option<Connection>) -> io::Result<Option<String>> {
    match upstream {
        Some(conn) => conn.next_line().await,
        None => std::future::pending().await,
    }
}

async fn next_connect(connecting: &mut Option<(String, PendingConnect)>) -> (String, io::Result<Connection>) {
    match connecting {
        Some((addr, connect)) => {
            let result = connect.await;
            (addr.clone(), result)
        }
        None => std::future::pending().await,
    }
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending().await,
    }
}
