// Monitor client
// Applies relayed events to a dashboard, answers clock probes and serves console commands

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::clocksync::{self, now_millis};
use crate::dashboard::{Dashboard, Notice, StateSnapshot};
use crate::history::ViewMode;

use super::connection::{parse_line, Connection};
use super::messages::ControlMessage;

/// History position published next to the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryStatus {
    pub len: usize,
    pub view: ViewMode,
}

/// What readers outside the monitor task get to see.
#[derive(Debug, Clone)]
pub struct Published {
    pub snapshot: Arc<StateSnapshot>,
    pub status: HistoryStatus,
}

/// One console command.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Live,
    View(usize),
    Status,
    Save(PathBuf),
    Load(PathBuf),
    Quit,
}

pub fn parse_command(line: &str) -> Result<ConsoleCommand, String> {
    let mut parts = line.split_whitespace();
    let cmd = parts.next().ok_or_else(|| "empty command".to_string())?;
    let arg = parts.next();

    match (cmd, arg) {
        ("live", None) => Ok(ConsoleCommand::Live),
        ("view", Some(i)) => i
            .parse()
            .map(ConsoleCommand::View)
            .map_err(|_| format!("not a history index: {}", i)),
        ("status", None) => Ok(ConsoleCommand::Status),
        ("save", Some(path)) => Ok(ConsoleCommand::Save(PathBuf::from(path))),
        ("load", Some(path)) => Ok(ConsoleCommand::Load(PathBuf::from(path))),
        ("quit" | "exit", None) => Ok(ConsoleCommand::Quit),
        ("view" | "save" | "load", None) => Err(format!("{} needs an argument", cmd)),
        _ => Err(format!("unknown command: {}", line.trim())),
    }
}

/// Dashboard owner for one relay link.
pub struct Monitor {
    dashboard: Dashboard,
    state_tx: watch::Sender<Published>,
}

impl Monitor {
    pub fn new(dashboard: Dashboard) -> (Self, watch::Receiver<Published>) {
        let (state_tx, state_rx) = watch::channel(published(&dashboard));
        (Monitor { dashboard, state_tx }, state_rx)
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    /// Serve the relay link and the console until the link closes, `quit` is entered or
    /// `shutdown` fires.
    pub async fn run<R>(
        &mut self,
        relay: &mut Connection,
        mut console: Option<Lines<R>>,
        shutdown: &mut mpsc::Receiver<()>,
    ) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        loop {
            tokio::select! {
                line = relay.next_line() => {
                    match line? {
                        Some(line) => {
                            if !self.handle_relay_line(relay, &line).await? {
                                return Ok(());
                            }
                        }
                        None => {
                            info!("Relay closed the connection");
                            return Ok(());
                        }
                    }
                }
                line = next_console_line(&mut console) => {
                    match line {
                        Ok(Some(line)) if line.trim().is_empty() => {}
                        Ok(Some(line)) => match parse_command(&line) {
                            Ok(ConsoleCommand::Quit) => return Ok(()),
                            Ok(cmd) => println!("{}", self.execute(cmd)),
                            Err(e) => println!("{}", e),
                        },
                        Ok(None) => {
                            debug!("Console closed");
                            console = None;
                        }
                        Err(e) => {
                            warn!("Console read error: {}", e);
                            console = None;
                        }
                    }
                }
                _ = shutdown.recv() => return Ok(()),
            }
        }
    }

    /// Returns false when the relay refused us.
    async fn handle_relay_line(&mut self, relay: &mut Connection, line: &str) -> io::Result<bool> {
        let msg = match parse_line(line) {
            Ok(Some(msg)) => msg,
            Ok(None) => return Ok(true),
            Err(e) => {
                warn!("Failed to parse relay message: {}", e);
                return Ok(true);
            }
        };

        match msg {
            ControlMessage::Message(envelope) => {
                for notice in self.dashboard.apply(&envelope) {
                    log_notice(&notice);
                }
                self.publish();
            }
            ControlMessage::RequestSync => relay.send(&clocksync::answer_request(now_millis())).await?,
            ControlMessage::Sync2 { t1, timestamp } => {
                relay.send(&clocksync::answer_sync2(t1, timestamp, now_millis())).await?
            }
            ControlMessage::Busy => {
                warn!("Relay {} is already serving another monitor", relay.peer_addr());
                return Ok(false);
            }
            other => debug!("Ignoring {} from relay", other.kind()),
        }
        Ok(true)
    }

    /// Run one console command and describe the outcome.
    pub fn execute(&mut self, cmd: ConsoleCommand) -> String {
        let reply = match cmd {
            ConsoleCommand::Live => {
                self.dashboard.set_view(ViewMode::Live);
                "live".to_string()
            }
            ConsoleCommand::View(i) => match self.dashboard.set_view(ViewMode::Frozen(i)) {
                ViewMode::Frozen(j) if j == i => format!("viewing snapshot {}", i),
                _ => format!("no snapshot {} (history has {})", i, self.dashboard.history().len()),
            },
            ConsoleCommand::Status => {
                let history = self.dashboard.history();
                let current = self.dashboard.current();
                format!(
                    "{} snapshots, view {:?}, {} nodes, {} links, {} packets",
                    history.len(),
                    history.view(),
                    current.nodes.len(),
                    current.links.len(),
                    current.packets.len()
                )
            }
            ConsoleCommand::Save(path) => match self.dashboard.save_history_to(&path) {
                Ok(()) => format!("saved {} snapshots to {}", self.dashboard.history().len(), path.display()),
                Err(e) => format!("save failed: {}", e),
            },
            ConsoleCommand::Load(path) => match self.dashboard.load_history_from(&path) {
                Ok(()) => format!("loaded {} snapshots from {}", self.dashboard.history().len(), path.display()),
                Err(e) => format!("load failed: {}", e),
            },
            ConsoleCommand::Quit => "bye".to_string(),
        };
        self.publish();
        reply
    }

    fn publish(&self) {
        self.state_tx.send_replace(published(&self.dashboard));
    }
}

fn published(dashboard: &Dashboard) -> Published {
    let history = dashboard.history();
    Published {
        snapshot: dashboard.current(),
        status: HistoryStatus {
            len: history.len(),
            view: history.view(),
        },
    }
}

fn log_notice(notice: &Notice) {
    match notice {
        Notice::HighlightNode { id } => info!("Node {} highlighted", id),
        Notice::HighlightLink { src, dst } => debug!("Link-layer hop {} -> {}", src, dst),
        Notice::AnnotateRank { id, rank } => info!("Node {} rank {}", id, rank),
        Notice::AnnotateDutyCycle { id, on_ticks, total_ticks } => {
            debug!("Node {} duty cycle {}/{}", id, on_ticks, total_ticks)
        }
        Notice::HighlightIpHop { from, to } => debug!("Packet {} -> {} delivered", from, to),
    }
}

async fn next_console_line<R>(console: &mut Option<Lines<R>>) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    match console {
        Some(lines) => lines.next_line().await,
        None => std::future::pending().await,
    }
}

/// Console commands from stdin.
pub fn stdin_console() -> Lines<BufReader<Stdin>> {
    BufReader::new(tokio::io::stdin()).lines()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    use crate::events::{Event, PacketPhase};
    use crate::net::messages::EventEnvelope;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("live"), Ok(ConsoleCommand::Live));
        assert_eq!(parse_command(" view 12 "), Ok(ConsoleCommand::View(12)));
        assert_eq!(parse_command("save out.json"), Ok(ConsoleCommand::Save("out.json".into())));
        assert_eq!(parse_command("quit"), Ok(ConsoleCommand::Quit));
        assert!(parse_command("view").is_err());
        assert!(parse_command("view -1").is_err());
        assert!(parse_command("rewind").is_err());
    }

    #[test]
    fn test_execute_view_and_status() {
        let mut dashboard = Dashboard::new();
        dashboard.apply_event(&Event::Neighbor { id: 1, neighbor_id: 2 }, None);
        let (mut monitor, rx) = Monitor::new(dashboard);

        assert_eq!(monitor.execute(ConsoleCommand::View(1)), "viewing snapshot 1");
        assert_eq!(rx.borrow().status, HistoryStatus { len: 3, view: ViewMode::Frozen(1) });
        assert!(monitor.execute(ConsoleCommand::View(9)).starts_with("no snapshot 9"));
        assert!(monitor.execute(ConsoleCommand::Status).starts_with("3 snapshots"));
        monitor.execute(ConsoleCommand::Live);
        assert_eq!(rx.borrow().status.view, ViewMode::Live);
    }

    #[test]
    fn test_execute_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");

        let mut dashboard = Dashboard::new();
        dashboard.apply_event(&Event::Neighbor { id: 1, neighbor_id: 2 }, None);
        let (mut monitor, _rx) = Monitor::new(dashboard);
        assert!(monitor.execute(ConsoleCommand::Save(path.clone())).starts_with("saved 3"));

        let (mut other, rx) = Monitor::new(Dashboard::new());
        assert!(other.execute(ConsoleCommand::Load(path)).starts_with("loaded 3"));
        assert_eq!(rx.borrow().snapshot.nodes.len(), 2);
        assert!(other
            .execute(ConsoleCommand::Load(dir.path().join("missing.json")))
            .starts_with("load failed"));
    }

    #[tokio::test]
    async fn test_monitor_applies_relay_messages() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let relay = tokio::spawn(async move {
            let (stream, peer) = listener.accept().await.unwrap();
            let mut conn = Connection::new(stream, peer);
            let events = [
                Event::Neighbor { id: 1, neighbor_id: 2 },
                Event::Packet { from: 2, to: 1, seq_num: 1, phase: PacketPhase::Sent, timestamp: 10.0 },
            ];
            for ev in events {
                conn.send(&ControlMessage::Message(EventEnvelope::new(ev, Some(3.0)))).await.unwrap();
            }
            let mut received = EventEnvelope::new(
                Event::Packet { from: 2, to: 1, seq_num: 1, phase: PacketPhase::Received, timestamp: 55.0 },
                Some(3.0),
            );
            received.latency = Some(45.0);
            conn.send(&ControlMessage::Message(received)).await.unwrap();

            // the monitor answers probes like any responder
            conn.send(&ControlMessage::RequestSync).await.unwrap();
            let line = conn.next_line().await.unwrap().unwrap();
            assert!(matches!(parse_line(&line).unwrap(), Some(ControlMessage::Sync1 { .. })));
        });

        let mut link = Connection::connect(&addr.to_string()).await.unwrap();
        let (mut monitor, rx) = Monitor::new(Dashboard::new());
        let (_shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let console: Option<Lines<BufReader<&[u8]>>> = None;

        timeout(Duration::from_secs(5), monitor.run(&mut link, console, &mut shutdown_rx))
            .await
            .expect("monitor did not finish")
            .unwrap();
        relay.await.unwrap();

        let published = rx.borrow().clone();
        assert_eq!(published.status.len, 4);
        assert_eq!(*published.snapshot.latencies, vec![45.0]);
        assert_eq!(published.snapshot.delivery_ratios[0].received, 1);
    }

    #[tokio::test]
    async fn test_console_quit_stops_monitor() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _relay = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(stream);
        });

        let mut link = Connection::connect(&addr.to_string()).await.unwrap();
        let (mut monitor, _rx) = Monitor::new(Dashboard::new());
        let (_shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let input: &[u8] = b"status\n\nquit\n";
        let console = Some(BufReader::new(input).lines());

        timeout(Duration::from_secs(5), monitor.run(&mut link, console, &mut shutdown_rx))
            .await
            .expect("quit was not honoured")
            .unwrap();
    }
}
