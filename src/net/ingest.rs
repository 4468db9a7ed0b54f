// Serial ingestion
// Runs one serialdump subprocess per attached mote and decodes its output into events

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::clocksync::now_millis;
use crate::constants::{INGEST_CHANNEL_CAPACITY, SERIAL_BAUD, SERIAL_DEVICE_PATTERN};
use crate::decoder::{decode_line, DecodeError};
use crate::events::Event;

/// How the relay finds and reads its motes.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub enabled: bool,
    pub serialdump: PathBuf,
    /// Device names under /dev; discovered when empty
    pub devices: Vec<String>,
}

/// Serial devices whose name contains `ttyUSB`, sorted.
pub async fn discover_devices(dev_dir: &str) -> std::io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dev_dir).await?;
    let mut found = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.contains(SERIAL_DEVICE_PATTERN) {
            found.push(name);
        }
    }
    found.sort();
    Ok(found)
}

/// Live ingestion for one relay session.
pub struct Ingest {
    children: Vec<(String, Child)>,
    rx: mpsc::Receiver<Event>,
    closed: bool,
}

impl Ingest {
    /// Spawn serialdump for every configured (or discovered) device.
    ///
    /// Spawn failures are logged and skipped; a session without motes still relays upstream
    /// traffic.
    pub async fn start(config: &IngestConfig) -> Self {
        let (tx, rx) = mpsc::channel(INGEST_CHANNEL_CAPACITY);
        let mut children = Vec::new();

        if config.enabled {
            let devices = if config.devices.is_empty() {
                match discover_devices("/dev").await {
                    Ok(d) => d,
                    Err(e) => {
                        warn!("Device discovery failed: {}", e);
                        Vec::new()
                    }
                }
            } else {
                config.devices.clone()
            };

            if devices.is_empty() {
                warn!("No serial devices found, relaying upstream traffic only");
            }

            for device in devices {
                match spawn_reader(&config.serialdump, &device, tx.clone()) {
                    Ok(child) => {
                        info!("Reading motes on /dev/{}", device);
                        children.push((device, child));
                    }
                    Err(e) => warn!("Failed to start {} for {}: {}", config.serialdump.display(), device, e),
                }
            }
        }

        Ingest {
            children,
            rx,
            closed: false,
        }
    }

    /// Ingestion fed from an existing channel, without subprocesses.
    pub fn from_channel(rx: mpsc::Receiver<Event>) -> Self {
        Ingest {
            children: Vec::new(),
            rx,
            closed: false,
        }
    }

    /// Next decoded event. Pends forever once every reader has finished.
    pub async fn recv(&mut self) -> Event {
        if !self.closed {
            if let Some(ev) = self.rx.recv().await {
                return ev;
            }
            debug!("All serial readers finished");
            self.closed = true;
        }
        std::future::pending().await
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Kill every subprocess.
    pub async fn shutdown(&mut self) {
        for (device, mut child) in self.children.drain(..) {
            if let Err(e) = child.kill().await {
                debug!("Killing reader for {}: {}", device, e);
            }
        }
        self.rx.close();
    }
}

fn spawn_reader(serialdump: &Path, device: &str, tx: mpsc::Sender<Event>) -> std::io::Result<Child> {
    let mut child = Command::new(serialdump)
        .arg(format!("-b{}", SERIAL_BAUD))
        .arg(format!("/dev/{}", device))
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "serialdump stdout not captured"))?;

    let device = device.to_string();
    tokio::spawn(async move {
        pump_lines(&device, BufReader::new(stdout), &tx).await;
    });

    Ok(child)
}

/// Forward every line of `reader` until it ends or the session goes away. Bytes that are not
/// UTF-8 are replaced, so line noise never stops a device.
async fn pump_lines<R: AsyncBufRead + Unpin>(device: &str, mut reader: R, tx: &mpsc::Sender<Event>) {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                debug!("serialdump for {} closed its output", device);
                break;
            }
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                if !forward_line(device, line.trim_end(), tx).await {
                    break;
                }
            }
            Err(e) => {
                warn!("Read error from {}: {}", device, e);
                break;
            }
        }
    }
}

/// Decode one line and hand it to the session. Returns false once the session is gone.
async fn forward_line(device: &str, line: &str, tx: &mpsc::Sender<Event>) -> bool {
    match decode_line(line, now_millis()) {
        Ok(ev) => tx.send(ev).await.is_ok(),
        Err(DecodeError::NotACommand) => {
            if !line.trim().is_empty() {
                debug!("{}: {}", device, line);
            }
            true
        }
        Err(e) => {
            debug!("{}: dropping {:?}: {}", device, line, e);
            true
        }
    }
}
