// TCP connection handler
// One line-delimited JSON link (downstream client or upstream peer)

use tokio::net::TcpStream;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter, Lines};
use std::net::SocketAddr;
use std::io;

use super::messages::ControlMessage;

/// Represents a single TCP connection carrying one JSON message per line
pub struct Connection {
    reader: Lines<BufReader<tokio::io::ReadHalf<TcpStream>>>,
    writer: BufWriter<tokio::io::WriteHalf<TcpStream>>,
    peer_addr: SocketAddr,
}

impl Connection {
    /// Create a new connection from a TCP stream
    pub fn new(stream: TcpStream, peer_addr: SocketAddr) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);

        Connection {
            reader: BufReader::new(read_half).lines(),
            writer: BufWriter::new(write_half),
            peer_addr,
        }
    }

    /// Open an outgoing connection
    pub async fn connect(addr: &str) -> io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let peer_addr = stream.peer_addr()?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream, peer_addr))
    }

    /// Get the peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Next line with the trailing newline removed; `None` on EOF.
    ///
    /// Cancel safe, so it can sit in a `select!` next to timers and other links.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        self.reader.next_line().await
    }

    /// Write one message as a JSON line
    pub async fn send(&mut self, msg: &ControlMessage) -> io::Result<()> {
        let json_str = serde_json::to_string(msg)?;
        self.writer.write_all(json_str.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Flush and close the write side
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.writer.flush().await?;
        self.writer.shutdown().await
    }
}

/// Parse one received line. Blank lines (keep-alives) give `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ControlMessage>, serde_json::Error> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed).map(Some)
}
