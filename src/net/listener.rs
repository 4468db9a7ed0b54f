// TCP listener and relay server
// Accepts one downstream client at a time and runs its session to completion

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use std::net::SocketAddr;
use std::io;
use tracing::{error, info};

use super::connection::Connection;
use super::relay::{RelayOptions, RelaySession, SessionEnd};

/// Relay server that serves downstream clients one after another
pub struct RelayServer {
    addr: SocketAddr,
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl RelayServer {
    /// Bind `addr` and start waiting for a client
    pub async fn start(addr: SocketAddr, options: RelayOptions) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        tokio::spawn(async move {
            info!("Waiting for connection...");
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, peer_addr)) => {
                                info!("Client connected from {}", peer_addr);
                                let _ = stream.set_nodelay(true);
                                let connection = Connection::new(stream, peer_addr);
                                let mut session = RelaySession::start(connection, options.clone()).await;
                                let end = session.run(&listener, &mut shutdown_rx).await;
                                info!("Stopping serial readers");
                                session.close().await;
                                if end == SessionEnd::Shutdown {
                                    break;
                                }
                                info!("Waiting for new client...");
                            }
                            Err(e) => error!("Accept error: {}", e),
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
            info!("Relay server on {} stopped", local_addr);
        });

        Ok(RelayServer {
            addr: local_addr,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Get the address the server is listening on
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shutdown the server, ending any active session
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
    }
}

impl Drop for RelayServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.try_send(());
        }
    }
}
