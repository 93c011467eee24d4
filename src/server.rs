//! FTP listener and acceptor.
//!
//! Generalizes the teacher's `Listener`/`run()` (`server.rs`) from a
//! Redis-command executor to a pluggable-storage FTP session host: the
//! accept loop, exponential backoff, and graceful-shutdown wiring are kept
//! as written; `MAX_CONNECTIONS`/the connection-limiting `Semaphore` has no
//! counterpart here (no per-command dominant resource cost the way Redis's
//! in-memory keyspace has), so it's dropped — see DESIGN.md.
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::ServerSettings;
use crate::connection::ControlConnection;
use crate::error::Result;
use crate::session::Session;
use crate::shutdown::Shutdown;
use crate::storage::StorageBackend;

/// Listener state shared across the accept loop's lifetime.
struct Listener {
    listener: TcpListener,
    settings: Arc<ServerSettings>,
    storage: Arc<dyn StorageBackend>,
    notify_shutdown: broadcast::Sender<()>,
    shutdown_complete_tx: mpsc::Sender<()>,
}

/// Runs the FTP server until `shutdown` completes, then drains in-flight
/// connections before returning.
pub async fn run(listener: TcpListener, settings: Arc<ServerSettings>, storage: Arc<dyn StorageBackend>, shutdown: impl Future) {
    let (notify_shutdown, _) = broadcast::channel(1);
    let (shutdown_complete_tx, mut shutdown_complete_rx) = mpsc::channel(1);

    let mut server = Listener {
        listener,
        settings,
        storage,
        notify_shutdown,
        shutdown_complete_tx,
    };

    tokio::select! {
        res = server.run() => {
            if let Err(err) = res {
                error!(cause = %err, "failed to accept");
            }
        }
        _ = shutdown => {
            info!("shutting down");
        }
    }

    let Listener {
        shutdown_complete_tx,
        notify_shutdown,
        ..
    } = server;

    drop(notify_shutdown);
    drop(shutdown_complete_tx);

    let _ = shutdown_complete_rx.recv().await;
}

impl Listener {
    /// Accepts inbound connections, spawning a session task per connection.
    async fn run(&mut self) -> Result<()> {
        info!(addr = %self.listener.local_addr()?, "accepting inbound connections");

        loop {
            let socket = self.accept().await?;
            let remote_addr = socket.peer_addr().unwrap_or_else(|_| self.listener.local_addr().unwrap());
            let (read_half, write_half) = socket.into_split();

            let id = Uuid::new_v4().simple().to_string();
            let session = Session::new(id.clone(), ControlConnection::new(write_half), remote_addr, self.settings.clone(), self.storage.clone());
            let shutdown = Shutdown::new(self.notify_shutdown.subscribe());
            let shutdown_complete = self.shutdown_complete_tx.clone();

            debug!(%id, %remote_addr, "accepted connection");
            tokio::spawn(async move {
                session.serve(read_half, shutdown).await;
                drop(shutdown_complete);
            });
        }
    }

    /// Accepts one connection, retrying transient errors with exponential
    /// backoff (1s, 2s, 4s, ... giving up after the 6th failure).
    async fn accept(&mut self) -> Result<TcpStream> {
        let mut backoff = 1;

        loop {
            match self.listener.accept().await {
                Ok((socket, _)) => return Ok(socket),
                Err(err) => {
                    if backoff > 64 {
                        error!(%err, "failed to accept inbound connection too many times");
                        return Err(err.into());
                    }
                    warn!(%err, "got error accepting inbound connection, trying again in {backoff} seconds");
                }
            }

            tokio::time::sleep(Duration::from_secs(backoff)).await;
            backoff *= 2;
        }
    }
}
