//! TCP server for Voung lock controller boards.
//!
//! Boards dial in, register under their device identifier and then send
//! heartbeats and lock status changes. Operators reach a board through the
//! [`CommandGateway`] (raw frames) or the [`LockOperator`] (validated,
//! logged actions).
//!
//! # Architecture
//!
//! ```text
//! Board 01 ┐                      ┌──> ConnectionSession ──> CommandDispatcher ──> BoardStore
//!          │                      │           │
//! Board 02 ├──> LockServer accept ┼──> ...    └── registers in ──> DeviceRegistry
//!          │                      │                                     ^
//! Board NN ┘                      └──> ...                              │
//!                                              LockOperator ──> CommandGateway
//! ```
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use voung_network::{LockServer, ServerConfig};
//! use voung_storage::{Database, DatabaseConfig, SqliteBoardStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(DatabaseConfig::new("voung.db")).await?;
//! let store = Arc::new(SqliteBoardStore::new(db.pool().clone()));
//!
//! let server = LockServer::bind(ServerConfig::default(), store).await?;
//! let gateway = server.gateway();
//!
//! server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//! # drop(gateway);
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use voung_core::constants::DEFAULT_PORT;
use voung_storage::BoardStore;

use crate::dispatcher::CommandDispatcher;
use crate::gateway::CommandGateway;
use crate::operator::LockOperator;
use crate::registry::DeviceRegistry;
use crate::session::{ConnectionSession, SessionHandle};

/// Pause after a failed accept so a persistent error (e.g. EMFILE) does
/// not spin the loop.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Configuration for the lock server
///
/// # Example
///
/// ```
/// use voung_network::ServerConfig;
///
/// let config = ServerConfig {
///     bind_addr: "127.0.0.1:8585".parse().unwrap(),
/// };
/// assert_eq!(ServerConfig::default().bind_addr.port(), 8585);
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
        }
    }
}

/// Errors that can occur while running the server
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to address
    #[error("Failed to bind to {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// I/O error on the listener
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Accepts board connections and runs one session task per socket.
pub struct LockServer<S> {
    listener: TcpListener,
    store: Arc<S>,
    registry: Arc<DeviceRegistry>,
    dispatcher: Arc<CommandDispatcher<S>>,
    shutdown: CancellationToken,
}

impl<S: BoardStore> LockServer<S> {
    /// Bind the listener.
    ///
    /// # Errors
    /// Returns [`ServerError::BindFailed`] if the address is unavailable.
    pub async fn bind(config: ServerConfig, store: Arc<S>) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|source| ServerError::BindFailed {
                addr: config.bind_addr,
                source,
            })?;

        let registry = Arc::new(DeviceRegistry::new());
        let dispatcher = Arc::new(CommandDispatcher::new(store.clone(), registry.clone()));

        info!(addr = %listener.local_addr()?, "Lock server listening");

        Ok(Self {
            listener,
            store,
            registry,
            dispatcher,
            shutdown: CancellationToken::new(),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn registry(&self) -> Arc<DeviceRegistry> {
        self.registry.clone()
    }

    pub fn gateway(&self) -> CommandGateway {
        CommandGateway::new(self.registry.clone())
    }

    /// Operator facade sending with the given per-command timeout.
    pub fn operator(&self, timeout: Duration) -> LockOperator<S> {
        LockOperator::new(self.store.clone(), self.gateway(), timeout)
    }

    /// Serve until the process ends.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` completes, then close every session.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.spawn_session(stream, peer),
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
            }
        }

        let registered = self.registry.close_all();
        self.shutdown.cancel();
        info!(registered, "Lock server stopped");
        Ok(())
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            warn!(peer = %peer, error = %e, "Failed to set TCP_NODELAY");
        }

        let (reader, writer) = stream.into_split();
        let handle = Arc::new(SessionHandle::new(
            peer,
            Box::new(writer),
            self.shutdown.child_token(),
        ));
        debug!(peer = %peer, session = %handle.id(), "Connection accepted");

        let session = ConnectionSession::new(reader, handle, self.dispatcher.clone());
        // A panicking session only ends its own task.
        tokio::spawn(session.run());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voung_storage::InMemoryBoardStore;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:8585");
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
        };
        let server = LockServer::bind(config, Arc::new(InMemoryBoardStore::new()))
            .await
            .unwrap();
        assert_ne!(server.local_addr().unwrap().port(), 0);
        assert!(server.registry().is_empty());
    }

    #[tokio::test]
    async fn test_bind_conflict() {
        let first = LockServer::bind(
            ServerConfig {
                bind_addr: "127.0.0.1:0".parse().unwrap(),
            },
            Arc::new(InMemoryBoardStore::new()),
        )
        .await
        .unwrap();

        let taken = first.local_addr().unwrap();
        let second = LockServer::bind(
            ServerConfig { bind_addr: taken },
            Arc::new(InMemoryBoardStore::new()),
        )
        .await;
        assert!(matches!(second, Err(ServerError::BindFailed { .. })));
    }

    #[tokio::test]
    async fn test_run_until_stops() {
        let server = LockServer::bind(
            ServerConfig {
                bind_addr: "127.0.0.1:0".parse().unwrap(),
            },
            Arc::new(InMemoryBoardStore::new()),
        )
        .await
        .unwrap();

        server.run_until(async {}).await.unwrap();
    }
}
