//! TCP Server
//!
//! Binds the listener with the configured backlog and spawns one task per
//! accepted connection. All shared state lives in [`ServerState`], which is
//! cloned into every connection task instead of living in globals.
//!
//! # Responsibilities
//! - Resolve and bind the configured address
//! - Accept connections and hand them to the connection layer
//! - Keep accepting after transient accept errors
//! - Stop accepting when the shutdown future completes

use crate::codec::{CodecError, CodecPool};
use crate::config::ServerConfig;
use crate::connection::{handle_connection, ConnectionLimiter, ConnectionStats};
use crate::protocol::FrameLimits;
use crate::storage::DataStore;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::{lookup_host, TcpListener, TcpSocket};
use tracing::{error, info};

/// Errors raised while starting the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The host name could not be resolved
    #[error("failed to resolve {address}: {source}")]
    Resolve {
        address: String,
        #[source]
        source: io::Error,
    },

    /// The host name resolved to nothing
    #[error("no addresses found for {0}")]
    NoAddress(String),

    /// The socket could not be bound or put into listening mode
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// The codec pool could not be started
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// State shared by every connection task.
///
/// Cheap to clone; clones share the same store, pool, limiter and counters.
#[derive(Debug, Clone)]
pub struct ServerState {
    pub store: Arc<DataStore>,
    pub codec: CodecPool,
    pub limiter: ConnectionLimiter,
    pub stats: Arc<ConnectionStats>,
    pub limits: FrameLimits,
}

impl ServerState {
    /// Builds fresh state and starts the codec workers.
    pub fn new(config: &ServerConfig) -> Result<Self, ServerError> {
        Ok(Self {
            store: Arc::new(DataStore::new()),
            codec: CodecPool::new(config.codec_workers, config.codec_queue)?,
            limiter: ConnectionLimiter::new(config.max_connections),
            stats: Arc::new(ConnectionStats::new()),
            limits: config.frame_limits(),
        })
    }
}

/// A bound server, ready to accept connections.
pub struct Server {
    listener: TcpListener,
    state: ServerState,
}

impl Server {
    /// Resolves the configured address, binds it and starts listening.
    pub async fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        let address = config.bind_address();
        let addr = lookup_host(&address)
            .await
            .map_err(|source| ServerError::Resolve {
                address: address.clone(),
                source,
            })?
            .next()
            .ok_or_else(|| ServerError::NoAddress(address.clone()))?;

        let listener = listen(addr, config.backlog).map_err(|source| ServerError::Bind {
            address: addr,
            source,
        })?;
        let state = ServerState::new(config)?;

        info!(
            address = %addr,
            backlog = config.backlog,
            max_connections = state.limiter.capacity(),
            codec_workers = state.codec.workers(),
            "Listener bound"
        );

        Ok(Self { listener, state })
    }

    /// Get the local address this server is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared state, for inspecting the store and counters.
    pub fn state(&self) -> &ServerState {
        &self.state
    }

    /// Accepts connections until the process exits.
    pub async fn run(self) {
        self.run_until(std::future::pending::<()>()).await;
    }

    /// Accepts connections until `shutdown` completes.
    ///
    /// Connections already holding a permit keep running in their own tasks.
    /// Connections still waiting for a permit are dropped unanswered.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        tokio::spawn(handle_connection(stream, addr, self.state.clone()));
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                },
                _ = &mut shutdown => {
                    info!("Shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        self.state.limiter.close();
        info!(
            in_flight = self.state.limiter.in_flight(),
            "Connection limiter closed, waiting connections dropped"
        );
    }
}

/// Creates a listening socket with an explicit backlog.
fn listen(addr: SocketAddr, backlog: u32) -> io::Result<TcpListener> {
    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4()?,
        SocketAddr::V6(_) => TcpSocket::new_v6()?,
    };

    #[cfg(unix)]
    socket.set_reuseaddr(true)?;

    socket.bind(addr)?;
    socket.listen(backlog)
}
