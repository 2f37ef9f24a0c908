//! `KnightlinkServer` builder and accept loop.
//!
//! This is the entry point for running a Knightlink server. It ties the
//! layers together: transport → gateway → matchmaker.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use knightlink_match::{MatchmakerConfig, MatchmakerHandle, spawn_matchmaker};
use knightlink_transport::{
    DEFAULT_HANDSHAKE_TIMEOUT, Incoming, Transport, WebSocketTransport,
};

use crate::KnightlinkError;
use crate::handler::handle_connection;

/// Builder for configuring and starting a Knightlink server.
///
/// # Example
///
/// ```rust,ignore
/// let server = KnightlinkServer::builder()
///     .bind("0.0.0.0:3000")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct KnightlinkServerBuilder {
    bind_addr: String,
    handshake_timeout: Duration,
    matchmaker_config: MatchmakerConfig,
}

impl KnightlinkServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            matchmaker_config: MatchmakerConfig::default(),
        }
    }

    /// Sets the address to bind the server to. Port `0` picks a free port.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Time a client gets to complete the WebSocket upgrade before its
    /// socket is dropped.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn matchmaker_config(mut self, config: MatchmakerConfig) -> Self {
        self.matchmaker_config = config;
        self
    }

    /// Binds the listener and starts the matchmaker.
    pub async fn build(self) -> Result<KnightlinkServer, KnightlinkError> {
        let transport = WebSocketTransport::bind(&self.bind_addr)
            .await?
            .with_handshake_timeout(self.handshake_timeout);
        let matchmaker = spawn_matchmaker(self.matchmaker_config);

        Ok(KnightlinkServer {
            transport,
            matchmaker,
        })
    }
}

impl Default for KnightlinkServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Knightlink server.
///
/// Call [`run`](Self::run) or [`run_until`](Self::run_until) to start
/// accepting connections.
pub struct KnightlinkServer {
    transport: WebSocketTransport,
    matchmaker: MatchmakerHandle,
}

impl KnightlinkServer {
    /// Creates a new builder.
    pub fn builder() -> KnightlinkServerBuilder {
        KnightlinkServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle to the matchmaker, e.g. for [`stats`](MatchmakerHandle::stats).
    pub fn matchmaker(&self) -> MatchmakerHandle {
        self.matchmaker.clone()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), KnightlinkError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes.
    ///
    /// On shutdown the listener stops accepting and the matchmaker is
    /// stopped, which closes every open connection.
    ///
    /// # Errors
    /// Only errors that affect the whole server end the loop. A failed
    /// accept is logged and skipped. Handshakes run in the per-connection
    /// task, so a client that never upgrades only costs its own task.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), KnightlinkError> {
        tracing::info!(addr = ?self.local_addr().ok(), "Knightlink server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(incoming) => {
                        let id = incoming.id();
                        let matchmaker = self.matchmaker.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(incoming, matchmaker).await {
                                tracing::debug!(%id, error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) if e.is_per_connection() => {
                        tracing::debug!(error = %e, "accept failed");
                    }
                    Err(e) => return Err(e.into()),
                },
            }
        }

        self.transport.shutdown().await?;
        if let Err(e) = self.matchmaker.shutdown().await {
            tracing::warn!(error = %e, "matchmaker already stopped");
        }
        tracing::info!("Knightlink server stopped");
        Ok(())
    }
}
