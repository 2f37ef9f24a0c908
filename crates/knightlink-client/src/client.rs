//! The WebSocket driver.

use futures_util::{SinkExt, StreamExt};
use knightlink_protocol::{ClientIdentity, Message, decode, encode};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::{
    ClientError, Decision, Intent, LinkStatus, ReconnectController,
    ReconnectPolicy, generate_identity,
};

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Settings for a [`GameClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base server URL without a path, e.g. `ws://127.0.0.1:3000`.
    pub server_url: String,
    pub intent: Intent,
    /// Sent as `cid` on every connection, reconnects included.
    pub identity: ClientIdentity,
    pub policy: ReconnectPolicy,
}

impl ClientConfig {
    /// A config with a freshly generated identity and the default policy.
    pub fn new(server_url: impl Into<String>, intent: Intent) -> Self {
        Self {
            server_url: server_url.into(),
            intent,
            identity: generate_identity(),
            policy: ReconnectPolicy::default(),
        }
    }

    pub fn with_identity(mut self, identity: ClientIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// How a single connection ended.
enum SessionEnd {
    /// The outgoing channel closed or the consumer went away.
    UserExit,
    /// The socket failed or the server closed it.
    Lost(String),
}

/// A reconnecting client for one intent.
///
/// ```no_run
/// # use knightlink_client::{ClientConfig, GameClient, Intent};
/// # use tokio::sync::mpsc;
/// # async fn demo() -> Result<(), knightlink_client::ClientError> {
/// let client = GameClient::new(ClientConfig::new("ws://127.0.0.1:3000", Intent::Random));
/// let (to_server, outgoing) = mpsc::channel(16);
/// let (incoming, mut from_server) = mpsc::unbounded_channel();
///
/// let run = tokio::spawn(client.run(outgoing, incoming));
/// // ... send on `to_server`, read from `from_server` ...
/// drop(to_server); // user exit
/// # let _ = run.await;
/// # Ok(())
/// # }
/// ```
pub struct GameClient {
    config: ClientConfig,
    controller: ReconnectController,
}

impl GameClient {
    pub fn new(config: ClientConfig) -> Self {
        let controller = ReconnectController::new(config.policy.clone());
        Self { config, controller }
    }

    /// Subscribes to [`LinkStatus`] changes.
    pub fn status(&self) -> watch::Receiver<LinkStatus> {
        self.controller.subscribe()
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.config.identity
    }

    /// Connects and relays until the user exits or the retries run out.
    ///
    /// Messages from `outgoing` are sent to the server; decoded server
    /// messages are delivered to `incoming`. Closing `outgoing` (or dropping
    /// the `incoming` receiver) is a user exit and returns `Ok(())`.
    /// Frames the user sends while the link is down wait in `outgoing`.
    ///
    /// # Errors
    /// [`ClientError::InvalidUrl`] if the server URL does not parse, and
    /// [`ClientError::ConnectionLost`] once every retry has failed.
    pub async fn run(
        mut self,
        mut outgoing: mpsc::Receiver<Message>,
        incoming: mpsc::UnboundedSender<Message>,
    ) -> Result<(), ClientError> {
        let url = self
            .config
            .intent
            .url(&self.config.server_url, &self.config.identity)?;

        loop {
            self.controller.on_connecting();
            tracing::info!(%url, intent = %self.config.intent, "connecting");

            let ended = match tokio_tungstenite::connect_async(url.as_str()).await {
                Ok((ws, _)) => {
                    self.controller.on_connected();
                    tracing::info!(identity = %self.config.identity, "connected");
                    run_session(ws, &mut outgoing, &incoming).await
                }
                Err(e) => SessionEnd::Lost(e.to_string()),
            };

            let reason = match ended {
                SessionEnd::UserExit => {
                    self.controller.on_user_exit();
                    tracing::info!("session closed by user");
                    return Ok(());
                }
                SessionEnd::Lost(reason) => reason,
            };

            match self.controller.on_link_lost() {
                Decision::Retry { attempt, delay } => {
                    tracing::warn!(
                        %reason,
                        attempt,
                        max = self.config.policy.max_retries,
                        ?delay,
                        "link lost, reconnecting"
                    );
                    tokio::time::sleep(delay).await;
                }
                Decision::GiveUp => {
                    let attempts = self.config.policy.max_retries;
                    tracing::error!(%reason, attempts, "link lost, giving up");
                    return Err(ClientError::ConnectionLost { attempts, reason });
                }
            }
        }
    }
}

/// Pumps frames over one established socket until it ends.
async fn run_session(
    ws: WsStream,
    outgoing: &mut mpsc::Receiver<Message>,
    incoming: &mpsc::UnboundedSender<Message>,
) -> SessionEnd {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            next = outgoing.recv() => {
                let Some(message) = next else {
                    let _ = sink.close().await;
                    return SessionEnd::UserExit;
                };
                let frame = match encode(&message) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to encode outgoing message");
                        continue;
                    }
                };
                if let Err(e) = sink.send(WsMessage::Text(frame.into())).await {
                    return SessionEnd::Lost(e.to_string());
                }
            }
            frame = stream.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => match decode(text.as_str()) {
                    Ok(message) => {
                        if incoming.send(message).is_err() {
                            let _ = sink.close().await;
                            return SessionEnd::UserExit;
                        }
                    }
                    Err(e) => tracing::debug!(error = %e, "ignoring malformed frame"),
                },
                Some(Ok(WsMessage::Close(_))) | None => {
                    return SessionEnd::Lost("server closed the connection".to_owned());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return SessionEnd::Lost(e.to_string()),
            },
        }
    }
}
