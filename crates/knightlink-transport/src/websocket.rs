//! `tokio-tungstenite` backed [`Transport`].

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::{Connection, ConnectionId, Incoming, Transport, TransportError};

type Socket = WebSocketStream<TcpStream>;

/// How long a client may take to finish the upgrade after connecting.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// TCP listener whose accepted streams are upgraded to WebSockets.
pub struct WebSocketTransport {
    listener: TcpListener,
    handshake_timeout: Duration,
}

impl WebSocketTransport {
    /// Starts listening on `addr`. With port `0` the OS picks one; read it
    /// back through [`local_addr`](Self::local_addr).
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await.map_err(TransportError::Bind)?;
        tracing::info!(addr, "listening for WebSocket clients");
        Ok(Self {
            listener,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        })
    }

    /// Bounds the upgrade of every client accepted from now on.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Incoming = IncomingWebSocket;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<IncomingWebSocket, TransportError> {
        let (tcp, peer_addr) = self.listener.accept().await.map_err(TransportError::Accept)?;
        let id = ConnectionId::next();
        tracing::debug!(%id, %peer_addr, "TCP client accepted");

        Ok(IncomingWebSocket {
            id,
            tcp,
            peer_addr,
            timeout: self.handshake_timeout,
        })
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        // The listener closes when the transport is dropped.
        Ok(())
    }
}

/// A TCP client that has not sent its upgrade request yet.
pub struct IncomingWebSocket {
    id: ConnectionId,
    tcp: TcpStream,
    peer_addr: SocketAddr,
    timeout: Duration,
}

impl IncomingWebSocket {
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

impl Incoming for IncomingWebSocket {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn upgrade(self) -> Result<WebSocketConnection, TransportError> {
        let Self {
            id,
            tcp,
            peer_addr,
            timeout,
        } = self;

        // The request is only reachable from the handshake callback.
        let mut target = String::new();
        let handshake = tokio_tungstenite::accept_hdr_async(
            tcp,
            |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
                target = request.uri().to_string();
                Ok(response)
            },
        );
        let socket = tokio::time::timeout(timeout, handshake)
            .await
            .map_err(|_| TransportError::HandshakeTimeout(timeout))?
            .map_err(|e| TransportError::Handshake(e.to_string()))?;

        tracing::debug!(%id, %peer_addr, %target, "WebSocket upgraded");

        let (writer, reader) = socket.split();
        Ok(WebSocketConnection {
            id,
            target,
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
        })
    }
}

/// An upgraded client socket.
///
/// Reading and writing are locked separately, so a frame pushed by a relay
/// never queues behind this client's own pending read.
pub struct WebSocketConnection {
    id: ConnectionId,
    target: String,
    writer: Mutex<SplitSink<Socket, Message>>,
    reader: Mutex<SplitStream<Socket>>,
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, frame: &str) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        writer
            .send(Message::Text(frame.to_owned().into()))
            .await
            .map_err(write_failed)
    }

    async fn recv(&self) -> Result<Option<String>, TransportError> {
        let mut reader = self.reader.lock().await;
        while let Some(next) = reader.next().await {
            match next.map_err(read_failed)? {
                Message::Text(text) => return Ok(Some(text.as_str().to_owned())),
                // Some clients send JSON as binary; accept it if it is UTF-8.
                Message::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Ok(Some(text)),
                    Err(_) => tracing::debug!(id = %self.id, "skipping non-UTF-8 binary frame"),
                },
                Message::Close(_) => return Ok(None),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
        Ok(None)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.writer.lock().await.close().await.map_err(write_failed)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn request_target(&self) -> &str {
        &self.target
    }
}

fn write_failed(e: WsError) -> TransportError {
    TransportError::SendFailed(io::Error::new(io::ErrorKind::BrokenPipe, e))
}

fn read_failed(e: WsError) -> TransportError {
    TransportError::ReceiveFailed(io::Error::new(io::ErrorKind::ConnectionReset, e))
}
