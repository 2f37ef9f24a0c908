/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listening socket could not be bound.
    #[error("bind failed: {0}")]
    Bind(#[source] std::io::Error),

    /// Accepting a TCP connection failed.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    /// The WebSocket upgrade handshake failed.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The client did not finish the upgrade in time.
    #[error("handshake timed out after {0:?}")]
    HandshakeTimeout(std::time::Duration),

    /// Writing a frame failed. The peer is most likely gone.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Reading a frame failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),
}

impl TransportError {
    /// Returns `true` for errors scoped to a single connection.
    ///
    /// The accept loop keeps running after these; only `Bind` is fatal.
    pub fn is_per_connection(&self) -> bool {
        !matches!(self, Self::Bind(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_per_connection_bind_is_fatal() {
        let err = TransportError::Bind(std::io::Error::new(
            std::io::ErrorKind::AddrInUse,
            "in use",
        ));
        assert!(!err.is_per_connection());
    }

    #[test]
    fn test_is_per_connection_handshake_is_contained() {
        let err = TransportError::Handshake("bad upgrade".into());
        assert!(err.is_per_connection());
        assert!(err.to_string().contains("bad upgrade"));
    }

    #[test]
    fn test_is_per_connection_handshake_timeout_is_contained() {
        let err = TransportError::HandshakeTimeout(std::time::Duration::from_secs(10));
        assert!(err.is_per_connection());
        assert_eq!(err.to_string(), "handshake timed out after 10s");
    }
}
