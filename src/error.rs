#[derive(thiserror::Error, Debug, Clone)]
/// Error type
pub enum Error {
    /// Failure at the socket layer.  Fatal to the connection, not to the
    /// process.
    #[error("transport error: {0}")]
    Transport(String),
    /// The init/ack exchange did not complete.
    #[error("handshake failed: {0}")]
    Handshake(String),
    /// The server reported an error for a single subscription.  Terminal
    /// for that subscription only.
    #[error("subscription error: {0:?}")]
    Subscription(Vec<serde_json::Value>),
    /// The operation was attempted after `close()`.
    #[error("connection closed")]
    ConnectionClosed,
    /// Unexpected close frame
    #[error("got close frame. code: {0}, reason: {1}")]
    Close(u16, String),
    /// Decoding / parsing error
    #[error("message decode error, reason: {0}")]
    Decode(String),
    /// Serializing error
    #[error("couldn't serialize message, reason: {0}")]
    Serializing(String),
}
