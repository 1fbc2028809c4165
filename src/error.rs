use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The pairing string could not be parsed into a session.
    InvalidUri,
    /// Malformed inbound payload, or required params missing.
    BadJsonRpcRequest,
    /// The peer answered one of our requests with a JSON-RPC error object.
    JsonRpc { code: i64, message: String },
    /// Approve or reject was called without a pending handshake.
    SessionInvalid,
    /// No `wc_sessionRequest` arrived within the window, or a send
    /// watchdog expired.
    SessionRequestTimeout,
    /// Envelope integrity check failed.
    HmacMismatch,
    /// AES or padding failure while opening an envelope.
    DecryptionFailed,
    /// The peer closed with code 4022 or cancelled unexpectedly.
    Security(String),
    /// Alias retained for wire compatibility with older relays.
    TooManyMessages(String),
    /// Surfaced from the WebSocket.
    Transport(String),
    Unknown,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidUri => write!(f, "invalid pairing uri"),
            Error::BadJsonRpcRequest => write!(f, "bad json-rpc request"),
            Error::JsonRpc { code, message } => {
                write!(f, "json-rpc error {code}: {message}")
            }
            Error::SessionInvalid => write!(f, "no pending session handshake"),
            Error::SessionRequestTimeout => write!(f, "session request timed out"),
            Error::HmacMismatch => write!(f, "envelope hmac mismatch"),
            Error::DecryptionFailed => write!(f, "envelope decryption failed"),
            Error::Security(desc) => write!(f, "security: {desc}"),
            Error::TooManyMessages(desc) => write!(f, "too many messages: {desc}"),
            Error::Transport(desc) => write!(f, "transport: {desc}"),
            Error::Unknown => write!(f, "unknown error"),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(_: serde_json::Error) -> Self {
        Error::BadJsonRpcRequest
    }
}

impl From<hex::FromHexError> for Error {
    fn from(_: hex::FromHexError) -> Self {
        Error::DecryptionFailed
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::Transport(e.to_string())
    }
}
