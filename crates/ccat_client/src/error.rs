//! Client error types shared by the REST services and the chat session.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Client error type.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization of a REST body failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server answered with a status above 399.
    #[error("code: {status} - msg: {message} - {raw}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Canonical reason for the status.
        message: String,
        /// Raw response body.
        raw: String,
    },

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The chat socket could not be opened.
    #[error("chat connection failed: {0}")]
    Connect(#[source] tungstenite::Error),

    /// Reading a frame from the chat socket failed.
    #[error("chat read failed: {0}")]
    Read(#[source] tungstenite::Error),

    /// The peer closed the chat socket.
    #[error("chat connection closed by peer")]
    PeerClosed,

    /// An inbound frame was not `{"content": <string>}`.
    #[error("chat decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// Writing a frame (message or close) to the chat socket failed.
    #[error("chat write failed: {0}")]
    Write(#[source] tungstenite::Error),

    /// Nobody is draining inbound messages anymore.
    #[error("chat inbound receiver dropped")]
    InboundClosed,
}

impl Error {
    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Api { status: 404, .. })
    }

    /// Check if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Api { status: 401 | 403, .. })
    }

    /// Check if this is a server error.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Api { status, .. } if *status >= 500)
    }

    /// Check if an inbound chat frame could not be decoded.
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode(_))
    }

    /// Check if this error ended a chat session (as opposed to a REST call).
    pub fn is_chat(&self) -> bool {
        matches!(
            self,
            Error::Connect(_)
                | Error::Read(_)
                | Error::PeerClosed
                | Error::Decode(_)
                | Error::Write(_)
                | Error::InboundClosed
        )
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
