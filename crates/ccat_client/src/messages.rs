//! Chat WebSocket message types. Client ↔ server JSON.

use serde::{Deserialize, Serialize};

/// Client → server: one line typed by the user.
#[derive(Debug, Clone, Serialize)]
pub struct UserMessage<'a> {
    pub text: &'a str,
}

impl<'a> UserMessage<'a> {
    /// Wrap `line`, trimming surrounding whitespace.
    pub fn new(line: &'a str) -> Self {
        Self { text: line.trim() }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Server → client: a reply. Fields other than `content` are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerMessage {
    pub content: String,
}

impl ServerMessage {
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}
