//! Wire frames for the chat WebSocket.
//!
//! Two frame families share the connection: `connection` lifecycle frames
//! and `chat` message frames. Frames are JSON objects tagged by `type`.

use crate::SocketResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a chat message, relative to this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// This client.
    #[serde(rename = "self")]
    Own,
    /// The other side of the conversation.
    Counterpart,
}

/// Server-reported connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// A chat message frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatFrame {
    /// Client-generated correlation id; also the dedup key.
    pub message_id: String,
    /// Message body.
    pub message: String,
    /// Message author.
    pub sender: Sender,
    /// Server timestamp, when provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// A frame on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// Connection lifecycle frame.
    Connection { status: ConnectionStatus },
    /// Chat message frame.
    Chat(ChatFrame),
}

impl Frame {
    /// Build an outgoing chat frame; returns the frame and its generated id.
    pub fn outgoing_chat(body: &str) -> (Self, String) {
        let message_id = Uuid::new_v4().to_string();
        let frame = Frame::Chat(ChatFrame {
            message_id: message_id.clone(),
            message: body.to_string(),
            sender: Sender::Own,
            timestamp: None,
        });
        (frame, message_id)
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> SocketResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> SocketResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
