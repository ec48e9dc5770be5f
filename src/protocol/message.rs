//! WebSocket message values.
//!
//! Messages are already decoded by the transport; framing is not handled here.

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

// ============================================================================
// MessageType
// ============================================================================

/// Kind of WebSocket message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// UTF-8 text message.
    Text,
    /// Binary message.
    Binary,
    /// Ping control frame.
    Ping,
    /// Pong control frame.
    Pong,
    /// Close control frame.
    Close,
}

impl MessageType {
    /// Returns `true` for ping, pong and close frames.
    #[inline]
    #[must_use]
    pub const fn is_control(self) -> bool {
        matches!(self, Self::Ping | Self::Pong | Self::Close)
    }
}

// ============================================================================
// Message
// ============================================================================

/// A WebSocket message: a type tag plus an immutable payload.
///
/// Cloning is cheap; the payload is reference counted.
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
    /// Message kind.
    message_type: MessageType,
    /// Message payload.
    payload: Bytes,
}

impl Message {
    /// Creates a message from a type and payload.
    #[inline]
    #[must_use]
    pub fn new(message_type: MessageType, payload: impl Into<Bytes>) -> Self {
        Self {
            message_type,
            payload: payload.into(),
        }
    }

    /// Creates a text message.
    #[inline]
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(MessageType::Text, Bytes::from(text.into()))
    }

    /// Creates a binary message.
    #[inline]
    #[must_use]
    pub fn binary(payload: impl Into<Bytes>) -> Self {
        Self::new(MessageType::Binary, payload)
    }

    /// Creates a ping message.
    #[inline]
    #[must_use]
    pub fn ping(payload: impl Into<Bytes>) -> Self {
        Self::new(MessageType::Ping, payload)
    }

    /// Creates a pong message.
    #[inline]
    #[must_use]
    pub fn pong(payload: impl Into<Bytes>) -> Self {
        Self::new(MessageType::Pong, payload)
    }

    /// Returns the message type.
    #[inline]
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// Returns the payload bytes.
    #[inline]
    #[must_use]
    pub const fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Consumes the message, returning its payload.
    #[inline]
    #[must_use]
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Decodes the payload as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn payload_as_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }

    /// Returns the payload length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns `true` if the payload has no bytes.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("type", &self.message_type)
            .field("len", &self.payload.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_message() {
        let message = Message::text("hello");
        assert_eq!(message.message_type(), MessageType::Text);
        assert_eq!(message.payload_as_text(), "hello");
        assert_eq!(message.len(), 5);
    }

    #[test]
    fn test_empty_ping() {
        let message = Message::ping(Bytes::new());
        assert!(message.is_empty());
        assert!(message.message_type().is_control());
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let message = Message::binary(vec![0xff, b'a']);
        assert_eq!(message.payload_as_text(), "\u{fffd}a");
    }

    #[test]
    fn test_debug_hides_payload() {
        let message = Message::text("secret");
        let debug = format!("{message:?}");
        assert!(debug.contains("len: 6"));
        assert!(!debug.contains("secret"));
    }
}
