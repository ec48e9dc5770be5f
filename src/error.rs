//! Error types for the WebSocket session adapter.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use futures_util::StreamExt;
//! use ws_session_adapter::{Error, Result};
//!
//! async fn drain(session: &Session<MyTransport>) -> Result<()> {
//!     let mut inbound = session.receive();
//!     while let Some(message) = inbound.next().await {
//!         let message = message?;
//!         println!("{}", message.payload_as_text());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Protocol violation | [`Error::IllegalState`], [`Error::WriteRejected`] |
//! | Transport | [`Error::Transport`], [`Error::ConnectionClosed`], [`Error::Io`], [`Error::WebSocket`] |
//! | Overflow | [`Error::ReceiveOverflow`] |
//! | Configuration | [`Error::Config`], [`Error::Json`] |
//!
//! Errors are [`Clone`] so the same failure can terminate both the inbound
//! and the outbound sequence of a session.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;
use std::sync::Arc;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug, Clone)]
pub enum Error {
    // ========================================================================
    // Protocol Violations
    // ========================================================================
    /// Operation not allowed in the current state.
    ///
    /// Returned when `send()` is called twice on the same session, or when a
    /// consumer reads past a terminated inbound sequence.
    #[error("Illegal state: {message}")]
    IllegalState {
        /// Description of the violated rule.
        message: String,
    },

    /// Transport refused a write while reporting itself ready.
    ///
    /// Indicates the transport did not maintain the readiness flag correctly.
    #[error("Transport rejected a write while ready to send")]
    WriteRejected,

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Failure reported by the native transport.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// Connection is closed.
    ///
    /// Returned when an operation needs an open connection.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Overflow Errors
    // ========================================================================
    /// Inbound messages arrived faster than the consumer pulled them.
    ///
    /// Only raised for transports that cannot suspend receiving.
    #[error("Receive buffer overflow: more than {capacity} pending messages")]
    ReceiveOverflow {
        /// Capacity of the fallback receive buffer.
        capacity: usize,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when session options or builder inputs are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(Arc<IoError>),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(Arc<serde_json::Error>),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(Arc<WsError>),
}

// ============================================================================
// Conversions
// ============================================================================

impl From<IoError> for Error {
    fn from(err: IoError) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(Arc::new(err))
    }
}

impl From<WsError> for Error {
    fn from(err: WsError) -> Self {
        Self::WebSocket(Arc::new(err))
    }
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates an illegal state error.
    #[inline]
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState {
            message: message.into(),
        }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a receive overflow error.
    #[inline]
    pub fn receive_overflow(capacity: usize) -> Self {
        Self::ReceiveOverflow { capacity }
    }

    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error is a local protocol violation.
    #[inline]
    #[must_use]
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::IllegalState { .. } | Self::WriteRejected)
    }

    /// Returns `true` if this error came from the transport.
    #[inline]
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::ConnectionClosed | Self::Io(_) | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this is a receive buffer overflow.
    #[inline]
    #[must_use]
    pub fn is_overflow(&self) -> bool {
        matches!(self, Self::ReceiveOverflow { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::transport("socket reset");
        assert_eq!(err.to_string(), "Transport error: socket reset");
    }

    #[test]
    fn test_illegal_state_display() {
        let err = Error::illegal_state("send() has already been called");
        assert_eq!(
            err.to_string(),
            "Illegal state: send() has already been called"
        );
    }

    #[test]
    fn test_overflow_display() {
        let err = Error::receive_overflow(8192);
        assert_eq!(
            err.to_string(),
            "Receive buffer overflow: more than 8192 pending messages"
        );
        assert!(err.is_overflow());
    }

    #[test]
    fn test_is_protocol_violation() {
        assert!(Error::illegal_state("x").is_protocol_violation());
        assert!(Error::WriteRejected.is_protocol_violation());
        assert!(!Error::transport("x").is_protocol_violation());
    }

    #[test]
    fn test_is_transport_error() {
        let io_err: Error = IoError::new(ErrorKind::BrokenPipe, "broken").into();

        assert!(io_err.is_transport_error());
        assert!(Error::ConnectionClosed.is_transport_error());
        assert!(!Error::config("x").is_transport_error());
    }

    #[test]
    fn test_from_io_error_is_cloneable() {
        let io_err = IoError::new(ErrorKind::NotFound, "gone");
        let err: Error = io_err.into();
        let copy = err.clone();

        assert!(matches!(copy, Error::Io(_)));
        assert_eq!(err.to_string(), copy.to_string());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
