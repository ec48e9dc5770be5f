//! Session configuration options.
//!
//! # Example
//!
//! ```ignore
//! use ws_session_adapter::SessionOptions;
//!
//! let options = SessionOptions::new()
//!     .with_receive_buffer_capacity(1024)
//!     .with_close_on_send_complete(false);
//!
//! let options = SessionOptions::from_json(r#"{"receive_buffer_capacity": 1024}"#)?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Receive buffer size used when the transport has no inbound flow control.
pub const DEFAULT_RECEIVE_BUFFER_CAPACITY: usize = 8192;

// ============================================================================
// SessionOptions
// ============================================================================

/// Tunables for a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Maximum inbound messages queued for transports that cannot suspend
    /// receiving. Exceeding it fails the inbound stream.
    pub receive_buffer_capacity: usize,

    /// Close the connection with a normal status once the outbound stream
    /// has been fully written. A failed outbound stream always closes with a
    /// server error and resolves the completion signal either way.
    pub close_on_send_complete: bool,
}

// ============================================================================
// Constructors
// ============================================================================

impl SessionOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            receive_buffer_capacity: DEFAULT_RECEIVE_BUFFER_CAPACITY,
            close_on_send_complete: true,
        }
    }

    /// Parses options from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the input is not valid JSON
    /// - [`Error::Config`] if a value is out of range
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl SessionOptions {
    /// Sets the fallback receive buffer capacity.
    #[inline]
    #[must_use]
    pub fn with_receive_buffer_capacity(mut self, capacity: usize) -> Self {
        self.receive_buffer_capacity = capacity;
        self
    }

    /// Sets whether the session closes itself once sending completes.
    #[inline]
    #[must_use]
    pub fn with_close_on_send_complete(mut self, close: bool) -> Self {
        self.close_on_send_complete = close;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl SessionOptions {
    /// Checks that all values are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the receive buffer capacity is zero.
    pub fn validate(&self) -> Result<()> {
        if self.receive_buffer_capacity == 0 {
            return Err(Error::config("receive_buffer_capacity must be at least 1"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = SessionOptions::default();
        assert_eq!(options.receive_buffer_capacity, 8192);
        assert!(options.close_on_send_complete);
        assert_eq!(options, SessionOptions::new());
    }

    #[test]
    fn test_builder_chain() {
        let options = SessionOptions::new()
            .with_receive_buffer_capacity(16)
            .with_close_on_send_complete(false);

        assert_eq!(options.receive_buffer_capacity, 16);
        assert!(!options.close_on_send_complete);
    }

    #[test]
    fn test_from_json_partial() {
        let options =
            SessionOptions::from_json(r#"{"receive_buffer_capacity": 32}"#).expect("valid json");
        assert_eq!(options.receive_buffer_capacity, 32);
        assert!(options.close_on_send_complete);
    }

    #[test]
    fn test_from_json_rejects_zero_capacity() {
        let err = SessionOptions::from_json(r#"{"receive_buffer_capacity": 0}"#)
            .expect_err("zero capacity");
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_from_json_invalid() {
        let err = SessionOptions::from_json("not json").expect_err("invalid");
        assert!(matches!(err, Error::Json(_)));
    }
}
