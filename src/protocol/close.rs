//! WebSocket close status.
//!
//! Status codes follow RFC 6455 Section 7.4.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// CloseStatus
// ============================================================================

/// Code and optional reason describing why a connection ended.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CloseStatus {
    /// Close status code.
    code: u16,
    /// Optional human-readable reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

// ============================================================================
// Well-known Codes
// ============================================================================

impl CloseStatus {
    /// 1000: normal closure.
    pub const NORMAL: Self = Self::new(1000);

    /// 1001: endpoint going away (server shutdown, page navigation).
    pub const GOING_AWAY: Self = Self::new(1001);

    /// 1002: protocol error.
    pub const PROTOCOL_ERROR: Self = Self::new(1002);

    /// 1003: received a data type it cannot accept.
    pub const NOT_ACCEPTABLE: Self = Self::new(1003);

    /// 1005: no status code was present. Never sent on the wire.
    pub const NO_STATUS_CODE: Self = Self::new(1005);

    /// 1006: connection dropped without a close frame. Never sent on the wire.
    pub const NO_CLOSE_FRAME: Self = Self::new(1006);

    /// 1007: payload inconsistent with the message type.
    pub const BAD_DATA: Self = Self::new(1007);

    /// 1008: message violates policy.
    pub const POLICY_VIOLATION: Self = Self::new(1008);

    /// 1009: message too big to process.
    pub const TOO_BIG_TO_PROCESS: Self = Self::new(1009);

    /// 1010: client expected an extension the server did not negotiate.
    pub const REQUIRED_EXTENSION: Self = Self::new(1010);

    /// 1011: unexpected condition on the server.
    pub const SERVER_ERROR: Self = Self::new(1011);

    /// 1012: service is restarting.
    pub const SERVICE_RESTARTED: Self = Self::new(1012);

    /// 1013: service is overloaded.
    pub const SERVICE_OVERLOAD: Self = Self::new(1013);

    /// 1015: TLS handshake failure. Never sent on the wire.
    pub const TLS_HANDSHAKE_FAILURE: Self = Self::new(1015);
}

// ============================================================================
// Constructors
// ============================================================================

impl CloseStatus {
    /// Creates a status with no reason.
    #[inline]
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self { code, reason: None }
    }

    /// Creates a status with a reason.
    #[inline]
    #[must_use]
    pub fn with_code_and_reason(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: Some(reason.into()),
        }
    }

    /// Returns a copy of this status carrying the given reason.
    ///
    /// An empty reason clears it.
    #[must_use]
    pub fn with_reason(&self, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            code: self.code,
            reason: (!reason.is_empty()).then_some(reason),
        }
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl CloseStatus {
    /// Returns the status code.
    #[inline]
    #[must_use]
    pub const fn code(&self) -> u16 {
        self.code
    }

    /// Returns the reason, if any.
    #[inline]
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Returns `true` if the codes match, ignoring the reason.
    #[inline]
    #[must_use]
    pub fn equals_code(&self, other: &CloseStatus) -> bool {
        self.code == other.code
    }
}

impl Default for CloseStatus {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl fmt::Display for CloseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "CloseStatus[code={}, reason={}]", self.code, reason),
            None => write!(f, "CloseStatus[code={}]", self.code),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
