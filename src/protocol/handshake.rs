//! Handshake metadata captured when the connection opened.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use url::Url;

// ============================================================================
// HandshakeInfo
// ============================================================================

/// Information negotiated during the WebSocket opening handshake.
///
/// Header names are stored lower-cased so lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeInfo {
    /// Request URI of the upgrade.
    uri: Url,

    /// Handshake headers (lower-cased names).
    headers: FxHashMap<String, String>,

    /// Sub-protocols requested by the client, in preference order.
    requested_protocols: Vec<String>,

    /// Sub-protocol accepted by the server, if any.
    protocol: Option<String>,

    /// Negotiated extensions (e.g. `permessage-deflate`).
    extensions: Vec<String>,
}

// ============================================================================
// Constructors
// ============================================================================

impl HandshakeInfo {
    /// Creates handshake info for the given URI with no headers or protocols.
    #[must_use]
    pub fn new(uri: Url) -> Self {
        Self {
            uri,
            headers: FxHashMap::default(),
            requested_protocols: Vec::new(),
            protocol: None,
            extensions: Vec::new(),
        }
    }

    /// Adds a handshake header.
    #[inline]
    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Sets the sub-protocols requested by the client.
    #[inline]
    #[must_use]
    pub fn with_requested_protocols(
        mut self,
        protocols: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.requested_protocols = protocols.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the accepted sub-protocol.
    #[inline]
    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    /// Adds a negotiated extension.
    #[inline]
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extensions.push(extension.into());
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl HandshakeInfo {
    /// Returns the request URI.
    #[inline]
    #[must_use]
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// Looks up a header value by name, ignoring case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns all handshake headers.
    #[inline]
    #[must_use]
    pub fn headers(&self) -> &FxHashMap<String, String> {
        &self.headers
    }

    /// Returns the sub-protocols the client asked for.
    #[inline]
    #[must_use]
    pub fn requested_protocols(&self) -> &[String] {
        &self.requested_protocols
    }

    /// Returns the accepted sub-protocol.
    #[inline]
    #[must_use]
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    /// Returns the negotiated extensions.
    #[inline]
    #[must_use]
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

// ============================================================================
// Tests
// ============================================================================
