//! Builder pattern for session construction.
//!
//! # Example
//!
//! ```ignore
//! use ws_session_adapter::{HandshakeInfo, SessionBuilder};
//!
//! let session = SessionBuilder::new()
//!     .handshake(HandshakeInfo::new(uri))
//!     .id_from("native-42")
//!     .build(transport)?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::protocol::{BufferFactory, DefaultBufferFactory, HandshakeInfo};
use crate::transport::Transport;

use super::core::Session;
use super::options::SessionOptions;

// ============================================================================
// Types
// ============================================================================

/// Sender resolved with the overall session outcome (client-side use).
pub type CompletionSender = oneshot::Sender<Result<()>>;

// ============================================================================
// SessionBuilder
// ============================================================================

/// Builder for configuring a [`Session`].
///
/// Configure it, then hand the transport to [`SessionBuilder::build`].
#[derive(Default)]
pub struct SessionBuilder {
    /// Session identifier.
    id: Option<SessionId>,
    /// Handshake metadata.
    handshake: Option<HandshakeInfo>,
    /// Payload buffer allocation.
    buffer_factory: Option<Arc<dyn BufferFactory>>,
    /// External completion signal.
    completion: Option<CompletionSender>,
    /// Session tunables.
    options: SessionOptions,
}

// ============================================================================
// SessionBuilder Implementation
// ============================================================================

impl SessionBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the session identifier.
    ///
    /// A random one is generated when unset.
    #[inline]
    #[must_use]
    pub fn id(mut self, id: SessionId) -> Self {
        self.id = Some(id);
        self
    }

    /// Uses a transport-provided identifier.
    #[inline]
    #[must_use]
    pub fn id_from(self, id: impl Into<String>) -> Self {
        self.id(SessionId::from_string(id))
    }

    /// Sets the handshake metadata. Required.
    #[inline]
    #[must_use]
    pub fn handshake(mut self, handshake: HandshakeInfo) -> Self {
        self.handshake = Some(handshake);
        self
    }

    /// Sets the payload buffer factory.
    ///
    /// Defaults to [`DefaultBufferFactory`].
    #[inline]
    #[must_use]
    pub fn buffer_factory(mut self, factory: Arc<dyn BufferFactory>) -> Self {
        self.buffer_factory = Some(factory);
        self
    }

    /// Sets a sender resolved once with the session outcome.
    ///
    /// Used on the client side, where the code that opened the connection
    /// awaits the end of the session.
    #[inline]
    #[must_use]
    pub fn completion(mut self, completion: CompletionSender) -> Self {
        self.completion = Some(completion);
        self
    }

    /// Sets the session options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the session around the given transport.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no handshake info was set
    /// - [`Error::Config`] if the options are invalid
    pub fn build<T: Transport>(self, transport: T) -> Result<Session<T>> {
        let handshake = self.validate_handshake()?;
        self.options.validate()?;

        let id = self.id.unwrap_or_default();
        let buffer_factory = self
            .buffer_factory
            .unwrap_or_else(|| Arc::new(DefaultBufferFactory::default()) as Arc<dyn BufferFactory>);

        Ok(Session::new(
            transport,
            id,
            handshake,
            buffer_factory,
            self.completion,
            self.options,
        ))
    }

    fn validate_handshake(&self) -> Result<HandshakeInfo> {
        self.handshake
            .clone()
            .ok_or_else(|| Error::config("handshake info is required"))
    }
}

impl fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("id", &self.id)
            .field("handshake", &self.handshake)
            .field("buffer_factory", &self.buffer_factory)
            .field("completion", &self.completion.is_some())
            .field("options", &self.options)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
