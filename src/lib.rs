//! WebSocket session adapter - callback transports as backpressured streams.
//!
//! This library turns a push-style WebSocket transport (one that invokes
//! callbacks as frames arrive and as writes complete) into a duplex session:
//! inbound messages are consumed as a [`Stream`](futures_util::Stream) and
//! outbound messages are supplied as one.
//!
//! # Architecture
//!
//! A [`Session`] sits between a [`Transport`] and application code:
//!
//! - **Receive side**: the transport pushes messages in through
//!   [`Session::on_message`]; the application pulls them from
//!   [`Session::receive`]. At most one message is held while the transport
//!   can suspend receiving. Otherwise a bounded queue absorbs bursts.
//! - **Send side**: [`Session::send`] drains an application stream into the
//!   transport, one write in flight at a time, gated on the transport's
//!   [`SendReadiness`] flag.
//!
//! Key design principles:
//!
//! - Demand drives both directions (no unbounded buffering)
//! - Ordering is preserved end to end
//! - Each terminal outcome is delivered exactly once
//!
//! # Quick Start
//!
//! ```ignore
//! use futures_util::StreamExt;
//! use ws_session_adapter::{HandshakeInfo, Result, SessionBuilder, spawn_session};
//!
//! async fn serve(tcp: tokio::net::TcpStream, uri: url::Url) -> Result<()> {
//!     let ws_stream = tokio_tungstenite::accept_async(tcp).await?;
//!     let session = spawn_session(
//!         ws_stream,
//!         SessionBuilder::new().handshake(HandshakeInfo::new(uri)),
//!     )?;
//!
//!     // Echo
//!     let inbound = session.receive().filter_map(|m| async move { m.ok() });
//!     session.send(inbound).await
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Session identifier |
//! | [`protocol`] | Messages, close status, handshake metadata |
//! | [`session`] | Session core and its receive/send adapters |
//! | [`transport`] | Transport contract and `tokio-tungstenite` binding |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// WebSocket message types.
///
/// Frames, close codes, handshake metadata and payload buffers.
pub mod protocol;

/// Session core.
///
/// Use [`SessionBuilder`] to create a [`Session`] over a transport.
pub mod session;

/// Transport layer.
///
/// The [`Transport`] contract plus a `tokio-tungstenite` implementation.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::SessionId;

// Protocol types
pub use protocol::{
    BufferFactory, CloseStatus, DefaultBufferFactory, HandshakeInfo, Message, MessageType,
};

// Session types
pub use session::{
    CompletionSender, DEFAULT_RECEIVE_BUFFER_CAPACITY, OutboundState, Receive, SendCompletion,
    SendReadiness, Session, SessionBuilder, SessionOptions, TryNext, is_data_empty,
};

// Transport types
pub use transport::{Transport, TungsteniteTransport, spawn_session};
