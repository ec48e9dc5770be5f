//! WebSocket value types.
//!
//! This module defines the values exchanged between the native transport,
//! the session core and application code. No wire format lives here; the
//! transport hands over already-decoded messages.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `message` | [`Message`] and [`MessageType`] |
//! | `close` | [`CloseStatus`] and RFC 6455 codes |
//! | `handshake` | [`HandshakeInfo`] |
//! | `buffer` | [`BufferFactory`] for payload allocation |

// ============================================================================
// Submodules
// ============================================================================

/// Payload buffer allocation.
pub mod buffer;

/// Close status codes.
pub mod close;

/// Opening handshake metadata.
pub mod handshake;

/// Message values.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use buffer::{BufferFactory, DefaultBufferFactory};
pub use close::CloseStatus;
pub use handshake::HandshakeInfo;
pub use message::{Message, MessageType};
