//! Session core: the duplex adapter around one connection.
//!
//! # Architecture
//!
//! ```text
//!   transport callbacks ──► ReceiveAdapter ──► Receive (Stream) ──► consumer
//!
//!   producer (Stream) ──► SendDriver ──► Transport::write_message
//!                             ▲
//!                     SendReadiness (raised by write-complete callback)
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | [`Session`] and its callback entry points |
//! | `receive` | Pull-driven inbound stream |
//! | `send` | Readiness-gated outbound writer |
//! | `builder` | [`SessionBuilder`] |
//! | `options` | [`SessionOptions`] |

// ============================================================================
// Submodules
// ============================================================================

/// Session construction.
pub mod builder;

/// Session core and transport callbacks.
pub mod core;

/// Session configuration.
pub mod options;

/// Inbound message stream.
pub mod receive;

/// Outbound writer and readiness flag.
pub mod send;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{CompletionSender, SessionBuilder};
pub use self::core::{OutboundState, SendCompletion, Session};
pub use options::{DEFAULT_RECEIVE_BUFFER_CAPACITY, SessionOptions};
pub use receive::{Receive, TryNext};
pub use send::{SendReadiness, is_data_empty};
