//! Native transport seam.
//!
//! The session core never touches sockets. A native WebSocket API implements
//! [`Transport`] and drives the session through its callback entry points
//! ([`Session::on_message`], [`Session::on_transport_error`],
//! [`Session::on_transport_close`]).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   on_message / on_error / on_close   ┌──────────────┐
//! │ Native transport │─────────────────────────────────────►│   Session    │
//! │  (any thread)    │◄─────────────────────────────────────│              │
//! └──────────────────┘  suspend / resume / write / close    └──────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `tungstenite` | Reference transport over `tokio-tungstenite` |
//!
//! [`Session::on_message`]: crate::Session::on_message
//! [`Session::on_transport_error`]: crate::Session::on_transport_error
//! [`Session::on_transport_close`]: crate::Session::on_transport_close

// ============================================================================
// Imports
// ============================================================================

use crate::error::Result;
use crate::protocol::{CloseStatus, Message};
use crate::session::SendReadiness;

// ============================================================================
// Submodules
// ============================================================================

/// Reference transport over `tokio-tungstenite`.
pub mod tungstenite;

// ============================================================================
// Re-exports
// ============================================================================

pub use tungstenite::{TungsteniteTransport, spawn_session};

// ============================================================================
// Transport
// ============================================================================

/// Capabilities a native WebSocket API exposes to the session core.
///
/// All methods may be called from any thread, including from inside the
/// session's callback entry points. Implementations must not block.
pub trait Transport: Send + Sync + 'static {
    /// Whether the API has flow control and can pause inbound delivery.
    ///
    /// When `false`, the session buffers inbound messages in a bounded queue
    /// instead.
    fn can_suspend_receiving(&self) -> bool;

    /// Pauses delivery of inbound messages until [`resume_receiving`] is called.
    ///
    /// Must be a no-op when [`can_suspend_receiving`] is `false`.
    ///
    /// [`resume_receiving`]: Transport::resume_receiving
    /// [`can_suspend_receiving`]: Transport::can_suspend_receiving
    fn suspend_receiving(&self);

    /// Resumes delivery of inbound messages.
    ///
    /// Must be a no-op when [`can_suspend_receiving`] is `false`.
    ///
    /// [`can_suspend_receiving`]: Transport::can_suspend_receiving
    fn resume_receiving(&self);

    /// Issues a write of one message.
    ///
    /// Asynchronous transports call `readiness.set_ready_to_send(false)`
    /// before starting the write and `set_ready_to_send(true)` from their
    /// write-complete callback. Returns `Ok(false)` if the transport was not
    /// able to accept the message.
    ///
    /// # Errors
    ///
    /// Returns an error if the write could not be issued.
    fn write_message(&self, message: Message, readiness: &SendReadiness) -> Result<bool>;

    /// Closes the connection with the given status.
    ///
    /// # Errors
    ///
    /// Returns an error if the close frame could not be issued.
    fn close(&self, status: CloseStatus) -> Result<()>;
}
