//! Reference transport over `tokio-tungstenite`.
//!
//! Turns a [`WebSocketStream`] into the callback-driven shape the session
//! core expects, and gives it real flow control in both directions.
//!
//! # Tasks
//!
//! [`spawn_session`] splits the stream and spawns two tokio tasks:
//!
//! - **Reader**: reads one frame at a time and hands it to
//!   [`Session::on_message`]. When the session suspends receiving, the reader
//!   stops polling the socket until it is resumed, so TCP flow control pushes
//!   back on the peer.
//! - **Writer**: performs each write issued through
//!   [`Transport::write_message`] and raises the session's readiness flag
//!   once the frame has been flushed to the socket.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Notify, mpsc};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::protocol::{CloseStatus, Message, MessageType};
use crate::session::{SendReadiness, Session, SessionBuilder};

use super::Transport;

// ============================================================================
// Constants
// ============================================================================

/// Maximum close reason length in bytes (RFC 6455 Section 5.5).
const MAX_CLOSE_REASON_LEN: usize = 123;

// ============================================================================
// Types
// ============================================================================

/// Commands for the writer task.
#[derive(Debug)]
enum WriterCommand {
    /// Write a frame and raise readiness when done.
    Send {
        frame: WsMessage,
        readiness: SendReadiness,
    },
    /// Send a close frame and stop.
    Close(CloseStatus),
    /// Stop without sending anything.
    Shutdown,
}

/// Inbound pause switch shared with the reader task.
#[derive(Debug, Default)]
struct FlowControl {
    suspended: AtomicBool,
    resumed: Notify,
}

impl FlowControl {
    fn suspend(&self) {
        self.suspended.store(true, Ordering::Release);
    }

    fn resume(&self) {
        self.suspended.store(false, Ordering::Release);
        self.resumed.notify_one();
    }

    fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Acquire)
    }

    async fn wait_resumed(&self) {
        loop {
            let resumed = self.resumed.notified();
            if !self.is_suspended() {
                return;
            }
            resumed.await;
        }
    }
}

// ============================================================================
// TungsteniteTransport
// ============================================================================

/// [`Transport`] backed by a `tokio-tungstenite` connection.
///
/// Created by [`spawn_session`]; all I/O happens on the spawned tasks.
#[derive(Debug, Clone)]
pub struct TungsteniteTransport {
    /// Channel to the writer task.
    outgoing: mpsc::UnboundedSender<WriterCommand>,
    /// Inbound pause switch.
    flow: Arc<FlowControl>,
}

impl TungsteniteTransport {
    /// Returns `true` while the reader is paused.
    #[inline]
    #[must_use]
    pub fn is_receiving_suspended(&self) -> bool {
        self.flow.is_suspended()
    }
}

impl Transport for TungsteniteTransport {
    fn can_suspend_receiving(&self) -> bool {
        true
    }

    fn suspend_receiving(&self) {
        self.flow.suspend();
    }

    fn resume_receiving(&self) {
        self.flow.resume();
    }

    fn write_message(&self, message: Message, readiness: &SendReadiness) -> Result<bool> {
        let frame = to_ws_message(message);

        readiness.set_ready_to_send(false);
        self.outgoing
            .send(WriterCommand::Send {
                frame,
                readiness: readiness.clone(),
            })
            .map_err(|_| Error::ConnectionClosed)?;

        Ok(true)
    }

    fn close(&self, status: CloseStatus) -> Result<()> {
        self.outgoing
            .send(WriterCommand::Close(status))
            .map_err(|_| Error::ConnectionClosed)
    }
}

// ============================================================================
// Session Spawning
// ============================================================================

/// Builds a session over an established WebSocket stream and spawns its
/// reader and writer tasks.
///
/// Must be called from within a tokio runtime.
///
/// # Example
///
/// ```ignore
/// let ws_stream = tokio_tungstenite::accept_async(tcp_stream).await?;
/// let session = spawn_session(
///     ws_stream,
///     SessionBuilder::new().handshake(HandshakeInfo::new(uri)),
/// )?;
///
/// // Echo every data message back.
/// let echo = session.receive().filter_map(|m| async move { m.ok() });
/// session.send(echo).await?;
/// ```
///
/// # Errors
///
/// Returns [`Error::Config`] if the builder is incomplete.
pub fn spawn_session<S>(
    ws_stream: WebSocketStream<S>,
    builder: SessionBuilder,
) -> Result<Session<TungsteniteTransport>>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (outgoing, commands) = mpsc::unbounded_channel();
    let flow = Arc::new(FlowControl::default());

    let transport = TungsteniteTransport {
        outgoing: outgoing.clone(),
        flow: Arc::clone(&flow),
    };
    let session = builder.build(transport)?;

    let (ws_write, ws_read) = ws_stream.split();

    tokio::spawn(run_reader(ws_read, session.clone(), flow, outgoing));
    tokio::spawn(run_writer(ws_write, commands, session.clone()));

    Ok(session)
}

/// Reads frames and feeds them to the session, pausing while suspended.
async fn run_reader<S>(
    mut ws_read: SplitStream<WebSocketStream<S>>,
    session: Session<TungsteniteTransport>,
    flow: Arc<FlowControl>,
    outgoing: mpsc::UnboundedSender<WriterCommand>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        flow.wait_resumed().await;

        match ws_read.next().await {
            Some(Ok(WsMessage::Close(frame))) => {
                let status = frame.map_or(CloseStatus::NO_STATUS_CODE, close_status);
                session.on_transport_close(status);
                break;
            }

            Some(Ok(frame)) => {
                if let Some(message) = from_ws_message(frame) {
                    session.on_message(message);
                }
            }

            Some(Err(e)) => {
                error!(session_id = %session.id(), error = %e, "WebSocket read failed");
                session.on_transport_error(e.into());
                break;
            }

            None => {
                debug!(session_id = %session.id(), "WebSocket stream ended");
                session.on_transport_close(CloseStatus::NO_CLOSE_FRAME);
                break;
            }
        }
    }

    let _ = outgoing.send(WriterCommand::Shutdown);
    debug!(session_id = %session.id(), "Reader task terminated");
}

/// Performs writes one at a time, raising readiness after each.
async fn run_writer<S>(
    mut ws_write: SplitSink<WebSocketStream<S>, WsMessage>,
    mut commands: mpsc::UnboundedReceiver<WriterCommand>,
    session: Session<TungsteniteTransport>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(command) = commands.recv().await {
        match command {
            WriterCommand::Send { frame, readiness } => {
                if let Err(e) = ws_write.send(frame).await {
                    warn!(session_id = %session.id(), error = %e, "WebSocket write failed");
                    session.on_transport_error(e.into());
                    break;
                }
                trace!(session_id = %session.id(), "Frame flushed");
                readiness.set_ready_to_send(true);
            }

            WriterCommand::Close(status) => {
                if let Err(e) = ws_write.send(WsMessage::Close(close_frame(&status))).await {
                    debug!(session_id = %session.id(), error = %e, "Close frame not sent");
                }
                break;
            }

            WriterCommand::Shutdown => break,
        }
    }

    debug!(session_id = %session.id(), "Writer task terminated");
}

// ============================================================================
// Conversions
// ============================================================================

/// Converts an inbound frame. Raw frames are not surfaced.
fn from_ws_message(frame: WsMessage) -> Option<Message> {
    match frame {
        WsMessage::Text(text) => Some(Message::text(text.as_str())),
        WsMessage::Binary(payload) => Some(Message::binary(payload)),
        WsMessage::Ping(payload) => Some(Message::ping(payload)),
        WsMessage::Pong(payload) => Some(Message::pong(payload)),
        WsMessage::Close(_) | WsMessage::Frame(_) => None,
    }
}

/// Converts an outbound message.
///
/// A close message payload is read as a two-byte big-endian code followed by
/// a UTF-8 reason.
fn to_ws_message(message: Message) -> WsMessage {
    match message.message_type() {
        MessageType::Text => WsMessage::Text(message.payload_as_text().into_owned().into()),
        MessageType::Binary => WsMessage::Binary(message.into_payload()),
        MessageType::Ping => WsMessage::Ping(message.into_payload()),
        MessageType::Pong => WsMessage::Pong(message.into_payload()),
        MessageType::Close => {
            let payload: Bytes = message.into_payload();
            let frame = (payload.len() >= 2).then(|| {
                let code = u16::from_be_bytes([payload[0], payload[1]]);
                let reason = String::from_utf8_lossy(&payload[2..]).into_owned();
                close_frame(&CloseStatus::with_code_and_reason(code, reason))
            });
            WsMessage::Close(frame.flatten())
        }
    }
}

/// Builds the wire close frame; codes reserved for local use send none.
fn close_frame(status: &CloseStatus) -> Option<CloseFrame> {
    let reserved = [
        CloseStatus::NO_STATUS_CODE,
        CloseStatus::NO_CLOSE_FRAME,
        CloseStatus::TLS_HANDSHAKE_FAILURE,
    ];
    if reserved.iter().any(|code| code.equals_code(status)) {
        return None;
    }

    let reason = truncate_reason(status.reason().unwrap_or_default());
    Some(CloseFrame {
        code: CloseCode::from(status.code()),
        reason: reason.to_owned().into(),
    })
}

fn close_status(frame: CloseFrame) -> CloseStatus {
    let code = u16::from(frame.code);
    if frame.reason.is_empty() {
        CloseStatus::new(code)
    } else {
        CloseStatus::with_code_and_reason(code, frame.reason.as_str())
    }
}

/// Cuts a close reason to the protocol limit on a character boundary.
fn truncate_reason(reason: &str) -> &str {
    if reason.len() <= MAX_CLOSE_REASON_LEN {
        return reason;
    }
    let mut end = MAX_CLOSE_REASON_LEN;
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    &reason[..end]
}

// ============================================================================
// Tests
// ============================================================================
