//! Pull-driven inbound message stream.
//!
//! Transport callbacks push messages in; the consumer pulls them out at its
//! own pace. When the transport can suspend delivery, at most one message is
//! held: the transport is suspended as each message arrives and resumed as
//! soon as the consumer takes it. Otherwise messages queue up to a fixed
//! capacity and overflowing it fails the stream.
//!
//! # States
//!
//! ```text
//! Empty ──handle_message──► Full ──read──► Empty
//!   │                         │
//!   └── on_all_data_read / on_error ──► terminal (delivered once)
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use futures_util::Stream;
use futures_util::stream::FusedStream;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::protocol::Message;
use crate::transport::Transport;

// ============================================================================
// Types
// ============================================================================

/// Lifecycle of the inbound sequence.
#[derive(Debug)]
enum Outcome {
    /// Messages may still arrive.
    Open,
    /// End of data; pending messages still drain.
    Completed,
    /// Failed; the error is handed out on the next pull.
    Failed(Error),
    /// Terminal signal already delivered to the consumer.
    Terminated,
}

/// Result of a non-blocking pull from the inbound sequence.
#[derive(Debug)]
#[must_use]
pub enum TryNext {
    /// The next message.
    Message(Message),
    /// No message yet; the sequence is still open.
    Empty,
    /// The sequence ended normally. Reported once.
    Ended,
}

impl TryNext {
    /// Returns the message, if one was taken.
    #[inline]
    pub fn into_message(self) -> Option<Message> {
        match self {
            Self::Message(message) => Some(message),
            Self::Empty | Self::Ended => None,
        }
    }

    /// Returns `true` if the sequence ended normally.
    #[inline]
    #[must_use]
    pub fn is_ended(&self) -> bool {
        matches!(self, Self::Ended)
    }
}

/// State shared between transport callbacks and the consumer.
#[derive(Debug)]
struct ReceiveState {
    /// Pending messages, never longer than the adapter capacity.
    pending: VecDeque<Message>,
    /// Sequence lifecycle.
    outcome: Outcome,
    /// Consumer waiting for data.
    waker: Option<Waker>,
}

// ============================================================================
// ReceiveAdapter
// ============================================================================

/// Bridges "message arrived" callbacks into consumer-driven demand.
pub(crate) struct ReceiveAdapter {
    /// Session this adapter belongs to (for logging).
    session_id: SessionId,
    /// Native transport.
    transport: Arc<dyn Transport>,
    /// Maximum resident messages: 1 with flow control, the fallback buffer size without.
    capacity: usize,
    /// Whether the transport honours suspend/resume.
    suspendable: bool,
    /// Slot and lifecycle.
    state: Mutex<ReceiveState>,
}

impl ReceiveAdapter {
    /// Creates an adapter for the given transport.
    ///
    /// `fallback_capacity` is only used when the transport cannot suspend.
    pub(crate) fn new(
        session_id: SessionId,
        transport: Arc<dyn Transport>,
        fallback_capacity: usize,
    ) -> Self {
        let suspendable = transport.can_suspend_receiving();
        let capacity = if suspendable { 1 } else { fallback_capacity };

        Self {
            session_id,
            transport,
            capacity,
            suspendable,
            state: Mutex::new(ReceiveState {
                pending: VecDeque::with_capacity(capacity.min(64)),
                outcome: Outcome::Open,
                waker: None,
            }),
        }
    }

    /// Returns the number of messages that may be resident at once.
    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` until a terminal signal has been recorded.
    pub(crate) fn is_open(&self) -> bool {
        matches!(self.state.lock().outcome, Outcome::Open)
    }

    /// Handles a message delivered by the transport.
    ///
    /// Returns `false` if the message was dropped because the sequence is
    /// already terminal or the message overflowed the buffer.
    pub(crate) fn handle_message(&self, message: Message) -> bool {
        if !self.is_open() {
            warn!(session_id = %self.session_id, ?message, "Message after terminal signal ignored");
            return false;
        }

        // Suspend before storing, so a concurrent read cannot resume first.
        self.transport.suspend_receiving();

        let (accepted, waker) = {
            let mut state = self.state.lock();

            if !matches!(state.outcome, Outcome::Open) {
                warn!(session_id = %self.session_id, ?message, "Message after terminal signal ignored");
                return false;
            }

            if state.pending.len() >= self.capacity {
                let error = if self.suspendable {
                    Error::illegal_state("message delivered while receiving was suspended")
                } else {
                    Error::receive_overflow(self.capacity)
                };
                warn!(session_id = %self.session_id, %error, "Inbound message rejected");

                state.pending.clear();
                state.outcome = Outcome::Failed(error);
                (false, state.waker.take())
            } else {
                trace!(session_id = %self.session_id, ?message, "Message received");
                state.pending.push_back(message);
                (true, state.waker.take())
            }
        };

        if let Some(waker) = waker {
            waker.wake();
        }
        accepted
    }

    /// Returns `true` if a message is waiting to be read.
    pub(crate) fn check_on_data_available(&self) -> bool {
        !self.state.lock().pending.is_empty()
    }

    /// Takes the pending message without waiting.
    ///
    /// Returns [`TryNext::Empty`] when no message is available yet. Once the
    /// queue is drained, the terminal outcome is handed out exactly once:
    /// [`TryNext::Ended`] after a normal end, or the error after a failure.
    ///
    /// # Errors
    ///
    /// - The failure that terminated the sequence (once)
    /// - [`Error::IllegalState`] once the terminal signal has been delivered
    pub(crate) fn read(&self) -> Result<TryNext> {
        let message = {
            let mut state = self.state.lock();

            match state.pending.pop_front() {
                Some(message) => message,
                None => {
                    return match std::mem::replace(&mut state.outcome, Outcome::Terminated) {
                        Outcome::Open => {
                            state.outcome = Outcome::Open;
                            Ok(TryNext::Empty)
                        }
                        Outcome::Completed => Ok(TryNext::Ended),
                        Outcome::Failed(error) => Err(error),
                        Outcome::Terminated => {
                            Err(Error::illegal_state("receive stream already terminated"))
                        }
                    };
                }
            }
        };

        self.transport.resume_receiving();
        Ok(TryNext::Message(message))
    }

    /// Signals normal end of data.
    pub(crate) fn on_all_data_read(&self) {
        let waker = {
            let mut state = self.state.lock();
            if !matches!(state.outcome, Outcome::Open) {
                return;
            }
            debug!(session_id = %self.session_id, pending = state.pending.len(), "Receive stream completed");
            state.outcome = Outcome::Completed;
            state.waker.take()
        };

        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// Terminates the sequence with an error, discarding pending messages.
    ///
    /// Returns `false` if the sequence was already terminal.
    pub(crate) fn on_error(&self, error: Error) -> bool {
        let waker = {
            let mut state = self.state.lock();
            if !matches!(state.outcome, Outcome::Open) {
                trace!(session_id = %self.session_id, %error, "Error after terminal signal ignored");
                return false;
            }
            debug!(session_id = %self.session_id, %error, "Receive stream failed");
            state.pending.clear();
            state.outcome = Outcome::Failed(error);
            state.waker.take()
        };

        if let Some(waker) = waker {
            waker.wake();
        }
        true
    }

    /// Polls for the next item of the inbound sequence.
    fn poll_read(&self, cx: &mut Context<'_>) -> Poll<Option<Result<Message>>> {
        let message = {
            let mut state = self.state.lock();

            match state.pending.pop_front() {
                Some(message) => message,
                None => {
                    return match std::mem::replace(&mut state.outcome, Outcome::Terminated) {
                        Outcome::Open => {
                            state.outcome = Outcome::Open;
                            state.waker = Some(cx.waker().clone());
                            Poll::Pending
                        }
                        Outcome::Failed(error) => Poll::Ready(Some(Err(error))),
                        Outcome::Completed | Outcome::Terminated => Poll::Ready(None),
                    };
                }
            }
        };

        self.transport.resume_receiving();
        Poll::Ready(Some(Ok(message)))
    }

    /// Returns `true` once the terminal signal has been handed out.
    fn is_terminated(&self) -> bool {
        matches!(self.state.lock().outcome, Outcome::Terminated)
    }
}

impl fmt::Debug for ReceiveAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceiveAdapter")
            .field("session_id", &self.session_id)
            .field("capacity", &self.capacity)
            .field("suspendable", &self.suspendable)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Receive
// ============================================================================

/// Inbound message stream of a session.
///
/// Every handle returned by [`Session::receive`] reads from the same
/// underlying sequence; only one of them should be polled at a time. Yields
/// `Err` once if the connection failed, then ends.
///
/// [`Session::receive`]: crate::Session::receive
#[derive(Debug, Clone)]
pub struct Receive {
    adapter: Arc<ReceiveAdapter>,
}

impl Receive {
    pub(crate) fn new(adapter: Arc<ReceiveAdapter>) -> Self {
        Self { adapter }
    }

    /// Takes the next message if one is already available.
    ///
    /// Reports the end of the sequence as [`TryNext::Ended`] and a failure
    /// as `Err`, each once, exactly like the `Stream` side.
    ///
    /// # Errors
    ///
    /// - The failure that terminated the sequence
    /// - [`Error::IllegalState`] if the terminal signal was already delivered
    pub fn try_next(&self) -> Result<TryNext> {
        self.adapter.read()
    }

    /// Returns `true` if a message can be taken without waiting.
    #[must_use]
    pub fn is_data_available(&self) -> bool {
        self.adapter.check_on_data_available()
    }
}

impl Stream for Receive {
    type Item = Result<Message>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.adapter.poll_read(cx)
    }
}

impl FusedStream for Receive {
    fn is_terminated(&self) -> bool {
        self.adapter.is_terminated()
    }
}

// ============================================================================
// Tests
// ============================================================================
