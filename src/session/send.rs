//! Push-driven outbound writer.
//!
//! Drains an outbound message stream into sequential transport writes. The
//! next message is requested from upstream only after the current one has
//! been handed to the transport, and a write is only issued while the
//! transport reports itself ready. Asynchronous transports lower the
//! readiness flag when a write starts and raise it again from their
//! write-complete callback, so exactly one write is ever in flight.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll, Waker};

use futures_util::stream::BoxStream;
use futures_util::task::AtomicWaker;
use futures_util::StreamExt;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::protocol::Message;
use crate::transport::Transport;

// ============================================================================
// SendReadiness
// ============================================================================

/// Readiness flag shared between the transport and the outbound writer.
///
/// `true` means the transport can accept another write now. Transports set it
/// to `false` right before issuing an asynchronous write and back to `true`
/// from the write-complete callback. Cloning shares the same flag.
#[derive(Clone)]
pub struct SendReadiness {
    inner: Arc<ReadinessInner>,
}

struct ReadinessInner {
    /// Transport can accept a write.
    ready: AtomicBool,
    /// Writer waiting for readiness.
    waker: AtomicWaker,
}

impl SendReadiness {
    /// Creates a flag in the ready state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ReadinessInner {
                ready: AtomicBool::new(true),
                waker: AtomicWaker::new(),
            }),
        }
    }

    /// Sets whether the transport can accept another write.
    ///
    /// Raising the flag wakes a writer waiting on it.
    pub fn set_ready_to_send(&self, ready: bool) {
        self.inner.ready.store(ready, Ordering::Release);
        if ready {
            self.inner.waker.wake();
        }
    }

    /// Returns `true` if the transport can accept another write.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::Acquire)
    }

    fn register(&self, waker: &Waker) {
        self.inner.waker.register(waker);
    }
}

impl Default for SendReadiness {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SendReadiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendReadiness")
            .field("ready", &self.is_ready())
            .finish()
    }
}

// ============================================================================
// SendProcessor
// ============================================================================

/// Control side of the outbound writer, shared with the session.
///
/// The session cancels and terminates the writer from transport callbacks;
/// the first terminal signal wins and later ones are ignored.
pub(crate) struct SendProcessor {
    /// Session this writer belongs to (for logging).
    session_id: SessionId,
    /// Upstream detached; no further writes.
    cancelled: AtomicBool,
    /// Terminal outcome, recorded once.
    outcome: Mutex<Option<Result<()>>>,
    /// Writer task to wake on cancel or terminal signal.
    waker: AtomicWaker,
}

impl SendProcessor {
    pub(crate) fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            cancelled: AtomicBool::new(false),
            outcome: Mutex::new(None),
            waker: AtomicWaker::new(),
        }
    }

    /// Detaches from upstream and halts further writes.
    ///
    /// A write already handed to the transport finishes on its own.
    pub(crate) fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            debug!(session_id = %self.session_id, "Outbound stream cancelled");
        }
        self.waker.wake();
    }

    /// Completes the writer successfully.
    pub(crate) fn on_complete(&self) -> bool {
        self.terminate(Ok(()))
    }

    /// Completes the writer with an error.
    pub(crate) fn on_error(&self, error: Error) -> bool {
        self.terminate(Err(error))
    }

    /// Returns `true` once upstream has been detached.
    #[inline]
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Returns `true` once a terminal outcome has been recorded.
    pub(crate) fn is_terminated(&self) -> bool {
        self.outcome.lock().is_some()
    }

    /// Records the outcome if none is set yet. Returns `true` if recorded.
    fn terminate(&self, result: Result<()>) -> bool {
        let recorded = {
            let mut outcome = self.outcome.lock();
            if outcome.is_some() {
                trace!(session_id = %self.session_id, "Outbound terminal signal already recorded");
                false
            } else {
                *outcome = Some(result);
                true
            }
        };

        if recorded {
            self.waker.wake();
        }
        recorded
    }

    /// Records `result` if nothing is set yet, then returns whatever is stored.
    fn settle(&self, result: Result<()>) -> Result<()> {
        let mut outcome = self.outcome.lock();
        outcome.get_or_insert(result).clone()
    }

    fn outcome(&self) -> Option<Result<()>> {
        self.outcome.lock().clone()
    }
}

impl fmt::Debug for SendProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendProcessor")
            .field("session_id", &self.session_id)
            .field("cancelled", &self.is_cancelled())
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

// ============================================================================
// SendDriver
// ============================================================================

/// Future that writes the outbound stream one message at a time.
pub(crate) struct SendDriver {
    /// Shared control state.
    processor: Arc<SendProcessor>,
    /// Native transport.
    transport: Arc<dyn Transport>,
    /// Readiness raised by the transport.
    readiness: SendReadiness,
    /// Outbound source; dropped on cancel or completion.
    upstream: Option<BoxStream<'static, Message>>,
    /// Message taken from upstream and not yet written.
    current: Option<Message>,
    /// Upstream signalled its end.
    drained: bool,
}

impl SendDriver {
    pub(crate) fn new(
        processor: Arc<SendProcessor>,
        transport: Arc<dyn Transport>,
        readiness: SendReadiness,
        upstream: BoxStream<'static, Message>,
    ) -> Self {
        Self {
            processor,
            transport,
            readiness,
            upstream: Some(upstream),
            current: None,
            drained: false,
        }
    }

    /// Returns `true` if a message is held and the transport is ready.
    #[inline]
    fn is_write_possible(&self) -> bool {
        self.readiness.is_ready() && self.current.is_some()
    }

    /// Returns `true` if the next step can run without waiting for readiness.
    ///
    /// Completion also waits for the last write to be acknowledged.
    fn can_proceed(&self) -> bool {
        if self.drained {
            self.readiness.is_ready()
        } else {
            self.is_write_possible()
        }
    }

    /// Writes one message. Returns `Ok(true)` once the transport accepted it.
    fn write(&self, message: Message) -> Result<bool> {
        if is_data_empty(&message) {
            trace!(session_id = %self.processor.session_id, ?message, "Writing empty frame");
        } else {
            trace!(session_id = %self.processor.session_id, ?message, "Writing message");
        }
        self.transport.write_message(message, &self.readiness)
    }

    /// Forgets the message that was just written.
    fn release_data(&mut self) {
        self.current = None;
    }

    /// Drops upstream and any unwritten message.
    fn detach(&mut self) {
        if let Some(message) = self.current.take() {
            trace!(session_id = %self.processor.session_id, ?message, "Discarding unwritten message");
        }
        self.upstream = None;
    }

    fn finish(&mut self, result: Result<()>) -> Poll<Result<()>> {
        self.detach();
        let result = self.processor.settle(result);
        if let Err(ref error) = result {
            warn!(session_id = %self.processor.session_id, %error, "Outbound stream failed");
        } else {
            debug!(session_id = %self.processor.session_id, "Outbound stream completed");
        }
        Poll::Ready(result)
    }
}

impl Future for SendDriver {
    type Output = Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        this.processor.waker.register(cx.waker());

        loop {
            if let Some(result) = this.processor.outcome() {
                return this.finish(result);
            }

            if this.processor.is_cancelled() {
                // Waiting for the session to record the terminal signal.
                this.detach();
                return Poll::Pending;
            }

            if this.current.is_none() && !this.drained {
                let Some(upstream) = this.upstream.as_mut() else {
                    return Poll::Pending;
                };

                match upstream.poll_next_unpin(cx) {
                    Poll::Ready(Some(message)) => this.current = Some(message),
                    Poll::Ready(None) => {
                        this.drained = true;
                        this.upstream = None;
                    }
                    Poll::Pending => return Poll::Pending,
                }
            }

            if !this.can_proceed() {
                this.readiness.register(cx.waker());
                if !this.can_proceed() {
                    return Poll::Pending;
                }
            }

            if this.drained {
                return this.finish(Ok(()));
            }

            let Some(message) = this.current.clone() else {
                continue;
            };

            match this.write(message) {
                Ok(true) => this.release_data(),
                Ok(false) => return this.finish(Err(Error::WriteRejected)),
                Err(error) => return this.finish(Err(error)),
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Returns `true` if the message carries no payload bytes.
///
/// Empty messages are still written (as a bare frame) and advance the
/// outbound sequence like any other message.
#[inline]
#[must_use]
pub fn is_data_empty(message: &Message) -> bool {
    message.is_empty()
}

// ============================================================================
// Tests
// ============================================================================
