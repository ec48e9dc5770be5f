//! Session core.
//!
//! A [`Session`] owns the transport handle and the completion outcome, and is
//! the only place that closes the connection. Transport callbacks feed the
//! inbound stream; `send()` attaches the single outbound stream.
//!
//! # Completion
//!
//! The session observes its own outbound task. When it succeeds, the external
//! completion signal (if any) resolves `Ok` and the connection closes with
//! [`CloseStatus::NORMAL`] unless `close_on_send_complete` is off. When it fails, the signal resolves with the error,
//! the inbound stream terminates with the same error and the connection closes
//! with [`CloseStatus::SERVER_ERROR`] carrying the error message. This
//! happens at most once per session.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::{self, Future};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use bytes::BytesMut;
use futures_util::future::BoxFuture;
use futures_util::{Stream, StreamExt};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::protocol::{BufferFactory, CloseStatus, HandshakeInfo, Message, MessageType};
use crate::transport::Transport;

use super::builder::CompletionSender;
use super::options::SessionOptions;
use super::receive::{Receive, ReceiveAdapter};
use super::send::{SendDriver, SendProcessor, SendReadiness};

// ============================================================================
// Types
// ============================================================================

/// Future returned by [`Session::send`].
///
/// Resolves once every outbound message has been written, or with the first
/// write or transport error.
pub type SendCompletion = BoxFuture<'static, Result<()>>;

// ============================================================================
// OutboundState
// ============================================================================

/// Progress of the session's single outbound attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutboundState {
    /// `send()` has not been called.
    NotStarted = 0,
    /// An outbound stream is attached and being written.
    Sending = 1,
    /// The outbound stream finished, successfully or not.
    Completed = 2,
}

impl OutboundState {
    #[inline]
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::NotStarted,
            1 => Self::Sending,
            _ => Self::Completed,
        }
    }
}

// ============================================================================
// Internal State
// ============================================================================

/// Outbound writer and the transport's terminal outcome, guarded together so
/// a late `send()` still observes an earlier close or error.
#[derive(Default)]
struct OutboundSlot {
    processor: Option<Arc<SendProcessor>>,
    transport_outcome: Option<Result<()>>,
}

struct SessionInner<T> {
    /// Session identifier.
    id: SessionId,
    /// Handshake metadata.
    handshake: HandshakeInfo,
    /// Payload allocation.
    buffer_factory: Arc<dyn BufferFactory>,
    /// Native transport.
    transport: Arc<T>,
    /// Session tunables.
    options: SessionOptions,
    /// Inbound adapter.
    receiver: Arc<ReceiveAdapter>,
    /// Readiness flag shared with the transport.
    readiness: SendReadiness,
    /// [`OutboundState`] as `u8`.
    outbound_state: AtomicU8,
    /// Outbound writer, created on first `send()`.
    outbound: Mutex<OutboundSlot>,
    /// A handler future is observed via `run_handler`.
    handler_attached: AtomicBool,
    /// External completion signal.
    completion: Mutex<Option<CompletionSender>>,
    /// Completion already handled.
    finalized: AtomicBool,
    /// Close issued locally or reported by the transport.
    closed: AtomicBool,
}

// ============================================================================
// Session
// ============================================================================

/// A WebSocket session over a callback-driven transport.
///
/// # Thread Safety
///
/// `Session` is `Send + Sync` and cheap to clone; clones share one
/// connection. The callback entry points may be called from any thread,
/// concurrently with consumers polling [`receive`](Self::receive) and
/// [`send`](Self::send).
pub struct Session<T: Transport> {
    inner: Arc<SessionInner<T>>,
}

impl<T: Transport> Clone for Session<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

// ============================================================================
// Session - Constructor
// ============================================================================

impl<T: Transport> Session<T> {
    pub(crate) fn new(
        transport: T,
        id: SessionId,
        handshake: HandshakeInfo,
        buffer_factory: Arc<dyn BufferFactory>,
        completion: Option<CompletionSender>,
        options: SessionOptions,
    ) -> Self {
        let transport = Arc::new(transport);
        let dyn_transport: Arc<dyn Transport> = transport.clone();
        let receiver = Arc::new(ReceiveAdapter::new(
            id.clone(),
            dyn_transport,
            options.receive_buffer_capacity,
        ));

        debug!(
            session_id = %id,
            uri = %handshake.uri(),
            receive_capacity = receiver.capacity(),
            "Session opened"
        );

        Self {
            inner: Arc::new(SessionInner {
                id,
                handshake,
                buffer_factory,
                transport,
                options,
                receiver,
                readiness: SendReadiness::new(),
                outbound_state: AtomicU8::new(OutboundState::NotStarted as u8),
                outbound: Mutex::new(OutboundSlot::default()),
                handler_attached: AtomicBool::new(false),
                completion: Mutex::new(completion),
                finalized: AtomicBool::new(false),
                closed: AtomicBool::new(false),
            }),
        }
    }
}

// ============================================================================
// Session - Accessors
// ============================================================================

impl<T: Transport> Session<T> {
    /// Returns the session identifier.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.inner.id
    }

    /// Returns the handshake metadata.
    #[inline]
    #[must_use]
    pub fn handshake_info(&self) -> &HandshakeInfo {
        &self.inner.handshake
    }

    /// Returns the payload buffer factory.
    #[inline]
    #[must_use]
    pub fn buffer_factory(&self) -> &Arc<dyn BufferFactory> {
        &self.inner.buffer_factory
    }

    /// Returns the native transport.
    #[inline]
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    /// Returns the session options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &SessionOptions {
        &self.inner.options
    }

    /// Returns the readiness flag transports raise after each write.
    #[inline]
    #[must_use]
    pub fn send_readiness(&self) -> &SendReadiness {
        &self.inner.readiness
    }

    /// Returns the state of the outbound attachment.
    #[inline]
    #[must_use]
    pub fn outbound_state(&self) -> OutboundState {
        OutboundState::from_u8(self.inner.outbound_state.load(Ordering::Acquire))
    }

    /// Returns `true` until the connection is closed locally or remotely.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.inner.closed.load(Ordering::Acquire)
    }
}

// ============================================================================
// Session - Message Factories
// ============================================================================

impl<T: Transport> Session<T> {
    /// Creates a text message using the session's buffer factory.
    #[must_use]
    pub fn text_message(&self, text: &str) -> Message {
        let mut buffer = self.inner.buffer_factory.allocate(text.len());
        buffer.extend_from_slice(text.as_bytes());
        Message::new(MessageType::Text, buffer.freeze())
    }

    /// Creates a binary message whose payload is filled by `fill`.
    #[must_use]
    pub fn binary_message(&self, fill: impl FnOnce(&mut BytesMut)) -> Message {
        self.build_message(MessageType::Binary, fill)
    }

    /// Creates a ping message whose payload is filled by `fill`.
    #[must_use]
    pub fn ping_message(&self, fill: impl FnOnce(&mut BytesMut)) -> Message {
        self.build_message(MessageType::Ping, fill)
    }

    /// Creates a pong message whose payload is filled by `fill`.
    #[must_use]
    pub fn pong_message(&self, fill: impl FnOnce(&mut BytesMut)) -> Message {
        self.build_message(MessageType::Pong, fill)
    }

    fn build_message(&self, message_type: MessageType, fill: impl FnOnce(&mut BytesMut)) -> Message {
        let mut buffer = self.inner.buffer_factory.allocate(0);
        fill(&mut buffer);
        Message::new(message_type, buffer.freeze())
    }
}

// ============================================================================
// Session - Public API
// ============================================================================

impl<T: Transport> Session<T> {
    /// Returns the inbound message stream.
    ///
    /// Every call returns a handle to the same ongoing sequence; it is not
    /// rewindable. The stream yields `Err` once if the connection failed,
    /// then ends.
    #[must_use]
    pub fn receive(&self) -> Receive {
        Receive::new(Arc::clone(&self.inner.receiver))
    }

    /// Attaches the outbound message stream.
    ///
    /// Messages are pulled one at a time and each is written only when the
    /// transport is ready. Nothing is written until the returned future is
    /// polled. Only the first call attaches; later calls return a future
    /// that fails with [`Error::IllegalState`] and leave the first
    /// attachment untouched.
    pub fn send<S>(&self, outbound: S) -> SendCompletion
    where
        S: Stream<Item = Message> + Send + 'static,
    {
        let attached = self.inner.outbound_state.compare_exchange(
            OutboundState::NotStarted as u8,
            OutboundState::Sending as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if attached.is_err() {
            warn!(session_id = %self.inner.id, "send() called more than once");
            return Box::pin(future::ready(Err(Error::illegal_state(
                "send() has already been called",
            ))));
        }

        let processor = Arc::new(SendProcessor::new(self.inner.id.clone()));
        {
            let mut slot = self.inner.outbound.lock();
            if let Some(outcome) = slot.transport_outcome.clone() {
                processor.cancel();
                match outcome {
                    Ok(()) => processor.on_complete(),
                    Err(error) => processor.on_error(error),
                };
            }
            slot.processor = Some(Arc::clone(&processor));
        }

        let transport: Arc<dyn Transport> = self.inner.transport.clone();
        let driver = SendDriver::new(
            processor,
            transport,
            self.inner.readiness.clone(),
            outbound.boxed(),
        );

        debug!(session_id = %self.inner.id, "Outbound stream attached");

        let session = self.clone();
        Box::pin(async move {
            let result = driver.await;
            session
                .inner
                .outbound_state
                .store(OutboundState::Completed as u8, Ordering::Release);
            session.on_outbound_complete(&result);
            result
        })
    }

    /// Runs a handler future as the session's outbound task.
    ///
    /// When it finishes, the session completes and closes exactly as if the
    /// outbound stream had finished with the same result.
    pub async fn run_handler<F>(&self, handler: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        self.inner.handler_attached.store(true, Ordering::Release);
        let result = handler.await;
        self.on_outbound_complete(&result);
        result
    }

    /// Raises or lowers the send readiness flag.
    #[inline]
    pub fn set_ready_to_send(&self, ready: bool) {
        self.inner.readiness.set_ready_to_send(ready);
    }

    /// Closes the connection with [`CloseStatus::NORMAL`].
    ///
    /// # Errors
    ///
    /// Returns the transport's error if the close could not be issued.
    pub fn close(&self) -> Result<()> {
        self.close_with_status(CloseStatus::NORMAL)
    }

    /// Closes the connection with the given status.
    ///
    /// Only the first close reaches the transport; later calls and calls
    /// after the transport reported a close are no-ops.
    ///
    /// # Errors
    ///
    /// Returns the transport's error if the close could not be issued.
    pub fn close_with_status(&self, status: CloseStatus) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            trace!(session_id = %self.inner.id, %status, "Session already closed");
            return Ok(());
        }

        debug!(session_id = %self.inner.id, %status, "Closing session");
        self.inner.transport.close(status)
    }
}

// ============================================================================
// Session - Transport Callbacks
// ============================================================================

impl<T: Transport> Session<T> {
    /// Delivers an inbound message from the transport.
    pub fn on_message(&self, message: Message) {
        self.inner.receiver.handle_message(message);
    }

    /// Reports a transport failure.
    ///
    /// Terminates the inbound stream and, if sending, cancels the outbound
    /// stream with the same error.
    pub fn on_transport_error(&self, error: Error) {
        debug!(session_id = %self.inner.id, %error, "Transport error");

        self.inner.receiver.on_error(error.clone());

        if let Some(processor) = self.record_transport_outcome(Err(error.clone())) {
            processor.cancel();
            processor.on_error(error);
        } else if !self.has_outbound_task() {
            self.on_outbound_complete(&Err(error));
        }
    }

    /// Reports that the transport closed.
    ///
    /// Ends the inbound stream and, if sending, cancels the outbound stream
    /// and completes it successfully.
    pub fn on_transport_close(&self, status: CloseStatus) {
        debug!(session_id = %self.inner.id, %status, "Transport closed");

        self.inner.closed.store(true, Ordering::Release);
        self.inner.receiver.on_all_data_read();

        if let Some(processor) = self.record_transport_outcome(Ok(())) {
            processor.cancel();
            processor.on_complete();
        } else if !self.has_outbound_task() {
            self.on_outbound_complete(&Ok(()));
        }
    }

    /// Stores the first transport outcome and returns the writer, if any.
    fn record_transport_outcome(&self, outcome: Result<()>) -> Option<Arc<SendProcessor>> {
        let mut slot = self.inner.outbound.lock();
        if slot.transport_outcome.is_none() {
            slot.transport_outcome = Some(outcome);
        }
        slot.processor.clone()
    }

    fn has_outbound_task(&self) -> bool {
        self.outbound_state() != OutboundState::NotStarted
            || self.inner.handler_attached.load(Ordering::Acquire)
    }

    /// Completes the session once: resolves the completion signal and closes.
    ///
    /// A failure always closes with [`CloseStatus::SERVER_ERROR`]; success
    /// closes normally only when `close_on_send_complete` is set.
    fn on_outbound_complete(&self, result: &Result<()>) {
        if self.inner.finalized.swap(true, Ordering::AcqRel) {
            trace!(session_id = %self.inner.id, "Session already completed");
            return;
        }

        if let Some(completion) = self.inner.completion.lock().take() {
            let _ = completion.send(result.clone());
        }

        let status = match result {
            Ok(()) if !self.inner.options.close_on_send_complete => {
                trace!(session_id = %self.inner.id, "Outbound complete, leaving connection open");
                return;
            }
            Ok(()) => CloseStatus::NORMAL,
            Err(error) => {
                self.inner.receiver.on_error(error.clone());
                CloseStatus::SERVER_ERROR.with_reason(error.to_string())
            }
        };

        if let Err(error) = self.close_with_status(status) {
            warn!(session_id = %self.inner.id, %error, "Failed to close session");
        }
    }
}

impl<T: Transport> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("uri", &self.inner.handshake.uri().as_str())
            .field("outbound_state", &self.outbound_state())
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;

    use crate::session::{SessionBuilder, SessionOptions, TryNext};

    use futures_util::stream;
    use tokio::sync::oneshot;
    use tokio_test::{assert_pending, assert_ready, task};
    use url::Url;

    /// Transport that records writes and closes.
    #[derive(Default)]
    struct RecordingTransport {
        suspendable: bool,
        suspends: AtomicUsize,
        resumes: AtomicUsize,
        fail_on: Option<usize>,
        written: Mutex<Vec<Message>>,
        closes: Mutex<Vec<CloseStatus>>,
    }

    impl Transport for RecordingTransport {
        fn can_suspend_receiving(&self) -> bool {
            self.suspendable
        }

        fn suspend_receiving(&self) {
            self.suspends.fetch_add(1, Ordering::SeqCst);
        }

        fn resume_receiving(&self) {
            self.resumes.fetch_add(1, Ordering::SeqCst);
        }

        fn write_message(&self, message: Message, _readiness: &SendReadiness) -> Result<bool> {
            let mut written = self.written.lock();
            if self.fail_on == Some(written.len()) {
                return Err(Error::transport("connection reset"));
            }
            written.push(message);
            Ok(true)
        }

        fn close(&self, status: CloseStatus) -> Result<()> {
            self.closes.lock().push(status);
            Ok(())
        }
    }

    fn session(transport: RecordingTransport) -> Session<RecordingTransport> {
        SessionBuilder::new()
            .handshake(HandshakeInfo::new(
                Url::parse("ws://localhost/chat").expect("valid url"),
            ))
            .build(transport)
            .expect("valid session")
    }

    fn suspendable() -> RecordingTransport {
        RecordingTransport {
            suspendable: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_message_factories_use_buffer_factory() {
        let session = session(suspendable());

        let text = session.text_message("hi");
        assert_eq!(text.message_type(), MessageType::Text);
        assert_eq!(text.payload_as_text(), "hi");

        let binary = session.binary_message(|buf| buf.extend_from_slice(&[1, 2, 3]));
        assert_eq!(binary.message_type(), MessageType::Binary);
        assert_eq!(binary.len(), 3);

        assert!(session.ping_message(|_| {}).is_empty());
        assert_eq!(session.pong_message(|_| {}).message_type(), MessageType::Pong);
    }

    #[test]
    fn test_receive_returns_same_stream() {
        let session = session(suspendable());
        let first = session.receive();
        let second = session.receive();

        session.on_message(Message::text("shared"));
        assert!(second.try_next().expect("open").into_message().is_some());
        assert!(matches!(first.try_next().expect("open"), TryNext::Empty));
    }

    #[tokio::test]
    async fn test_second_send_fails_without_affecting_first() {
        let session = session(suspendable());

        let first = session.send(stream::iter(vec![Message::text("a"), Message::text("b")]));
        let second = session.send(stream::iter(vec![Message::text("x")]));

        let err = second.await.expect_err("second send");
        assert!(matches!(err, Error::IllegalState { .. }));
        assert_eq!(session.outbound_state(), OutboundState::Sending);

        first.await.expect("first send");
        let written: Vec<_> = session
            .transport()
            .written
            .lock()
            .iter()
            .map(|m| m.payload_as_text().into_owned())
            .collect();
        assert_eq!(written, ["a", "b"]);
        assert_eq!(session.outbound_state(), OutboundState::Completed);
    }

    #[tokio::test]
    async fn test_send_success_closes_normally() {
        let (tx, rx) = oneshot::channel();
        let session = SessionBuilder::new()
            .handshake(HandshakeInfo::new(
                Url::parse("ws://localhost/chat").expect("valid url"),
            ))
            .completion(tx)
            .build(suspendable())
            .expect("valid session");

        session
            .send(stream::iter(vec![Message::text("done")]))
            .await
            .expect("send");

        assert!(rx.await.expect("completion").is_ok());
        assert_eq!(*session.transport().closes.lock(), [CloseStatus::NORMAL]);
        assert!(!session.is_open());
    }

    #[tokio::test]
    async fn test_send_failure_closes_with_server_error() {
        let (tx, rx) = oneshot::channel();
        let session = SessionBuilder::new()
            .handshake(HandshakeInfo::new(
                Url::parse("ws://localhost/chat").expect("valid url"),
            ))
            .completion(tx)
            .build(RecordingTransport {
                suspendable: true,
                fail_on: Some(0),
                ..Default::default()
            })
            .expect("valid session");

        let err = session
            .send(stream::iter(vec![Message::text("boom")]))
            .await
            .expect_err("write fails");
        assert!(err.is_transport_error());

        assert!(rx.await.expect("completion").is_err());

        let closes = session.transport().closes.lock().clone();
        assert_eq!(closes.len(), 1);
        assert!(closes[0].equals_code(&CloseStatus::SERVER_ERROR));
        assert_eq!(closes[0].reason(), Some("Transport error: connection reset"));

        let mut inbound = session.receive();
        let item = inbound.next().await;
        assert!(matches!(item, Some(Err(Error::Transport { .. }))));
    }

    #[tokio::test]
    async fn test_failure_finalizes_without_close_on_send_complete() {
        let (tx, rx) = oneshot::channel();
        let session = SessionBuilder::new()
            .handshake(HandshakeInfo::new(
                Url::parse("ws://localhost/chat").expect("valid url"),
            ))
            .completion(tx)
            .options(SessionOptions::new().with_close_on_send_complete(false))
            .build(RecordingTransport {
                suspendable: true,
                fail_on: Some(0),
                ..Default::default()
            })
            .expect("valid session");

        let err = session
            .send(stream::iter(vec![Message::text("boom")]))
            .await
            .expect_err("write fails");
        assert!(err.is_transport_error());

        let outcome = rx.await.expect("completion resolved");
        assert!(matches!(outcome, Err(Error::Transport { .. })));

        let closes = session.transport().closes.lock().clone();
        assert_eq!(closes.len(), 1);
        assert!(closes[0].equals_code(&CloseStatus::SERVER_ERROR));

        let inbound = session.receive();
        let err = inbound.try_next().expect_err("inbound failed");
        assert!(matches!(err, Error::Transport { .. }));

        // Nothing further reaches the transport.
        session.on_transport_close(CloseStatus::NORMAL);
        assert_eq!(session.transport().closes.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_success_without_close_on_send_complete_stays_open() {
        let (tx, rx) = oneshot::channel();
        let session = SessionBuilder::new()
            .handshake(HandshakeInfo::new(
                Url::parse("ws://localhost/chat").expect("valid url"),
            ))
            .completion(tx)
            .options(SessionOptions::new().with_close_on_send_complete(false))
            .build(suspendable())
            .expect("valid session");

        session
            .send(stream::iter(vec![Message::text("done")]))
            .await
            .expect("send");

        assert!(rx.await.expect("completion resolved").is_ok());
        assert!(session.transport().closes.lock().is_empty());
        assert!(session.is_open());

        session.on_message(Message::text("still reading"));
        let message = session
            .receive()
            .try_next()
            .expect("open")
            .into_message()
            .expect("message");
        assert_eq!(message.payload_as_text(), "still reading");
    }

    #[tokio::test]
    async fn test_concurrent_send_attaches_once() {
        for _ in 0..32 {
            let session = session(suspendable());
            let barrier = Arc::new(std::sync::Barrier::new(2));

            let callers: Vec<_> = (0..2)
                .map(|i| {
                    let session = session.clone();
                    let barrier = Arc::clone(&barrier);
                    std::thread::spawn(move || {
                        barrier.wait();
                        session.send(stream::iter(vec![Message::text(format!("t{i}"))]))
                    })
                })
                .collect();

            let completions: Vec<SendCompletion> = callers
                .into_iter()
                .map(|caller| caller.join().expect("caller thread"))
                .collect();
            let results = futures_util::future::join_all(completions).await;

            let attached = results.iter().filter(|r| r.is_ok()).count();
            let rejected = results
                .iter()
                .filter(|r| matches!(r, Err(Error::IllegalState { .. })))
                .count();
            assert_eq!((attached, rejected), (1, 1));
            assert_eq!(session.transport().written.lock().len(), 1);
            assert_eq!(session.outbound_state(), OutboundState::Completed);
        }
    }

    #[test]
    fn test_transport_close_completes_outbound() {
        let session = session(suspendable());
        let mut send = task::spawn(session.send(stream::pending::<Message>()));
        assert_pending!(send.poll());

        session.on_transport_close(CloseStatus::GOING_AWAY);
        assert!(send.is_woken());
        assert!(assert_ready!(send.poll()).is_ok());

        // Remote close already happened; no local close frame.
        assert!(session.transport().closes.lock().is_empty());
        let inbound = session.receive();
        assert!(inbound.try_next().expect("end delivered once").is_ended());
        assert!(inbound.try_next().expect_err("past the end").is_protocol_violation());
    }

    #[test]
    fn test_transport_error_fails_both_directions() {
        let session = session(suspendable());
        let mut send = task::spawn(session.send(stream::pending::<Message>()));
        assert_pending!(send.poll());

        session.on_transport_error(Error::transport("reset by peer"));
        let result = assert_ready!(send.poll());
        assert!(matches!(result, Err(Error::Transport { .. })));

        let mut inbound = task::spawn(session.receive());
        let item = assert_ready!(inbound.poll_next());
        assert!(matches!(item, Some(Err(Error::Transport { .. }))));

        let closes = session.transport().closes.lock().clone();
        assert_eq!(closes.len(), 1);
        assert!(closes[0].equals_code(&CloseStatus::SERVER_ERROR));
    }

    #[tokio::test]
    async fn test_send_after_transport_close_completes_immediately() {
        let session = session(suspendable());
        session.on_transport_close(CloseStatus::NORMAL);

        session
            .send(stream::iter(vec![Message::text("late")]))
            .await
            .expect("completes");
        assert!(session.transport().written.lock().is_empty());
    }

    #[tokio::test]
    async fn test_close_without_outbound_resolves_completion() {
        let (tx, rx) = oneshot::channel();
        let session = SessionBuilder::new()
            .handshake(HandshakeInfo::new(
                Url::parse("ws://localhost/chat").expect("valid url"),
            ))
            .completion(tx)
            .build(suspendable())
            .expect("valid session");

        session.on_transport_close(CloseStatus::NORMAL);
        assert!(rx.await.expect("completion").is_ok());
    }

    #[tokio::test]
    async fn test_run_handler_observes_result() {
        let session = session(suspendable());
        let handler_session = session.clone();

        let result = session
            .run_handler(async move {
                let mut inbound = handler_session.receive();
                handler_session.on_message(Message::text("ping"));
                let message = inbound.next().await.expect("message").expect("no error");
                assert_eq!(message.payload_as_text(), "ping");
                Err(Error::transport("handler gave up"))
            })
            .await;

        assert!(result.is_err());
        let closes = session.transport().closes.lock().clone();
        assert_eq!(closes[0].reason(), Some("Transport error: handler gave up"));
    }

    #[test]
    fn test_close_is_idempotent() {
        let session = session(suspendable());
        session.close().expect("close");
        session
            .close_with_status(CloseStatus::GOING_AWAY)
            .expect("second close is a no-op");

        assert_eq!(*session.transport().closes.lock(), [CloseStatus::NORMAL]);
    }

    #[test]
    fn test_flow_control_counts() {
        let session = session(suspendable());
        let inbound = session.receive();

        for i in 0..5 {
            session.on_message(Message::text(i.to_string()));
            inbound
                .try_next()
                .expect("open")
                .into_message()
                .expect("message");
        }

        assert_eq!(session.transport().suspends.load(Ordering::SeqCst), 5);
        assert_eq!(session.transport().resumes.load(Ordering::SeqCst), 5);
    }
}
