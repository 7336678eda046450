//! Per-connection session handling.
//!
//! Each accepted socket becomes one [`ConnectionSession`] running on its
//! own task. The read half is driven through [`VoungCodec`]; the write half
//! lives in a shared [`SessionHandle`] so that the read loop's responses and
//! gateway commands from other tasks are written one whole frame at a time.
//!
//! ```text
//! socket read ─> VoungCodec ─> FrameEvent ─> CommandDispatcher
//!                                                  │ Option<Frame>
//! gateway ───────────────┐                         v
//!                        └──> SessionHandle::send (async mutex) ─> socket write
//! ```

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;
use voung_core::DeviceId;
use voung_protocol::{Frame, FrameEvent, VoungCodec};
use voung_storage::BoardStore;

use crate::dispatcher::CommandDispatcher;

/// Boxed write half of a connection.
pub type SessionWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Lifecycle of a session. A session may stay `New` until it closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    New,
    Registered,
    Closed,
}

/// Errors raised while writing to a session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session is closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encode error: {0}")]
    Encode(#[from] voung_core::Error),
}

#[derive(Debug)]
struct SessionMeta {
    state: SessionState,
    device_id: Option<DeviceId>,
    board_address: Option<u8>,
    last_activity: DateTime<Utc>,
}

/// Shared handle to one live connection.
///
/// The handle is what the registry stores and what the gateway writes
/// through. Metadata sits behind a `std::sync::Mutex` that is never held
/// across an `.await`; the writer sits behind a `tokio::sync::Mutex` so a
/// frame is always written whole.
pub struct SessionHandle {
    id: Uuid,
    peer: SocketAddr,
    created_at: DateTime<Utc>,
    writer: tokio::sync::Mutex<SessionWriter>,
    cancel: CancellationToken,
    meta: Mutex<SessionMeta>,
}

impl SessionHandle {
    pub fn new(peer: SocketAddr, writer: SessionWriter, cancel: CancellationToken) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            peer,
            created_at: now,
            writer: tokio::sync::Mutex::new(writer),
            cancel,
            meta: Mutex::new(SessionMeta {
                state: SessionState::New,
                device_id: None,
                board_address: None,
                last_activity: now,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> SessionState {
        self.meta().state
    }

    pub fn is_closed(&self) -> bool {
        self.state() == SessionState::Closed || self.cancel.is_cancelled()
    }

    /// Device identifier assigned at registration
    pub fn device_id(&self) -> Option<DeviceId> {
        self.meta().device_id.clone()
    }

    /// Board address learned at registration
    pub fn board_address(&self) -> Option<u8> {
        self.meta().board_address
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.meta().last_activity
    }

    pub fn touch(&self) {
        self.meta().last_activity = Utc::now();
    }

    /// Record a successful registration.
    ///
    /// A closed session stays closed; the identity is still recorded so
    /// teardown can find its registry entry.
    pub fn mark_registered(&self, device_id: DeviceId, board_address: u8) {
        let mut meta = self.meta();
        meta.device_id = Some(device_id);
        meta.board_address = Some(board_address);
        if meta.state != SessionState::Closed {
            meta.state = SessionState::Registered;
        }
    }

    /// Close the session from outside its read loop.
    ///
    /// The read loop notices the cancellation and performs teardown.
    /// Idempotent.
    pub fn close(&self) {
        self.meta().state = SessionState::Closed;
        self.cancel.cancel();
    }

    /// Write `bytes` to the peer as one unit.
    ///
    /// The write runs on its own task, so a caller that stops waiting (for
    /// example on a timeout) never leaves half a frame on the socket; the
    /// frame still goes out whole before the next one. Concurrent callers
    /// are serialized. Only a close interrupts a pending write.
    pub async fn send(self: &Arc<Self>, bytes: Bytes) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }

        let session = Arc::clone(self);
        let write = tokio::spawn(async move { session.write_whole(&bytes).await });
        write
            .await
            .map_err(|e| SessionError::Io(std::io::Error::other(e)))?
    }

    /// Encode and send a frame.
    pub async fn send_frame(self: &Arc<Self>, frame: &Frame) -> Result<(), SessionError> {
        let bytes = frame.encode()?;
        self.send(bytes).await
    }

    async fn write_whole(&self, bytes: &[u8]) -> Result<(), SessionError> {
        let mut writer = self.writer.lock().await;
        if self.is_closed() {
            return Err(SessionError::Closed);
        }

        tokio::select! {
            _ = self.cancel.cancelled() => Err(SessionError::Closed),
            result = async {
                writer.write_all(bytes).await?;
                writer.flush().await
            } => result.map_err(SessionError::from),
        }
    }

    async fn shutdown_writer(&self) {
        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.shutdown().await {
            trace!(session = %self.id, error = %e, "Writer shutdown failed");
        }
    }

    fn meta(&self) -> MutexGuard<'_, SessionMeta> {
        // Metadata stays consistent even if a holder panicked.
        self.meta.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("meta", &*self.meta())
            .finish()
    }
}

/// Owner of one accepted socket's read half.
pub struct ConnectionSession<R, S> {
    handle: Arc<SessionHandle>,
    reader: R,
    dispatcher: Arc<CommandDispatcher<S>>,
}

impl<R, S> ConnectionSession<R, S>
where
    R: AsyncRead + Send + Unpin + 'static,
    S: BoardStore,
{
    pub fn new(
        reader: R,
        handle: Arc<SessionHandle>,
        dispatcher: Arc<CommandDispatcher<S>>,
    ) -> Self {
        Self {
            handle,
            reader,
            dispatcher,
        }
    }

    pub fn handle(&self) -> Arc<SessionHandle> {
        self.handle.clone()
    }

    /// Run the read loop until the peer disconnects, a read or write
    /// fails, or the session is closed; then tear the session down.
    pub async fn run(self) {
        let Self {
            handle,
            reader,
            dispatcher,
        } = self;

        debug!(session = %handle.id(), peer = %handle.peer(), "Session started");

        let mut framed = FramedRead::new(reader, VoungCodec::new());
        let cancel = handle.cancel.clone();

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(session = %handle.id(), "Session closed locally");
                    break;
                }
                event = framed.next() => event,
            };

            match event {
                None => {
                    debug!(session = %handle.id(), peer = %handle.peer(), "Peer disconnected");
                    break;
                }
                Some(Err(e)) => {
                    warn!(session = %handle.id(), peer = %handle.peer(), error = %e, "Read failed");
                    break;
                }
                Some(Ok(event)) => {
                    handle.touch();
                    if let Err(e) = handle_event(&handle, &dispatcher, event).await {
                        warn!(session = %handle.id(), peer = %handle.peer(), error = %e, "Write failed");
                        break;
                    }
                }
            }
        }

        teardown(&handle, &dispatcher).await;
    }
}

async fn handle_event<S: BoardStore>(
    handle: &Arc<SessionHandle>,
    dispatcher: &CommandDispatcher<S>,
    event: FrameEvent,
) -> Result<(), SessionError> {
    match event {
        FrameEvent::Frame(frame) => {
            trace!(session = %handle.id(), frame = %frame, "Frame received");
            if let Some(response) = dispatcher.dispatch(handle, &frame).await {
                handle.send_frame(&response).await?;
            }
        }
        FrameEvent::Malformed(reason) => {
            warn!(session = %handle.id(), peer = %handle.peer(), reason = %reason, "Malformed frame discarded");
        }
        FrameEvent::Discarded { len } => {
            debug!(session = %handle.id(), peer = %handle.peer(), bytes = len, "Discarded bytes while resynchronizing");
        }
    }
    Ok(())
}

async fn teardown<S: BoardStore>(handle: &Arc<SessionHandle>, dispatcher: &CommandDispatcher<S>) {
    handle.close();
    handle.shutdown_writer().await;

    let Some(device_id) = dispatcher.registry().unregister_by_session(handle) else {
        debug!(session = %handle.id(), peer = %handle.peer(), "Session ended");
        return;
    };

    info!(device_id = %device_id, session = %handle.id(), peer = %handle.peer(), "Device disconnected");

    let store = dispatcher.store();
    tokio::spawn(async move {
        match store.mark_board_offline(&device_id).await {
            Ok(true) => debug!(device_id = %device_id, "Board marked offline"),
            Ok(false) => debug!(device_id = %device_id, "No stored board to mark offline"),
            Err(e) => warn!(device_id = %device_id, error = %e, "Failed to mark board offline"),
        }
    });
}
