use crate::ws::protocol::{ClientVoices, ServerMessage};
use anyhow::{Context, Result, anyhow};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// The narration side of one WebSocket connection.
///
/// Audio is produced in the browser, so every backend that "plays" something
/// sends a request down the socket and waits for the client to acknowledge it
/// with `narration_finished`.
pub struct ClientLink {
    outbound: mpsc::UnboundedSender<ServerMessage>,
    voices: ClientVoices,
    pending: Mutex<HashMap<u64, oneshot::Sender<()>>>,
    next_id: AtomicU64,
    // Set while the client may be producing sound we asked for.
    active: AtomicBool,
}

/// Forgets a request whose caller stopped waiting.
struct PendingRequest<'a> {
    link: &'a ClientLink,
    id: u64,
}

impl Drop for PendingRequest<'_> {
    fn drop(&mut self) {
        self.link.pending().remove(&self.id);
    }
}

impl ClientLink {
    pub fn new(outbound: mpsc::UnboundedSender<ServerMessage>, voices: ClientVoices) -> Self {
        Self {
            outbound,
            voices,
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            active: AtomicBool::new(false),
        }
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, HashMap<u64, oneshot::Sender<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn voices(&self) -> ClientVoices {
        self.voices
    }

    pub fn is_connected(&self) -> bool {
        !self.outbound.is_closed()
    }

    pub fn send(&self, msg: ServerMessage) -> Result<()> {
        self.outbound
            .send(msg)
            .map_err(|_| anyhow!("client disconnected"))
    }

    /// Sends the message built for a fresh request id and resolves once the
    /// client acknowledges it, or once `stop` releases it.
    pub async fn request(&self, build: impl FnOnce(u64) -> ServerMessage) -> Result<()> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending().insert(id, tx);
        let _pending = PendingRequest { link: self, id };

        self.active.store(true, Ordering::Release);
        self.send(build(id))?;
        rx.await
            .context("client connection closed before narration finished")
    }

    /// Completes request `id`. Returns `false` for unknown or stale ids.
    pub fn acknowledge(&self, id: u64) -> bool {
        let mut pending = self.pending();
        let Some(tx) = pending.remove(&id) else {
            debug!(id, "Ignoring stale narration acknowledgement");
            return false;
        };
        if pending.is_empty() {
            self.active.store(false, Ordering::Release);
        }
        let _ = tx.send(());
        true
    }

    /// Silences the client and releases every waiting request. Does nothing
    /// if no narration was requested since the last stop.
    pub fn stop(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        let released: Vec<_> = self.pending().drain().map(|(_, tx)| tx).collect();
        debug!(released = released.len(), "Stopping client narration");
        let _ = self.send(ServerMessage::NarrationStop);
        for tx in released {
            let _ = tx.send(());
        }
    }

    /// Fails every waiting request. Used when the socket goes away.
    pub fn close(&self) {
        self.active.store(false, Ordering::Release);
        self.pending().clear();
    }
}
