//! Caller-side handle of a running session.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

use super::session::SessionState;
use crate::types::JobLogRef;

/// Handle to a session started by [`LogStreamClient::open_stream`](crate::LogStreamClient::open_stream).
///
/// Cloning shares the same session. Dropping every clone without calling
/// [`cancel`](Self::cancel) detaches the session: it runs to its natural end
/// and keeps reporting to its sink.
#[derive(Clone)]
pub struct StreamHandle {
    id: Uuid,
    job: JobLogRef,
    cancel_tx: Arc<watch::Sender<bool>>,
    state_rx: watch::Receiver<SessionState>,
}

impl StreamHandle {
    pub(crate) fn new(
        id: Uuid,
        job: JobLogRef,
        cancel_tx: watch::Sender<bool>,
        state_rx: watch::Receiver<SessionState>,
    ) -> Self {
        Self {
            id,
            job,
            cancel_tx: Arc::new(cancel_tx),
            state_rx,
        }
    }

    /// Session ID, also recorded on the session's tracing span.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The job being streamed.
    pub fn job(&self) -> JobLogRef {
        self.job
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state_rx.borrow().clone()
    }

    /// Returns true once the session reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.state_rx.borrow().is_terminal()
    }

    /// Requests cancellation.
    ///
    /// Idempotent, and a no-op once the session is terminal.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    /// Waits for the terminal state and returns it.
    ///
    /// The sink has received its final callback by the time this resolves.
    pub async fn wait(&self) -> SessionState {
        let mut rx = self.state_rx.clone();
        let terminal = rx.wait_for(SessionState::is_terminal).await.map(|s| s.clone());
        match terminal {
            Ok(state) => state,
            // The session task is gone without publishing a terminal state.
            Err(_) => rx.borrow().clone(),
        }
    }

    /// Cancels and waits for the terminal state.
    pub async fn cancel_and_wait(&self) -> SessionState {
        self.cancel();
        self.wait().await
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle")
            .field("id", &self.id)
            .field("job", &self.job)
            .field("state", &self.state_rx.borrow().name())
            .finish()
    }
}
