use std::sync::Arc;
use tokio::sync::Mutex;

/// Per-client session state. Created once at client construction and kept
/// across reconnects so an interrupted session can be resumed; only an
/// explicit non-resumable verdict clears it.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    session_id: Option<String>,
    last_sequence: Option<u64>,
    reconnect_attempts: u32,
}

impl SessionState {
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn last_sequence(&self) -> Option<u64> {
        self.last_sequence
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    /// Records the sequence number of a DISPATCH payload. The sequence is
    /// monotonically non-decreasing while a connection is live; a stale
    /// number never rolls it back.
    pub fn record_sequence(&mut self, seq: u64) {
        if self.last_sequence.is_none_or(|last| seq > last) {
            self.last_sequence = Some(seq);
        }
    }

    /// A READY dispatch confirmed a fresh session: capture its id and reset
    /// the reconnect counter.
    pub fn capture_ready(&mut self, session_id: String) {
        self.session_id = Some(session_id);
        self.reconnect_attempts = 0;
    }

    /// Counts a connection-establishment failure or ack-timeout disconnect.
    /// Returns the new attempt count.
    pub fn record_connect_failure(&mut self) -> u32 {
        self.reconnect_attempts += 1;
        self.reconnect_attempts
    }

    /// The session is no longer resumable; the next connect must IDENTIFY.
    pub fn invalidate(&mut self) {
        self.session_id = None;
    }
}

/// Shared handle to a client's [`SessionState`]. All mutation goes through
/// the lock, so the inbound-frame path, the heartbeat timer, and the
/// reconnect path never observe a torn read.
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    inner: Arc<Mutex<SessionState>>,
}

impl SharedSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one transactional read/update against the state.
    pub async fn with<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = self.inner.lock().await;
        f(&mut state)
    }

    pub async fn snapshot(&self) -> SessionState {
        self.inner.lock().await.clone()
    }

    pub async fn last_sequence(&self) -> Option<u64> {
        self.inner.lock().await.last_sequence()
    }

    pub async fn reconnect_attempts(&self) -> u32 {
        self.inner.lock().await.reconnect_attempts()
    }

    pub async fn record_connect_failure(&self) -> u32 {
        self.inner.lock().await.record_connect_failure()
    }

    pub async fn invalidate(&self) {
        self.inner.lock().await.invalidate();
    }
}
