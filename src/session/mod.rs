use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::core::domain::{
    CompletionEvent, EventKind, SessionId, SessionRecord, SessionState, TransferRequest,
    TransferResult,
};
use crate::core::error::{SendFileError, err_code};
use crate::core::traits::Transport;
use crate::events::{EventDispatcher, ListenerId};

/// Resolves with the integer status code of one session once it reaches a
/// terminal state. The future-style half of the dual calling convention.
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    rx: oneshot::Receiver<i32>,
}

impl SessionHandle {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Wait for the session to finish. A dropped worker counts as an
    /// internal failure rather than a hang.
    pub async fn wait(self) -> i32 {
        self.rx.await.unwrap_or(err_code::INTERNAL)
    }
}

/// Orchestrates transfer sessions and notifies listeners on completion.
///
/// One `initiate` call is one outbound session: validated synchronously,
/// delegated to the [`Transport`], tracked through
/// `Created -> InProgress -> {Completed | Failed}`, and announced with exactly
/// one `sendFinished` event. Inbound completions reported by the transport
/// side come in through [`report_received`](Self::report_received) and are
/// announced as `receiveFinished`.
///
/// The manager is cheaply cloneable; clones share the session registry and
/// the listener table.
#[derive(Clone)]
pub struct TransferSessionManager {
    transport: Arc<dyn Transport>,
    dispatcher: Arc<EventDispatcher>,
    sessions: Arc<RwLock<HashMap<SessionId, SessionRecord>>>,
}

impl TransferSessionManager {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            dispatcher: Arc::new(EventDispatcher::new()),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Start an outbound session, future-style.
    ///
    /// Fails synchronously for shape-invalid requests; no session is created
    /// and no event will ever be emitted for the call. On success the
    /// returned handle resolves with the terminal status code.
    pub fn initiate(&self, request: TransferRequest) -> Result<SessionHandle, SendFileError> {
        request.validate()?;

        let record = SessionRecord::new(&request);
        let id = record.id.clone();
        info!(session = %id, device = %request.device_id, files = request.file_count, "session created");
        self.sessions
            .write()
            .unwrap()
            .insert(id.clone(), record);

        let (tx, rx) = oneshot::channel();
        self.spawn_worker(id.clone(), request, tx);

        Ok(SessionHandle { id, rx })
    }

    /// Start an outbound session, callback-style.
    ///
    /// Identical semantics to [`initiate`](Self::initiate): same validation,
    /// same timing, same status codes, driven by the same completion signal.
    pub fn initiate_with_callback<F>(
        &self,
        request: TransferRequest,
        callback: F,
    ) -> Result<SessionId, SendFileError>
    where
        F: FnOnce(i32) + Send + 'static,
    {
        let handle = self.initiate(request)?;
        let id = handle.id.clone();
        tokio::spawn(async move {
            callback(handle.wait().await);
        });
        Ok(id)
    }

    fn spawn_worker(
        &self,
        id: SessionId,
        request: TransferRequest,
        done: oneshot::Sender<i32>,
    ) {
        let manager = self.clone();
        tokio::spawn(async move {
            manager.set_state(&id, SessionState::InProgress);

            let code = match manager.transport.send(&request).await {
                Ok(()) => err_code::NO_ERROR,
                Err(e) => {
                    warn!(session = %id, error = %e, "transport reported failure");
                    e.err_code()
                }
            };

            let result = if code == err_code::NO_ERROR {
                manager.set_state(&id, SessionState::Completed);
                TransferResult::sent(request.file_count)
            } else {
                manager.set_state(&id, SessionState::Failed { code });
                TransferResult::failure(code)
            };

            // Emit before resolving the handle so a caller awaiting the
            // result observes its own completion event as already delivered.
            manager
                .dispatcher
                .emit(&CompletionEvent::new(EventKind::SendFinished, result));

            if done.send(code).is_err() {
                info!(session = %id, "session caller dropped before completion");
            }
        });
    }

    fn set_state(&self, id: &SessionId, state: SessionState) {
        let mut sessions = self.sessions.write().unwrap();
        if let Some(record) = sessions.get_mut(id) {
            if record.state.is_terminal() {
                error!(session = %id, "attempted state change on terminal session");
                return;
            }
            if state.is_terminal() {
                record.completed_at = Some(SystemTime::now());
            }
            record.state = state;
        }
    }

    /// Announce an inbound completion reported by the transport side.
    /// Emits exactly one `receiveFinished` event.
    pub fn report_received(&self, result: TransferResult) {
        info!(
            err_code = result.err_code,
            files = result.file_count,
            "inbound transfer finished"
        );
        self.dispatcher
            .emit(&CompletionEvent::new(EventKind::ReceiveFinished, result));
    }

    /// Drain a channel of inbound completion reports into
    /// [`report_received`](Self::report_received). The pump stops when every
    /// sender is dropped.
    pub fn spawn_inbound_pump(
        &self,
        mut rx: mpsc::UnboundedReceiver<TransferResult>,
    ) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            while let Some(result) = rx.recv().await {
                manager.report_received(result);
            }
        })
    }

    /// Register a completion listener; see [`EventDispatcher::subscribe`]
    pub fn subscribe<F>(&self, kind: EventKind, callback: F) -> ListenerId
    where
        F: Fn(&TransferResult) + Send + Sync + 'static,
    {
        self.dispatcher.subscribe(kind, callback)
    }

    /// Remove one listener, or all listeners of a kind when `id` is `None`
    pub fn unsubscribe(&self, kind: EventKind, id: Option<ListenerId>) {
        self.dispatcher.unsubscribe(kind, id);
    }

    pub fn session_state(&self, id: &SessionId) -> Option<SessionState> {
        let sessions = self.sessions.read().unwrap();
        sessions.get(id).map(|record| record.state.clone())
    }

    /// Drop every terminal session record from the registry, returning how
    /// many were removed. Long-lived callers run this periodically so the
    /// registry tracks only live sessions.
    pub fn prune_terminal(&self) -> usize {
        let mut sessions = self.sessions.write().unwrap();
        let before = sessions.len();
        sessions.retain(|_, record| !record.state.is_terminal());
        before - sessions.len()
    }

    pub fn active_sessions(&self) -> Vec<SessionRecord> {
        let sessions = self.sessions.read().unwrap();
        sessions
            .values()
            .filter(|record| !record.state.is_terminal())
            .cloned()
            .collect()
    }
}
