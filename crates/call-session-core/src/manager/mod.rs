//! Call Session Manager
//!
//! Owns the single live [`CallSession`] for the local user and drives it
//! through the transition table in [`crate::state_table`].
//!
//! Every state mutation happens under one async mutex, so events are
//! applied one at a time. Local actions ([`accept`](CallSessionManager::accept),
//! [`end_call`](CallSessionManager::end_call), ...) and inbound signals are
//! applied by the caller's task; peer transport hooks, surface closures and
//! timer fires go through an ordered input queue drained by a driver task.
//!
//! Device acquisition is the only step that waits on the user. It runs
//! outside the lock and re-checks the session when it completes; a handle
//! acquired for a session that was ended or replaced meanwhile is released
//! immediately.

mod actions;
pub mod builder;
pub mod events;
mod executor;
mod guards;
mod inbound;
mod session;

pub use builder::CallSessionManagerBuilder;
pub use events::{CallEvent, ProcessEventResult};

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::CallConfig;
use crate::errors::{CallError, Result};
use crate::peer::{PeerConfig, PeerTransportFactory, TransportEvent};
use crate::resource_guard::ResourceGuard;
use crate::signaling::{InboundSignal, SignalMessage, SignalingBridge};
use crate::state_table::{EventType, MasterStateTable};
use crate::surface::SecondarySurface;
use crate::types::{CallDirection, CallSnapshot, CallState, MediaKind, SessionId, UserId};
use session::CallSession;

/// Inputs delivered to the driver task
#[derive(Debug)]
pub(crate) enum ManagerInput {
    Transport { session_id: SessionId, event: TransportEvent },
    SurfaceClosed { session_id: SessionId },
    RingTimeout { session_id: SessionId },
    NegotiationTimeout { session_id: SessionId },
}

#[derive(Default)]
pub(crate) struct ManagerState {
    /// The session that is not yet ended, if any
    current: Option<CallSession>,
    /// Snapshot of the most recently ended session
    last: Option<CallSnapshot>,
}

/// Device acquisition requested by an `AcquireMedia` action
#[derive(Debug, Clone)]
pub(crate) struct PendingAcquisition {
    session_id: SessionId,
    ticket: u64,
    kind: MediaKind,
}

pub(crate) struct Inner {
    config: CallConfig,
    peer_config: PeerConfig,
    local_user: UserId,
    table: Arc<MasterStateTable>,
    guard: Arc<ResourceGuard>,
    peer_factory: Arc<dyn PeerTransportFactory>,
    bridge: SignalingBridge,
    surface: Arc<dyn SecondarySurface>,
    state: Mutex<ManagerState>,
    events: broadcast::Sender<CallEvent>,
    input_tx: mpsc::UnboundedSender<ManagerInput>,
    next_ticket: AtomicU64,
}

/// Manages the call lifecycle for one local user
#[derive(Clone)]
pub struct CallSessionManager {
    inner: Arc<Inner>,
}

impl CallSessionManager {
    pub fn builder() -> CallSessionManagerBuilder {
        CallSessionManagerBuilder::new()
    }

    pub fn local_user(&self) -> &UserId {
        &self.inner.local_user
    }

    pub fn config(&self) -> &CallConfig {
        &self.inner.config
    }

    /// The guard tracking this manager's capture device handles
    pub fn resource_guard(&self) -> &Arc<ResourceGuard> {
        &self.inner.guard
    }

    /// Ring a remote user
    ///
    /// Fails with [`CallError::CallInProgress`] while another call is live.
    pub async fn start_call(&self, remote: impl Into<UserId>, kind: MediaKind) -> Result<SessionId> {
        let remote = remote.into();
        let mut st = self.inner.state.lock().await;
        if let Some(current) = st.current.as_ref() {
            warn!("Refusing call to {}: call {} is in progress", remote, current.id);
            return Err(CallError::CallInProgress {
                session_id: current.id.clone(),
            });
        }

        let session = CallSession::new(
            self.inner.local_user.clone(),
            remote,
            CallDirection::Outgoing,
            kind,
            self.inner.config.history_limit,
        );
        let session_id = session.id.clone();
        info!("Starting {} call {} to {}", kind, session_id, session.remote_user_id);
        st.current = Some(session);

        let outcome = self.inner.drive(&mut st, EventType::StartCall, None).await;
        if !outcome.result.transition_applied {
            st.current = None;
            return Err(CallError::Internal(format!("no StartCall transition for session {}", session_id)));
        }
        Ok(session_id)
    }

    /// Accept the ringing incoming call
    ///
    /// Waits for the capture devices. On device failure the session ends
    /// and the device error is returned.
    pub async fn accept(&self) -> Result<ProcessEventResult> {
        let outcome = {
            let mut st = self.inner.state.lock().await;
            self.inner.drive(&mut st, EventType::AcceptCall, None).await
        };
        log_ignored(EventType::AcceptCall, &outcome.result);

        let mut result = outcome.result;
        for pending in outcome.acquisitions {
            result = self.inner.run_acquisition(pending).await?;
        }
        Ok(result)
    }

    /// Decline the ringing incoming call
    pub async fn reject(&self) -> Result<ProcessEventResult> {
        Ok(self.local_action(EventType::RejectCall).await)
    }

    /// Hang up (or cancel) the current call
    pub async fn end_call(&self) -> Result<ProcessEventResult> {
        Ok(self.local_action(EventType::EndCall).await)
    }

    /// End any live call; used when the hosting application unloads
    pub async fn shutdown(&self) -> ProcessEventResult {
        info!("Shutting down call session manager for {}", self.inner.local_user);
        self.local_action(EventType::Shutdown).await
    }

    pub async fn handle_signal(&self, signal: InboundSignal) -> ProcessEventResult {
        self.inner.handle_signal(signal).await
    }

    /// Decode a raw JSON signaling frame and apply it
    pub async fn handle_raw_signal(&self, raw: &str) -> Result<ProcessEventResult> {
        let message = SignalingBridge::decode(raw)?;
        Ok(self.handle_message(message).await)
    }

    /// Apply a wire message, dropping it if it is not addressed to us
    pub async fn handle_message(&self, message: SignalMessage) -> ProcessEventResult {
        match self.inner.bridge.translate(message) {
            Some(signal) => self.handle_signal(signal).await,
            None => {
                let st = self.inner.state.lock().await;
                let session = st.current.as_ref();
                ProcessEventResult::ignored(
                    session.map(|s| s.id.clone()),
                    session.map(|s| s.state).unwrap_or(CallState::Idle),
                )
            }
        }
    }

    /// Feed frames from the signaling relay to the manager in arrival order
    pub fn attach_inbound(&self, mut rx: mpsc::Receiver<SignalMessage>) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                manager.handle_message(message).await;
            }
            debug!("Inbound signaling channel closed");
        })
    }

    /// Like [`attach_inbound`](Self::attach_inbound) for raw JSON frames
    ///
    /// Malformed frames are logged and dropped.
    pub fn attach_raw_inbound(&self, mut rx: mpsc::Receiver<String>) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            while let Some(raw) = rx.recv().await {
                if let Err(e) = manager.handle_raw_signal(&raw).await {
                    warn!("Dropping signaling frame: {}", e);
                }
            }
            debug!("Inbound signaling channel closed");
        })
    }

    /// State of the current session, `Idle` when there is none
    pub async fn current_state(&self) -> CallState {
        let st = self.inner.state.lock().await;
        st.current.as_ref().map(|s| s.state).unwrap_or(CallState::Idle)
    }

    pub async fn current_session(&self) -> Option<CallSnapshot> {
        let st = self.inner.state.lock().await;
        st.current.as_ref().map(|s| s.snapshot())
    }

    /// The most recently ended session
    pub async fn last_session(&self) -> Option<CallSnapshot> {
        let st = self.inner.state.lock().await;
        st.last.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CallEvent> {
        self.inner.events.subscribe()
    }

    async fn local_action(&self, event: EventType) -> ProcessEventResult {
        let mut st = self.inner.state.lock().await;
        let outcome = self.inner.drive(&mut st, event, None).await;
        log_ignored(event, &outcome.result);
        outcome.result
    }
}

fn log_ignored(event: EventType, result: &ProcessEventResult) {
    if !result.transition_applied {
        info!("{} ignored in state {}", event.type_name(), result.old_state);
    }
}
