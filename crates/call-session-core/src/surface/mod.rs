//! Secondary rendering surface
//!
//! A connected call is rendered in a separate window (or view) owned by the
//! host. The manager only holds a weak [`SurfaceHandle`]; closing the
//! surface from the host side is reported back through a
//! [`SurfaceClosedNotifier`] and ends the call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::SurfaceError;
use crate::manager::ManagerInput;
use crate::types::{MediaKind, SessionId, UserId};

/// Parameters the surface is opened with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceParams {
    pub session_id: SessionId,
    pub local_user_id: UserId,
    pub remote_user_id: UserId,
    pub media_kind: MediaKind,
}

/// Opaque host identifier of an open surface
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceHandle(pub String);

impl fmt::Display for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reports a host-side close of a surface to the owning manager
#[derive(Clone)]
pub struct SurfaceClosedNotifier {
    session_id: SessionId,
    handle: SurfaceHandle,
    tx: mpsc::UnboundedSender<ManagerInput>,
}

impl SurfaceClosedNotifier {
    pub(crate) fn new(session_id: SessionId, handle: SurfaceHandle, tx: mpsc::UnboundedSender<ManagerInput>) -> Self {
        Self { session_id, handle, tx }
    }

    pub fn handle(&self) -> &SurfaceHandle {
        &self.handle
    }

    /// Tell the manager the surface was closed
    ///
    /// Late or repeated notifications are ignored by the manager.
    pub fn notify(&self) {
        debug!("Surface {} closed for session {}", self.handle, self.session_id);
        let _ = self.tx.send(ManagerInput::SurfaceClosed {
            session_id: self.session_id.clone(),
        });
    }
}

impl fmt::Debug for SurfaceClosedNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceClosedNotifier")
            .field("session_id", &self.session_id)
            .field("handle", &self.handle)
            .finish()
    }
}

/// Host capability for opening and closing the call surface
#[async_trait]
pub trait SecondarySurface: Send + Sync {
    async fn open(&self, params: SurfaceParams) -> Result<SurfaceHandle, SurfaceError>;

    /// Request the surface close; closing an already closed surface is a no-op
    async fn close(&self, handle: &SurfaceHandle) -> Result<(), SurfaceError>;

    /// Register for host-side close of `handle`
    fn on_closed(&self, handle: &SurfaceHandle, notifier: SurfaceClosedNotifier);
}
