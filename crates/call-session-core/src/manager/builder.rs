//! Builder for [`CallSessionManager`]
//!
//! The manager needs four host capabilities: capture devices, a peer
//! transport factory, the outbound signaling channel and the secondary
//! surface. All are required.
//!
//! ```rust,ignore
//! let manager = CallSessionManagerBuilder::new()
//!     .with_local_user("alice")
//!     .with_config(CallConfig::default().with_ring_timeout_secs(Some(30)))
//!     .with_media_devices(devices)
//!     .with_peer_factory(peer_factory)
//!     .with_signaling(signaling)
//!     .with_surface(surface)
//!     .build()
//!     .await?;
//! ```

use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, info};

use super::{CallSessionManager, Inner, ManagerInput, ManagerState};
use crate::config::CallConfig;
use crate::errors::{CallError, Result};
use crate::peer::{PeerConfig, PeerTransportFactory};
use crate::resource_guard::{MediaDevices, ResourceGuard};
use crate::signaling::{SignalingBridge, SignalingTransport};
use crate::state_table::{MasterStateTable, MASTER_TABLE};
use crate::surface::SecondarySurface;
use crate::types::UserId;

#[derive(Default)]
pub struct CallSessionManagerBuilder {
    config: Option<CallConfig>,
    local_user: Option<UserId>,
    devices: Option<Arc<dyn MediaDevices>>,
    peer_factory: Option<Arc<dyn PeerTransportFactory>>,
    signaling: Option<Arc<dyn SignalingTransport>>,
    surface: Option<Arc<dyn SecondarySurface>>,
    table: Option<Arc<MasterStateTable>>,
}

impl CallSessionManagerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: CallConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_local_user(mut self, user: impl Into<UserId>) -> Self {
        self.local_user = Some(user.into());
        self
    }

    pub fn with_media_devices(mut self, devices: Arc<dyn MediaDevices>) -> Self {
        self.devices = Some(devices);
        self
    }

    pub fn with_peer_factory(mut self, factory: Arc<dyn PeerTransportFactory>) -> Self {
        self.peer_factory = Some(factory);
        self
    }

    pub fn with_signaling(mut self, transport: Arc<dyn SignalingTransport>) -> Self {
        self.signaling = Some(transport);
        self
    }

    pub fn with_surface(mut self, surface: Arc<dyn SecondarySurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    /// Override the transition table; defaults to [`MASTER_TABLE`]
    pub fn with_state_table(mut self, table: Arc<MasterStateTable>) -> Self {
        self.table = Some(table);
        self
    }

    /// Validate the configuration and start the manager's driver task
    ///
    /// Must be called from within a tokio runtime.
    pub async fn build(self) -> Result<CallSessionManager> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let local_user = self.local_user.ok_or(CallError::MissingCollaborator("local user"))?;
        let devices = self.devices.ok_or(CallError::MissingCollaborator("media devices"))?;
        let peer_factory = self.peer_factory.ok_or(CallError::MissingCollaborator("peer transport factory"))?;
        let signaling = self.signaling.ok_or(CallError::MissingCollaborator("signaling transport"))?;
        let surface = self.surface.ok_or(CallError::MissingCollaborator("secondary surface"))?;
        let table = self.table.unwrap_or_else(|| MASTER_TABLE.clone());

        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(config.event_channel_capacity);

        let inner = Arc::new(Inner {
            peer_config: PeerConfig::from(&config),
            guard: Arc::new(ResourceGuard::new(devices, config.sweep_on_release)),
            bridge: SignalingBridge::new(signaling, local_user.clone()),
            config,
            local_user,
            table,
            peer_factory,
            surface,
            state: Mutex::new(ManagerState::default()),
            events,
            input_tx,
            next_ticket: AtomicU64::new(0),
        });

        tokio::spawn(run_driver(Arc::downgrade(&inner), input_rx));
        info!("Call session manager started for {}", inner.local_user);

        Ok(CallSessionManager { inner })
    }
}

/// Drain peer, surface and timer inputs one at a time, in arrival order
async fn run_driver(inner: Weak<Inner>, mut inputs: mpsc::UnboundedReceiver<ManagerInput>) {
    while let Some(input) = inputs.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.handle_input(input).await;
    }
    debug!("Call session driver stopped");
}
