//! Scoped acquisition of capture devices
//!
//! [`ResourceGuard`] hands out [`MediaHandle`]s and keeps a registry of the
//! handles that have not been released yet. Release is idempotent, and a
//! handle that is dropped without release stops its tracks on drop.

use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::devices::{LocalTrack, MediaDevices, TrackKind};
use crate::errors::DeviceError;
use crate::types::MediaKind;

/// Identifier of an acquired media handle
pub type HandleId = u64;

/// State shared between the guard and its outstanding handles
#[derive(Default)]
struct GuardShared {
    /// Outstanding handles and the ids of the tracks they own
    outstanding: DashMap<HandleId, Vec<String>>,
    next_id: AtomicU64,
    acquisitions: AtomicUsize,
    releases: AtomicUsize,
}

impl GuardShared {
    fn finish(&self, id: HandleId, tracks: &[Arc<dyn LocalTrack>]) {
        for track in tracks {
            track.stop();
        }
        self.outstanding.remove(&id);
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Locally captured tracks for one call
pub struct MediaHandle {
    id: HandleId,
    kind: MediaKind,
    tracks: Vec<Arc<dyn LocalTrack>>,
    released: AtomicBool,
    shared: Arc<GuardShared>,
}

impl MediaHandle {
    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn tracks(&self) -> &[Arc<dyn LocalTrack>] {
        &self.tracks
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for MediaHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaHandle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("tracks", &self.tracks.len())
            .field("released", &self.is_released())
            .finish()
    }
}

impl Drop for MediaHandle {
    fn drop(&mut self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            warn!("Media handle {} dropped without release, stopping {} tracks", self.id, self.tracks.len());
            self.shared.finish(self.id, &self.tracks);
        }
    }
}

/// Enforces acquire/release discipline over local capture devices
pub struct ResourceGuard {
    devices: Arc<dyn MediaDevices>,
    sweep_on_release: bool,
    shared: Arc<GuardShared>,
}

impl ResourceGuard {
    pub fn new(devices: Arc<dyn MediaDevices>, sweep_on_release: bool) -> Self {
        Self {
            devices,
            sweep_on_release,
            shared: Arc::new(GuardShared::default()),
        }
    }

    /// Request device access for a call of the given kind
    pub async fn acquire(&self, kind: MediaKind) -> Result<MediaHandle, DeviceError> {
        debug!("Requesting {} capture devices", kind);
        let tracks = self.devices.get_user_media(kind).await?;

        let missing: Vec<TrackKind> = TrackKind::required_for(kind)
            .iter()
            .copied()
            .filter(|required| !tracks.iter().any(|t| t.kind() == *required))
            .collect();
        if !missing.is_empty() {
            for track in &tracks {
                track.stop();
            }
            let names: Vec<String> = missing.iter().map(|k| k.to_string()).collect();
            return Err(DeviceError::unavailable(format!("no {} track returned", names.join("/"))));
        }

        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared
            .outstanding
            .insert(id, tracks.iter().map(|t| t.id().to_string()).collect());
        self.shared.acquisitions.fetch_add(1, Ordering::SeqCst);
        info!("Acquired media handle {} ({}, {} tracks)", id, kind, tracks.len());

        Ok(MediaHandle {
            id,
            kind,
            tracks,
            released: AtomicBool::new(false),
            shared: self.shared.clone(),
        })
    }

    /// Stop every track owned by the handle
    ///
    /// Safe to call any number of times; only the first call has effect.
    pub async fn release(&self, handle: &MediaHandle) {
        if handle.released.swap(true, Ordering::SeqCst) {
            debug!("Media handle {} already released", handle.id);
            return;
        }
        self.shared.finish(handle.id, &handle.tracks);
        info!("Released media handle {}", handle.id);

        if self.sweep_on_release && self.shared.outstanding.is_empty() {
            self.sweep().await;
        }
    }

    /// Stop live capture tracks that no outstanding handle owns
    ///
    /// Catches acquisitions leaked by earlier failed cleanups so the device
    /// indicator goes off. Returns the number of tracks stopped.
    pub async fn sweep(&self) -> usize {
        let owned: HashSet<String> = self
            .shared
            .outstanding
            .iter()
            .flat_map(|entry| entry.value().clone())
            .collect();

        let mut stopped = 0;
        for track in self.devices.live_tracks().await {
            if track.is_live() && !owned.contains(track.id()) {
                track.stop();
                stopped += 1;
            }
        }

        if stopped > 0 {
            warn!("Sweep stopped {} orphaned capture tracks", stopped);
        }
        stopped
    }

    /// Handles acquired and not yet released
    pub fn outstanding(&self) -> usize {
        self.shared.outstanding.len()
    }

    pub fn acquisitions(&self) -> usize {
        self.shared.acquisitions.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.shared.releases.load(Ordering::SeqCst)
    }
}
