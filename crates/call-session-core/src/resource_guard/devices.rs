//! Capture Device Abstraction
//!
//! Platform-agnostic traits for acquiring camera/microphone tracks. A
//! browser host implements them over `getUserMedia`, a native host over its
//! capture API, and tests over in-memory mocks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::errors::DeviceError;
use crate::types::MediaKind;

/// Kind of a single captured track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

impl TrackKind {
    /// Track kinds a call of the given media kind needs
    pub fn required_for(kind: MediaKind) -> &'static [TrackKind] {
        match kind {
            MediaKind::Audio => &[TrackKind::Audio],
            MediaKind::Video => &[TrackKind::Audio, TrackKind::Video],
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => f.write_str("audio"),
            TrackKind::Video => f.write_str("video"),
        }
    }
}

/// A live locally captured media track
///
/// Stopping a track turns off the device indicator once no other track
/// holds the device.
pub trait LocalTrack: Send + Sync + fmt::Debug {
    /// Platform identifier of the track
    fn id(&self) -> &str;

    fn kind(&self) -> TrackKind;

    /// Stop capturing; must be safe to call on an already stopped track
    fn stop(&self);

    fn is_live(&self) -> bool;
}

/// Access to the platform's capture devices
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Request capture tracks for a call of the given kind
    ///
    /// Video requests both camera and microphone.
    async fn get_user_media(&self, kind: MediaKind) -> Result<Vec<Arc<dyn LocalTrack>>, DeviceError>;

    /// Every capture track the platform reports as currently live
    ///
    /// Used by the best-effort sweep. Platforms that cannot enumerate live
    /// tracks keep the default empty list.
    async fn live_tracks(&self) -> Vec<Arc<dyn LocalTrack>> {
        Vec::new()
    }
}
