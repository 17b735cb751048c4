//! Resource Guard
//!
//! Scoped acquisition of the local camera/microphone with guaranteed
//! release.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐    ┌─────────────────────┐    ┌─────────────────────┐
//! │ CallSessionManager  │    │   ResourceGuard     │    │   MediaDevices      │
//! │                     │    │                     │    │                     │
//! │ accept / connect    │───▶│ acquire(kind)       │───▶│ get_user_media()    │
//! │ cleanup             │───▶│ release(handle)     │───▶│ LocalTrack::stop()  │
//! │                     │    │ sweep()             │───▶│ live_tracks()       │
//! └─────────────────────┘    └─────────────────────┘    └─────────────────────┘
//! ```
//!
//! The acquired [`MediaHandle`] is moved into the call's peer session, which
//! is its only owner until the session closes.

pub mod devices;
pub mod guard;

pub use devices::{LocalTrack, MediaDevices, TrackKind};
pub use guard::{HandleId, MediaHandle, ResourceGuard};
