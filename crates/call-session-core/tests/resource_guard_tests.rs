mod common;

use call_session_core::{DeviceError, LocalTrack, MediaKind, ResourceGuard, TrackKind};
use common::MockDevices;
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[tokio::test]
async fn test_acquire_and_release() {
    let devices = MockDevices::new();
    let guard = ResourceGuard::new(devices.clone(), false);

    let handle = guard.acquire(MediaKind::Video).await.unwrap();
    assert_eq!(handle.kind(), MediaKind::Video);
    assert_eq!(handle.tracks().len(), 2);
    assert_eq!(guard.outstanding(), 1);
    assert_eq!(devices.live_count(), 2);

    guard.release(&handle).await;
    assert!(handle.is_released());
    assert_eq!(guard.outstanding(), 0);
    assert_eq!(devices.live_count(), 0);
}

#[tokio::test]
async fn test_release_is_idempotent() {
    let devices = MockDevices::new();
    let guard = ResourceGuard::new(devices.clone(), false);

    let handle = guard.acquire(MediaKind::Audio).await.unwrap();
    guard.release(&handle).await;
    guard.release(&handle).await;
    drop(handle);

    assert_eq!(guard.acquisitions(), 1);
    assert_eq!(guard.releases(), 1);
}

#[tokio::test]
async fn test_denied_acquisition_holds_nothing() {
    let devices = MockDevices::new();
    devices.fail_with(DeviceError::PermissionDenied);
    let guard = ResourceGuard::new(devices.clone(), false);

    let err = guard.acquire(MediaKind::Audio).await.unwrap_err();
    assert_eq!(err, DeviceError::PermissionDenied);
    assert_eq!(guard.outstanding(), 0);
    assert_eq!(guard.acquisitions(), 0);
}

#[tokio::test]
async fn test_partial_grant_is_stopped() {
    let devices = MockDevices::new();
    devices.omit(TrackKind::Video);
    let guard = ResourceGuard::new(devices.clone(), false);

    let err = guard.acquire(MediaKind::Video).await.unwrap_err();
    assert!(matches!(err, DeviceError::DeviceUnavailable { .. }));
    assert_eq!(devices.issued(), 1);
    assert_eq!(devices.live_count(), 0);
    assert_eq!(guard.outstanding(), 0);
}

#[tokio::test]
async fn test_dropped_handle_stops_tracks() {
    let devices = MockDevices::new();
    let guard = ResourceGuard::new(devices.clone(), false);

    let handle = guard.acquire(MediaKind::Audio).await.unwrap();
    drop(handle);

    assert_eq!(devices.live_count(), 0);
    assert_eq!(guard.outstanding(), 0);
    assert_eq!(guard.releases(), 1);
}

#[tokio::test]
async fn test_sweep_spares_owned_tracks() {
    let devices = MockDevices::new();
    let guard = ResourceGuard::new(devices.clone(), false);

    let handle = guard.acquire(MediaKind::Audio).await.unwrap();
    let orphan = devices.leak_track(TrackKind::Video);

    assert_eq!(guard.sweep().await, 1);
    assert!(!orphan.is_live());
    assert!(handle.tracks().iter().all(|t| t.is_live()));

    guard.release(&handle).await;
}

#[tokio::test]
async fn test_release_sweeps_when_enabled() {
    let devices = MockDevices::new();
    let guard = Arc::new(ResourceGuard::new(devices.clone(), true));

    let first = guard.acquire(MediaKind::Audio).await.unwrap();
    let second = guard.acquire(MediaKind::Audio).await.unwrap();
    let orphan = devices.leak_track(TrackKind::Audio);

    // Another handle is still outstanding: no sweep yet
    guard.release(&first).await;
    assert!(orphan.is_live());

    guard.release(&second).await;
    assert!(!orphan.is_live());
    assert_eq!(devices.live_count(), 0);
}
