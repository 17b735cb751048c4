//! Resource release under duplicate, late and racing terminal events

mod common;

use call_session_core::{CallState, EndReason, InboundSignal, MediaKind, SessionDescription, UserId};
use common::*;
use pretty_assertions::assert_eq;

async fn active_incoming(h: &Harness, caller: &str) {
    h.manager
        .handle_signal(InboundSignal::IncomingCall {
            caller_id: UserId::from(caller),
            media_kind: MediaKind::Video,
        })
        .await;
    h.manager.accept().await.unwrap();
    h.manager
        .handle_signal(InboundSignal::Description {
            from: UserId::from(caller),
            description: SessionDescription::offer("v=0 remote-offer"),
        })
        .await;
    h.peers.last().connect();
    wait_for_state(&h.manager, CallState::Active).await;
}

#[tokio::test]
async fn test_duplicate_remote_end_cleans_up_once() {
    let h = harness("bob").await;
    active_incoming(&h, "alice").await;
    let transport = h.peers.last();

    let first = h
        .manager
        .handle_signal(InboundSignal::CallEnded {
            peer_id: UserId::from("alice"),
        })
        .await;
    assert!(first.transition_applied);

    let second = h
        .manager
        .handle_signal(InboundSignal::CallEnded {
            peer_id: UserId::from("alice"),
        })
        .await;
    assert!(!second.transition_applied);

    assert_eq!(transport.closes(), 1);
    assert_eq!(h.surface.closes(), 1);
    assert_eq!(h.manager.resource_guard().releases(), 1);
    assert_eq!(h.devices.live_count(), 0);
}

#[tokio::test]
async fn test_local_end_after_remote_end_is_noop() {
    let h = harness("bob").await;
    active_incoming(&h, "alice").await;

    h.manager
        .handle_signal(InboundSignal::CallEnded {
            peer_id: UserId::from("alice"),
        })
        .await;
    let result = h.manager.end_call().await.unwrap();
    assert!(!result.transition_applied);

    assert_eq!(h.signaling.count("callEnded"), 0);
    assert_eq!(
        h.manager.last_session().await.unwrap().end_reason,
        Some(EndReason::RemoteHangup)
    );
}

#[tokio::test]
async fn test_surface_closed_by_user_ends_call() {
    let h = harness("bob").await;
    active_incoming(&h, "alice").await;

    h.surface.close_from_host();
    wait_for_end(&h.manager).await;

    let last = h.manager.last_session().await.unwrap();
    assert_eq!(last.end_reason, Some(EndReason::SurfaceClosed));
    assert_eq!(h.signaling.count("callEnded"), 1);
    assert_eq!(h.devices.live_count(), 0);

    // A second close notification after the call ended is ignored
    h.surface.close_from_host();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(h.signaling.count("callEnded"), 1);
    assert_eq!(h.manager.current_state().await, CallState::Idle);
}

#[tokio::test]
async fn test_reject_during_acquisition_releases_late_handle() {
    let h = harness("bob").await;
    let gate = h.devices.hold();

    h.manager
        .handle_signal(InboundSignal::IncomingCall {
            caller_id: UserId::from("alice"),
            media_kind: MediaKind::Video,
        })
        .await;

    let manager = h.manager.clone();
    let accepting = tokio::spawn(async move { manager.accept().await });

    let devices = h.devices.clone();
    wait_until(move || devices.requests() == 1).await;
    assert_eq!(h.manager.current_state().await, CallState::Ringing);

    // Repeated accept while the prompt is open does nothing
    let repeat = h.manager.accept().await.unwrap();
    assert!(!repeat.transition_applied);

    let rejected = h.manager.reject().await.unwrap();
    assert!(rejected.transition_applied);
    assert_eq!(rejected.next_state, CallState::Ended);

    // Device prompt resolves after the call is gone
    gate.notify_one();
    let late = accepting.await.unwrap().unwrap();
    assert!(!late.transition_applied);
    assert_eq!(late.next_state, CallState::Ended);

    let guard = h.manager.resource_guard();
    assert_eq!(guard.acquisitions(), 1);
    assert_eq!(guard.releases(), 1);
    assert_eq!(guard.outstanding(), 0);
    assert_eq!(h.devices.live_count(), 0);
    assert_eq!(h.peers.created(), 0);
    assert_eq!(h.surface.opens(), 0);
    assert_eq!(h.signaling.count("acceptCall"), 0);
    assert_eq!(
        h.manager.last_session().await.unwrap().end_reason,
        Some(EndReason::Declined)
    );
}

#[tokio::test]
async fn test_remote_end_during_acquisition() {
    let h = harness("alice").await;
    let gate = h.devices.hold();

    h.manager.start_call("bob", MediaKind::Audio).await.unwrap();
    h.manager
        .handle_signal(InboundSignal::CallAccepted {
            callee_id: UserId::from("bob"),
        })
        .await;
    let devices = h.devices.clone();
    wait_until(move || devices.requests() == 1).await;

    h.manager
        .handle_signal(InboundSignal::CallEnded {
            peer_id: UserId::from("bob"),
        })
        .await;
    assert_eq!(h.manager.current_state().await, CallState::Idle);

    gate.notify_one();
    let guard = h.manager.resource_guard().clone();
    wait_until(move || guard.releases() == 1).await;

    assert_eq!(h.manager.resource_guard().outstanding(), 0);
    assert_eq!(h.devices.live_count(), 0);
    assert_eq!(h.peers.created(), 0);
}

#[tokio::test]
async fn test_late_transport_events_after_end_are_ignored() {
    let h = harness("bob").await;
    active_incoming(&h, "alice").await;
    let transport = h.peers.last();

    h.manager.end_call().await.unwrap();
    transport.connect();
    transport.fail();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert_eq!(h.manager.current_state().await, CallState::Idle);
    assert_eq!(h.signaling.count("callEnded"), 1);
    assert_eq!(transport.closes(), 1);
}

#[tokio::test]
async fn test_new_call_after_end_gets_fresh_session() {
    let h = harness("alice").await;
    let first = h.manager.start_call("bob", MediaKind::Audio).await.unwrap();
    h.manager.end_call().await.unwrap();

    let second = h.manager.start_call("bob", MediaKind::Audio).await.unwrap();
    assert_ne!(first, second);
    assert_eq!(h.manager.current_state().await, CallState::Ringing);
    assert_eq!(h.manager.last_session().await.unwrap().session_id, first);
}

#[tokio::test]
async fn test_sweep_stops_orphaned_tracks_on_release() {
    let h = harness("bob").await;
    let orphan = h.devices.leak_track(call_session_core::TrackKind::Audio);

    active_incoming(&h, "alice").await;
    h.manager.end_call().await.unwrap();

    assert!(!call_session_core::LocalTrack::is_live(orphan.as_ref()));
    assert_eq!(h.devices.live_count(), 0);
}
