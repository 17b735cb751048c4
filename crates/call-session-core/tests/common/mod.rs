//! Mock collaborators shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use call_session_core::{
    CallConfig, CallSessionManager, CallState, DeviceError, IceCandidate, LocalTrack, MediaDevices, MediaKind,
    PeerConfig, PeerError, PeerTransport, PeerTransportFactory, SecondarySurface, SessionDescription,
    SignalMessage, SignalingError, SignalingTransport, SurfaceClosedNotifier, SurfaceError, SurfaceHandle,
    SurfaceParams, TrackKind, TransportEvent, TransportEventSink, TransportState,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ---------------------------------------------------------------------------
// Capture devices
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct MockTrack {
    id: String,
    kind: TrackKind,
    live: AtomicBool,
}

impl MockTrack {
    pub fn new(id: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: id.into(),
            kind,
            live: AtomicBool::new(true),
        }
    }
}

impl LocalTrack for MockTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct MockDevices {
    issued: Mutex<Vec<Arc<MockTrack>>>,
    failure: Mutex<Option<DeviceError>>,
    /// Kinds to leave out of the next grants
    omit: Mutex<Vec<TrackKind>>,
    gate: Mutex<Option<Arc<Notify>>>,
    requests: AtomicUsize,
    next_track: AtomicUsize,
}

impl MockDevices {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_with(&self, error: DeviceError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    pub fn omit(&self, kind: TrackKind) {
        self.omit.lock().unwrap().push(kind);
    }

    /// Block grants until the returned notify is signalled
    pub fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// A capture track the platform reports live but nobody owns
    pub fn leak_track(&self, kind: TrackKind) -> Arc<MockTrack> {
        let track = Arc::new(MockTrack::new("orphan", kind));
        self.issued.lock().unwrap().push(track.clone());
        track
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn issued(&self) -> usize {
        self.issued.lock().unwrap().len()
    }

    pub fn live_count(&self) -> usize {
        self.issued.lock().unwrap().iter().filter(|t| t.is_live()).count()
    }
}

#[async_trait]
impl MediaDevices for MockDevices {
    async fn get_user_media(&self, kind: MediaKind) -> Result<Vec<Arc<dyn LocalTrack>>, DeviceError> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if let Some(error) = self.failure.lock().unwrap().clone() {
            return Err(error);
        }

        let omit = self.omit.lock().unwrap().clone();
        let mut granted: Vec<Arc<dyn LocalTrack>> = Vec::new();
        for track_kind in TrackKind::required_for(kind) {
            if omit.contains(track_kind) {
                continue;
            }
            let n = self.next_track.fetch_add(1, Ordering::SeqCst);
            let track = Arc::new(MockTrack::new(format!("{}-{}", track_kind, n), *track_kind));
            self.issued.lock().unwrap().push(track.clone());
            granted.push(track);
        }
        Ok(granted)
    }

    async fn live_tracks(&self) -> Vec<Arc<dyn LocalTrack>> {
        self.issued
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.is_live())
            .map(|t| t.clone() as Arc<dyn LocalTrack>)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Peer transport
// ---------------------------------------------------------------------------

pub struct MockTransport {
    sink: TransportEventSink,
    pub local_tracks: AtomicUsize,
    pub remote_descriptions: Mutex<Vec<SessionDescription>>,
    pub remote_candidates: Mutex<Vec<IceCandidate>>,
    pub closes: AtomicUsize,
    fail_remote_description: AtomicBool,
}

impl MockTransport {
    /// Raise a transport hook as the platform would
    pub fn emit(&self, event: TransportEvent) {
        (self.sink)(event);
    }

    pub fn connect(&self) {
        self.emit(TransportEvent::ConnectionStateChanged(TransportState::Connected));
    }

    pub fn fail(&self) {
        self.emit(TransportEvent::ConnectionStateChanged(TransportState::Failed));
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PeerTransport for MockTransport {
    async fn add_local_tracks(&self, tracks: &[Arc<dyn LocalTrack>]) -> Result<(), PeerError> {
        self.local_tracks.fetch_add(tracks.len(), Ordering::SeqCst);
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription, PeerError> {
        Ok(SessionDescription::offer("v=0 mock-offer"))
    }

    async fn create_answer(&self) -> Result<SessionDescription, PeerError> {
        Ok(SessionDescription::answer("v=0 mock-answer"))
    }

    async fn set_local_description(&self, _description: SessionDescription) -> Result<(), PeerError> {
        Ok(())
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<(), PeerError> {
        if self.fail_remote_description.load(Ordering::SeqCst) {
            return Err(PeerError::negotiation("mock rejected remote description"));
        }
        self.remote_descriptions.lock().unwrap().push(description);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), PeerError> {
        if !candidate.candidate.starts_with("candidate:") {
            return Err(PeerError::transport(format!("unparseable candidate {:?}", candidate.candidate)));
        }
        self.remote_candidates.lock().unwrap().push(candidate);
        Ok(())
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct MockPeerFactory {
    transports: Mutex<Vec<Arc<MockTransport>>>,
    fail_remote_description: AtomicBool,
}

impl MockPeerFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Transports created from now on reject remote descriptions
    pub fn reject_remote_descriptions(&self) {
        self.fail_remote_description.store(true, Ordering::SeqCst);
    }

    pub fn created(&self) -> usize {
        self.transports.lock().unwrap().len()
    }

    pub fn last(&self) -> Arc<MockTransport> {
        self.transports.lock().unwrap().last().cloned().expect("no transport created")
    }
}

impl PeerTransportFactory for MockPeerFactory {
    fn create(&self, _config: &PeerConfig, events: TransportEventSink) -> Result<Arc<dyn PeerTransport>, PeerError> {
        let transport = Arc::new(MockTransport {
            sink: events,
            local_tracks: AtomicUsize::new(0),
            remote_descriptions: Mutex::new(Vec::new()),
            remote_candidates: Mutex::new(Vec::new()),
            closes: AtomicUsize::new(0),
            fail_remote_description: AtomicBool::new(self.fail_remote_description.load(Ordering::SeqCst)),
        });
        self.transports.lock().unwrap().push(transport.clone());
        Ok(transport)
    }
}

// ---------------------------------------------------------------------------
// Signaling
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockSignaling {
    published: Mutex<Vec<SignalMessage>>,
    fail: AtomicBool,
}

impl MockSignaling {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<SignalMessage> {
        self.published.lock().unwrap().clone()
    }

    pub fn event_names(&self) -> Vec<&'static str> {
        self.messages().iter().map(|m| m.event_name()).collect()
    }

    pub fn count(&self, event: &str) -> usize {
        self.event_names().iter().filter(|name| **name == event).count()
    }
}

#[async_trait]
impl SignalingTransport for MockSignaling {
    async fn publish(&self, message: SignalMessage) -> Result<(), SignalingError> {
        self.published.lock().unwrap().push(message);
        if self.fail.load(Ordering::SeqCst) {
            return Err(SignalingError::transport("relay unreachable"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Secondary surface
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockSurface {
    opens: AtomicUsize,
    closes: AtomicUsize,
    fail_open: AtomicBool,
    notifiers: Mutex<Vec<SurfaceClosedNotifier>>,
    pub last_params: Mutex<Option<SurfaceParams>>,
}

impl MockSurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_open(&self) {
        self.fail_open.store(true, Ordering::SeqCst);
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// The user closes the call window
    pub fn close_from_host(&self) {
        let notifier = self.notifiers.lock().unwrap().last().cloned();
        if let Some(notifier) = notifier {
            notifier.notify();
        }
    }
}

#[async_trait]
impl SecondarySurface for MockSurface {
    async fn open(&self, params: SurfaceParams) -> Result<SurfaceHandle, SurfaceError> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(SurfaceError::OpenFailed {
                reason: "popup blocked".to_string(),
            });
        }
        let n = self.opens.fetch_add(1, Ordering::SeqCst);
        *self.last_params.lock().unwrap() = Some(params);
        Ok(SurfaceHandle(format!("surface-{}", n)))
    }

    async fn close(&self, _handle: &SurfaceHandle) -> Result<(), SurfaceError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_closed(&self, _handle: &SurfaceHandle, notifier: SurfaceClosedNotifier) {
        self.notifiers.lock().unwrap().push(notifier);
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub manager: CallSessionManager,
    pub devices: Arc<MockDevices>,
    pub peers: Arc<MockPeerFactory>,
    pub signaling: Arc<MockSignaling>,
    pub surface: Arc<MockSurface>,
}

pub async fn harness(local_user: &str) -> Harness {
    harness_with_config(local_user, CallConfig::default()).await
}

pub async fn harness_with_config(local_user: &str, config: CallConfig) -> Harness {
    init_tracing();
    let devices = MockDevices::new();
    let peers = MockPeerFactory::new();
    let signaling = MockSignaling::new();
    let surface = MockSurface::new();

    let manager = CallSessionManager::builder()
        .with_local_user(local_user)
        .with_config(config)
        .with_media_devices(devices.clone())
        .with_peer_factory(peers.clone())
        .with_signaling(signaling.clone())
        .with_surface(surface.clone())
        .build()
        .await
        .expect("manager should build");

    Harness {
        manager,
        devices,
        peers,
        signaling,
        surface,
    }
}

/// Poll until `check` holds, failing the test after two seconds
pub async fn wait_until<F: FnMut() -> bool>(mut check: F) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

pub async fn wait_for_state(manager: &CallSessionManager, state: CallState) {
    for _ in 0..200 {
        if manager.current_state().await == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("manager never reached {:?}, still {:?}", state, manager.current_state().await);
}

/// Wait until the current session has ended and been archived
pub async fn wait_for_end(manager: &CallSessionManager) {
    for _ in 0..200 {
        if manager.current_session().await.is_none() && manager.last_session().await.is_some() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("call never ended, still {:?}", manager.current_state().await);
}
