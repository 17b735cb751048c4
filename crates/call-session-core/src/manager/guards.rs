use super::session::CallSession;
use crate::state_table::Guard;

/// Check a transition guard against the session
pub(crate) fn check_guard(guard: &Guard, session: &CallSession) -> bool {
    match guard {
        // Repeated accepts while the device prompt is open are no-ops
        Guard::NoAcquisitionPending => session.acquisition.is_none() && session.staged_media.is_none(),
        Guard::MediaStaged => session.staged_media.is_some(),
        Guard::HasPeerSession => session.peer.is_some(),
    }
}
