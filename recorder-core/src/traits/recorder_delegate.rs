use crate::models::error::RecorderError;
use crate::models::state::{RecorderState, StatusBroadcast};
use crate::models::take::TakeResult;

/// Event delegate for recorder notifications.
///
/// All methods are called from the context that owns the state machine.
/// Implementations must not call back into the recorder; marshal through a
/// [`RecorderHandle`](crate::session::controller::RecorderHandle) instead.
pub trait RecorderDelegate: Send + Sync {
    /// Called on every state transition.
    fn on_state_changed(&self, _state: RecorderState) {}

    /// Called on every recording start/stop and once at startup.
    fn on_status(&self, _status: StatusBroadcast) {}

    /// Called once per take after all its files were attempted.
    fn on_take_finished(&self, _result: &TakeResult) {}

    /// Called when an operation failed or a take could not be fully saved.
    fn on_error(&self, _error: &RecorderError) {}

    /// Called for recoverable conditions the user should know about.
    fn on_warning(&self, _warning: &RecorderError) {}
}
