#[cfg(test)]
#[path = "init_progress_tracker_test.rs"]
mod tests;

use tokio::sync::watch;

use crate::domain::models::InitProgress;
use crate::domain::models::InitState;

/// Republishes the latest load progress reported by the worker. Last write
/// wins; the worker is responsible for never reporting a decrease.
pub struct InitProgressTracker {
    progress: watch::Sender<InitProgress>,
    state: watch::Sender<InitState>,
}

impl Default for InitProgressTracker {
    fn default() -> InitProgressTracker {
        let (progress, _) = watch::channel(InitProgress::zero());
        let (state, _) = watch::channel(InitState::Uninitialized);
        return InitProgressTracker { progress, state };
    }
}

impl InitProgressTracker {
    /// Moves to `Loading` and zeroes progress, unless a load is running or
    /// already finished. Returns whether a new load should start.
    pub fn begin(&self) -> bool {
        let started = self.state.send_if_modified(|state| {
            if !state.can_start() {
                return false;
            }
            *state = InitState::Loading;
            return true;
        });

        if started {
            self.progress.send_replace(InitProgress::zero());
        }

        return started;
    }

    pub fn update(&self, progress: InitProgress) {
        self.progress.send_replace(progress);
    }

    pub fn finish(&self) {
        self.state.send_replace(InitState::Ready);
    }

    pub fn fail(&self, reason: &str) {
        self.state.send_replace(InitState::Failed(reason.to_string()));
    }

    pub fn progress(&self) -> InitProgress {
        return *self.progress.borrow();
    }

    pub fn state(&self) -> InitState {
        return self.state.borrow().clone();
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<InitProgress> {
        return self.progress.subscribe();
    }

    pub fn subscribe_state(&self) -> watch::Receiver<InitState> {
        return self.state.subscribe();
    }
}
