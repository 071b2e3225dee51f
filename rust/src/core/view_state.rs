use crate::state::ViewState;

/// Splash → Content, once.
#[derive(Debug)]
pub(crate) struct ViewStateMachine {
    state: ViewState,
}

impl Default for ViewStateMachine {
    fn default() -> Self {
        Self {
            state: ViewState::Splash,
        }
    }
}

impl ViewStateMachine {
    pub(crate) fn current(&self) -> ViewState {
        self.state
    }

    /// Returns true only on the call that actually leaves the splash.
    pub(crate) fn on_playback_complete(&mut self) -> bool {
        match self.state {
            ViewState::Splash => {
                self.state = ViewState::Content;
                true
            }
            ViewState::Content => false,
        }
    }

    pub(crate) fn on_playback_failed(&mut self, advance: bool) -> bool {
        if advance {
            self.on_playback_complete()
        } else {
            false
        }
    }
}
