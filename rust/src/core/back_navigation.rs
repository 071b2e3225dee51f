use crate::state::ViewState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackAction {
    /// Consume the press and do nothing.
    Swallow,
    /// Ask the embedded surface to go back in its own history.
    GoBack,
    /// Nothing left to go back to; ask the user whether to leave the app.
    PromptExit,
}

/// Decision table for the hardware back button, evaluated top to bottom.
///
/// The press is always consumed by the caller regardless of the result, so the host
/// never falls through to its default (which would close the activity).
pub fn decide_back(view: ViewState, can_go_back: bool) -> BackAction {
    match (view, can_go_back) {
        (ViewState::Splash, _) => BackAction::Swallow,
        (ViewState::Content, true) => BackAction::GoBack,
        (ViewState::Content, false) => BackAction::PromptExit,
    }
}
