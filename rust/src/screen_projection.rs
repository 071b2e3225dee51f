use crate::core::offline_overlay_visible;
use crate::{AppState, ExitPrompt, ViewState};

/// Which layers the host should have on screen, bottom to top.
#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct ScreenLayers {
    pub splash_visible: bool,
    pub surface_mounted: bool,
    pub nav_bar_visible: bool,
    pub offline_overlay_visible: bool,
    pub exit_prompt: Option<ExitPrompt>,
}

/// Maps core state to the layer stack shared by iOS and Android.
///
/// Once content is showing the surface stays mounted; losing connectivity only covers
/// it with the overlay.
pub fn project_screen(state: &AppState) -> ScreenLayers {
    match state.view {
        ViewState::Splash => ScreenLayers {
            splash_visible: true,
            surface_mounted: false,
            nav_bar_visible: false,
            offline_overlay_visible: false,
            exit_prompt: None,
        },
        ViewState::Content => ScreenLayers {
            splash_visible: false,
            surface_mounted: true,
            nav_bar_visible: true,
            offline_overlay_visible: offline_overlay_visible(state.view, state.is_connected),
            exit_prompt: state.exit_prompt.clone(),
        },
    }
}
