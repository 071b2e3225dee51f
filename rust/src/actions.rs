use crate::state::InjectionTarget;

#[derive(uniffi::Enum, Debug, Clone)]
pub enum AppAction {
    // Splash playback
    PlaybackFinished,
    PlaybackFailed {
        message: String,
    },

    // Embedded surface
    NavigationStateChanged {
        can_go_back: bool,
        url: Option<String>,
    },

    // Connectivity
    ConnectivityChanged {
        is_connected: Option<bool>,
    },

    // Back navigation
    HardwareBack,
    CancelExit,
    ConfirmExit,

    // Nav bar
    NavButtonPressed {
        target: InjectionTarget,
    },
}

impl AppAction {
    /// Log-safe action tag (never includes page URLs).
    pub fn tag(&self) -> &'static str {
        match self {
            // Splash playback
            AppAction::PlaybackFinished => "PlaybackFinished",
            AppAction::PlaybackFailed { .. } => "PlaybackFailed",

            // Embedded surface
            AppAction::NavigationStateChanged { .. } => "NavigationStateChanged",

            // Connectivity
            AppAction::ConnectivityChanged { .. } => "ConnectivityChanged",

            // Back navigation
            AppAction::HardwareBack => "HardwareBack",
            AppAction::CancelExit => "CancelExit",
            AppAction::ConfirmExit => "ConfirmExit",

            // Nav bar
            AppAction::NavButtonPressed { .. } => "NavButtonPressed",
        }
    }
}
