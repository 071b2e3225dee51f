use crate::state::AppState;
use crate::AppAction;

#[derive(uniffi::Enum, Clone, Debug)]
pub enum AppUpdate {
    FullState(AppState),
    /// Side-effect update: the user confirmed the exit prompt and the host should
    /// terminate the process.
    ExitRequested {
        rev: u64,
    },
}

impl AppUpdate {
    pub fn rev(&self) -> u64 {
        match self {
            AppUpdate::FullState(s) => s.rev,
            AppUpdate::ExitRequested { rev } => *rev,
        }
    }
}

#[derive(Debug)]
pub enum CoreMsg {
    Action(AppAction),
    Internal(Box<InternalEvent>),
}

/// Events raised by Rust-owned listeners registered with the host, as opposed to
/// actions the host dispatches directly.
#[derive(Debug)]
pub enum InternalEvent {
    ConnectivityReported { is_connected: Option<bool> },
    BackPressed,
}
