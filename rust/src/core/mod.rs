mod back_navigation;
mod config;
mod connectivity;
mod view_state;

use std::sync::{Arc, RwLock};

use flume::Sender;

use crate::actions::AppAction;
use crate::injection::{RemotePageContract, ScriptCatalog};
use crate::state::{AppState, InjectionTarget, SplashConfig, SurfaceConfig, ViewState};
use crate::surface::{current_bridge, SharedSurfaceBridge, SurfaceBridge};
use crate::updates::{AppUpdate, CoreMsg, InternalEvent};

pub use back_navigation::{decide_back, BackAction};
pub(crate) use config::default_app_config_json;
pub use connectivity::offline_overlay_visible;

use view_state::ViewStateMachine;

pub struct AppCore {
    pub state: AppState,
    rev: u64,

    update_sender: Sender<AppUpdate>,
    shared_state: Arc<RwLock<AppState>>,
    surface_bridge: SharedSurfaceBridge,

    config: config::AppConfig,
    contract: RemotePageContract,
    scripts: Option<ScriptCatalog>,
    view: ViewStateMachine,
}

impl AppCore {
    pub fn new(
        update_sender: Sender<AppUpdate>,
        data_dir: String,
        shared_state: Arc<RwLock<AppState>>,
        surface_bridge: SharedSurfaceBridge,
    ) -> Self {
        let config = config::load_app_config(&data_dir);
        let (contract, scripts) = config::resolve_scripts(&config);

        let mut this = Self {
            state: AppState::empty(),
            rev: 0,
            update_sender,
            shared_state,
            surface_bridge,
            config,
            contract,
            scripts,
            view: ViewStateMachine::default(),
        };

        this.state.splash = SplashConfig {
            media_resource: this.splash_media(),
            looping: false,
        };
        this.state.surface = SurfaceConfig::for_url(this.start_url());
        this.state.offline_message = this.offline_message();
        tracing::info!(url = %this.state.surface.url, "core ready");

        // Ensure FfiApp.state() has an immediately-available snapshot.
        let snapshot = this.state.clone();
        this.commit_state_snapshot(&snapshot);
        this
    }

    fn next_rev(&mut self) -> u64 {
        self.rev += 1;
        self.state.rev = self.rev;
        self.rev
    }

    fn commit_state_snapshot(&self, snapshot: &AppState) {
        match self.shared_state.write() {
            Ok(mut g) => *g = snapshot.clone(),
            Err(poison) => *poison.into_inner() = snapshot.clone(),
        }
    }

    fn emit_state(&mut self) {
        self.next_rev();
        let snapshot = self.state.clone();
        self.commit_state_snapshot(&snapshot);
        let _ = self.update_sender.send(AppUpdate::FullState(snapshot));
    }

    fn emit_exit_requested(&mut self) {
        let rev = self.next_rev();
        // Keep snapshot rev in sync with the update stream even though this is a side-effect update.
        let snapshot = self.state.clone();
        self.commit_state_snapshot(&snapshot);
        let _ = self.update_sender.send(AppUpdate::ExitRequested { rev });
    }

    fn with_surface(&self, what: &'static str, f: impl FnOnce(&dyn SurfaceBridge)) {
        match current_bridge(&self.surface_bridge) {
            Some(bridge) => f(bridge.as_ref()),
            None => tracing::warn!(command = what, "no surface attached; dropping command"),
        }
    }

    pub fn handle_message(&mut self, msg: CoreMsg) {
        match msg {
            CoreMsg::Action(action) => {
                tracing::info!(action = action.tag(), "dispatch");
                self.handle_action(action);
            }
            CoreMsg::Internal(internal) => self.handle_internal(*internal),
        }
    }

    fn handle_internal(&mut self, internal: InternalEvent) {
        match internal {
            InternalEvent::ConnectivityReported { is_connected } => {
                self.apply_connectivity(is_connected)
            }
            InternalEvent::BackPressed => self.handle_back(),
        }
    }

    fn handle_action(&mut self, action: AppAction) {
        match action {
            AppAction::PlaybackFinished => {
                if self.view.on_playback_complete() {
                    self.enter_content();
                }
            }
            AppAction::PlaybackFailed { message } => {
                let advance = self.advance_on_playback_error();
                tracing::warn!(%message, advance, "splash playback failed");
                if self.view.on_playback_failed(advance) {
                    self.enter_content();
                }
            }
            AppAction::NavigationStateChanged { can_go_back, url } => {
                if self.state.can_go_back != can_go_back || self.state.current_url != url {
                    self.state.can_go_back = can_go_back;
                    self.state.current_url = url;
                    self.emit_state();
                }
            }
            AppAction::ConnectivityChanged { is_connected } => {
                self.apply_connectivity(is_connected)
            }
            AppAction::HardwareBack => self.handle_back(),
            AppAction::CancelExit => {
                if self.state.exit_prompt.take().is_some() {
                    self.emit_state();
                }
            }
            AppAction::ConfirmExit => {
                // A confirm without a visible prompt is a stale tap; ignore it.
                if self.state.exit_prompt.take().is_none() {
                    return;
                }
                tracing::info!("exit confirmed");
                self.emit_state();
                self.emit_exit_requested();
            }
            AppAction::NavButtonPressed { target } => self.inject(target),
        }
    }

    fn enter_content(&mut self) {
        self.state.view = self.view.current();
        tracing::info!("splash done, showing content");
        self.emit_state();
    }

    fn apply_connectivity(&mut self, reported: Option<bool>) {
        let is_connected = connectivity::normalize_report(reported);
        if self.state.is_connected == is_connected {
            return;
        }
        tracing::info!(is_connected, "connectivity changed");
        self.state.is_connected = is_connected;
        self.emit_state();
    }

    fn handle_back(&mut self) {
        match decide_back(self.view.current(), self.state.can_go_back) {
            BackAction::Swallow => tracing::debug!("back ignored during splash"),
            BackAction::GoBack => self.with_surface("go_back", |s| s.go_back()),
            BackAction::PromptExit => {
                self.state.exit_prompt = Some(self.exit_prompt());
                self.emit_state();
            }
        }
    }

    fn inject(&mut self, target: InjectionTarget) {
        if self.view.current() == ViewState::Splash {
            tracing::debug!(?target, "nav button ignored during splash");
            return;
        }
        let Some(scripts) = &self.scripts else {
            tracing::warn!(?target, "no page scripts available; dropping nav button");
            return;
        };
        let script = scripts.script(target).to_string();
        self.with_surface("inject_javascript", |s| s.inject_javascript(script));
    }
}
