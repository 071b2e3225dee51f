mod actions;
mod core;
mod injection;
mod lifecycle;
mod logging;
mod screen_projection;
mod state;
mod surface;
mod updates;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;

use flume::{Receiver, Sender};

pub use actions::AppAction;
pub use crate::core::{decide_back, offline_overlay_visible, BackAction};
pub use injection::*;
pub use lifecycle::{
    BackListener, ConnectivityListener, ConnectivityMonitor, HardwareBackSource, ScreenMount,
};
pub use screen_projection::*;
pub use state::*;
pub use surface::{SharedSurfaceBridge, SurfaceBridge};
pub use updates::*;

/// Return the default `hasat_config.json` payload used when no config file exists.
#[uniffi::export]
pub fn default_config_json() -> String {
    crate::core::default_app_config_json()
}

#[uniffi::export]
pub fn screen_layers(state: AppState) -> ScreenLayers {
    project_screen(&state)
}

uniffi::setup_scaffolding!();

#[uniffi::export(callback_interface)]
pub trait AppReconciler: Send + Sync + 'static {
    fn reconcile(&self, update: AppUpdate);
}

#[derive(uniffi::Object)]
pub struct FfiApp {
    core_tx: Sender<CoreMsg>,
    update_rx: Receiver<AppUpdate>,
    listening: AtomicBool,
    shared_state: Arc<RwLock<AppState>>,
    surface_bridge: SharedSurfaceBridge,
}

#[uniffi::export]
impl FfiApp {
    #[uniffi::constructor]
    pub fn new(data_dir: String) -> Arc<Self> {
        logging::init_logging(&data_dir);
        tracing::info!(data_dir = %data_dir, "FfiApp::new() starting");

        let (update_tx, update_rx) = flume::unbounded();
        let (core_tx, core_rx) = flume::unbounded::<CoreMsg>();
        let shared_state = Arc::new(RwLock::new(AppState::empty()));
        let surface_bridge: SharedSurfaceBridge = Arc::new(RwLock::new(None));

        // Build the core before returning so `state()` already reflects config.
        let mut core = crate::core::AppCore::new(
            update_tx,
            data_dir,
            shared_state.clone(),
            surface_bridge.clone(),
        );

        // Actor loop thread (single threaded "app actor"). Every event is handled here,
        // in arrival order.
        thread::spawn(move || {
            while let Ok(msg) = core_rx.recv() {
                core.handle_message(msg);
            }
        });

        Arc::new(Self {
            core_tx,
            update_rx,
            listening: AtomicBool::new(false),
            shared_state,
            surface_bridge,
        })
    }

    pub fn state(&self) -> AppState {
        match self.shared_state.read() {
            Ok(g) => g.clone(),
            Err(poison) => poison.into_inner().clone(),
        }
    }

    pub fn dispatch(&self, action: AppAction) {
        // Contract: never block caller.
        let _ = self.core_tx.send(CoreMsg::Action(action));
    }

    /// For hosts that route the back gesture themselves instead of through `mount`.
    /// Always returns `true`.
    pub fn handle_back_pressed(&self) -> bool {
        let _ = self
            .core_tx
            .send(CoreMsg::Internal(Box::new(InternalEvent::BackPressed)));
        true
    }

    pub fn listen_for_updates(&self, reconciler: Box<dyn AppReconciler>) {
        if self
            .listening
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // Avoid multiple listeners that would split messages.
            return;
        }

        let rx = self.update_rx.clone();
        thread::spawn(move || {
            while let Ok(update) = rx.recv() {
                reconciler.reconcile(update);
            }
        });
    }

    pub fn set_surface_bridge(&self, bridge: Box<dyn SurfaceBridge>) {
        let bridge: Arc<dyn SurfaceBridge> = Arc::from(bridge);
        surface::replace_bridge(&self.surface_bridge, Some(bridge));
    }

    /// Called when the host tears its browser surface down.
    pub fn clear_surface_bridge(&self) {
        surface::replace_bridge(&self.surface_bridge, None);
    }

    /// Subscribes to connectivity and hardware back for the lifetime of the returned
    /// handle.
    pub fn mount(
        &self,
        monitor: Box<dyn ConnectivityMonitor>,
        back_source: Box<dyn HardwareBackSource>,
    ) -> Arc<ScreenMount> {
        ScreenMount::register(&self.core_tx, Arc::from(monitor), Arc::from(back_source))
    }
}
