use std::sync::{Arc, RwLock};

/// Imperative commands into the host's embedded browser surface.
///
/// Both calls are fire-and-forget: the core never waits for, or inspects, what the page
/// does with them.
#[uniffi::export(callback_interface)]
pub trait SurfaceBridge: Send + Sync + 'static {
    fn go_back(&self);
    fn inject_javascript(&self, script: String);
}

pub type SharedSurfaceBridge = Arc<RwLock<Option<Arc<dyn SurfaceBridge>>>>;

/// Clones the current bridge out of the slot so the lock is not held across the
/// host call.
pub(crate) fn current_bridge(slot: &SharedSurfaceBridge) -> Option<Arc<dyn SurfaceBridge>> {
    match slot.read() {
        Ok(g) => g.clone(),
        Err(poison) => poison.into_inner().clone(),
    }
}

pub(crate) fn replace_bridge(slot: &SharedSurfaceBridge, bridge: Option<Arc<dyn SurfaceBridge>>) {
    match slot.write() {
        Ok(mut g) => *g = bridge,
        Err(poison) => *poison.into_inner() = bridge,
    }
}
