//! Host-side subscriptions the screen holds while it is mounted.
//!
//! The host owns the connectivity monitor and the hardware back source. Rust hands it
//! listener objects and keeps one [`Registration`] per subscription; dropping the
//! registration removes the listener from the host, so every exit path releases it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use flume::Sender;

use crate::updates::{CoreMsg, InternalEvent};

#[uniffi::export(callback_interface)]
pub trait ConnectivityMonitor: Send + Sync + 'static {
    /// Starts delivering connectivity changes to `listener`. Returns a token for
    /// `unsubscribe`.
    fn subscribe(&self, listener: Arc<ConnectivityListener>) -> u64;
    fn unsubscribe(&self, token: u64);
}

#[uniffi::export(callback_interface)]
pub trait HardwareBackSource: Send + Sync + 'static {
    fn add_back_listener(&self, listener: Arc<BackListener>) -> u64;
    fn remove_back_listener(&self, token: u64);
}

#[derive(uniffi::Object)]
pub struct ConnectivityListener {
    core_tx: Sender<CoreMsg>,
    attached: AtomicBool,
}

impl ConnectivityListener {
    pub(crate) fn new(core_tx: Sender<CoreMsg>) -> Arc<Self> {
        Arc::new(Self {
            core_tx,
            attached: AtomicBool::new(true),
        })
    }

    fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
    }
}

#[uniffi::export]
impl ConnectivityListener {
    /// `None` means the platform could not tell; it is treated as offline.
    pub fn on_change(&self, is_connected: Option<bool>) {
        if !self.attached.load(Ordering::SeqCst) {
            return;
        }
        let _ = self.core_tx.send(CoreMsg::Internal(Box::new(
            InternalEvent::ConnectivityReported { is_connected },
        )));
    }
}

#[derive(uniffi::Object)]
pub struct BackListener {
    core_tx: Sender<CoreMsg>,
    attached: AtomicBool,
}

impl BackListener {
    pub(crate) fn new(core_tx: Sender<CoreMsg>) -> Arc<Self> {
        Arc::new(Self {
            core_tx,
            attached: AtomicBool::new(true),
        })
    }

    fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
    }
}

#[uniffi::export]
impl BackListener {
    /// Always returns `true`: the press is consumed and never reaches the platform's
    /// default handler. The decision itself happens on the core thread.
    pub fn on_back_pressed(&self) -> bool {
        if self.attached.load(Ordering::SeqCst) {
            let _ = self
                .core_tx
                .send(CoreMsg::Internal(Box::new(InternalEvent::BackPressed)));
        }
        true
    }
}

/// Runs its release closure exactly once, on `release()` or on drop.
pub(crate) struct Registration {
    name: &'static str,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Registration {
    pub(crate) fn new(name: &'static str, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            name,
            release: Some(Box::new(release)),
        }
    }

    pub(crate) fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
            tracing::debug!(registration = self.name, "released");
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.release();
    }
}

/// Handle for one mounted screen. Dropping it has the same effect as `unmount()`.
#[derive(uniffi::Object)]
pub struct ScreenMount {
    registrations: Mutex<Vec<Registration>>,
}

impl ScreenMount {
    pub(crate) fn register(
        core_tx: &Sender<CoreMsg>,
        monitor: Arc<dyn ConnectivityMonitor>,
        back_source: Arc<dyn HardwareBackSource>,
    ) -> Arc<Self> {
        let mut registrations = Vec::with_capacity(2);

        let listener = ConnectivityListener::new(core_tx.clone());
        let token = monitor.subscribe(listener.clone());
        registrations.push(Registration::new("connectivity", move || {
            listener.detach();
            monitor.unsubscribe(token);
        }));

        let listener = BackListener::new(core_tx.clone());
        let token = back_source.add_back_listener(listener.clone());
        registrations.push(Registration::new("hardware_back", move || {
            listener.detach();
            back_source.remove_back_listener(token);
        }));

        tracing::info!("screen mounted");
        Arc::new(Self {
            registrations: Mutex::new(registrations),
        })
    }
}

#[uniffi::export]
impl ScreenMount {
    pub fn unmount(&self) {
        let mut registrations = match self.registrations.lock() {
            Ok(mut g) => std::mem::take(&mut *g),
            Err(poison) => std::mem::take(&mut *poison.into_inner()),
        };
        if registrations.is_empty() {
            return;
        }
        // Release in reverse order of acquisition.
        while let Some(mut registration) = registrations.pop() {
            registration.release();
        }
        tracing::info!("screen unmounted");
    }

    pub fn is_mounted(&self) -> bool {
        match self.registrations.lock() {
            Ok(g) => !g.is_empty(),
            Err(poison) => !poison.into_inner().is_empty(),
        }
    }
}

impl Drop for ScreenMount {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    #[derive(Default)]
    struct FakeHost {
        next: AtomicU64,
        connectivity: Mutex<Vec<(u64, Arc<ConnectivityListener>)>>,
        back: Mutex<Vec<(u64, Arc<BackListener>)>>,
        released: Mutex<Vec<String>>,
    }

    impl ConnectivityMonitor for Arc<FakeHost> {
        fn subscribe(&self, listener: Arc<ConnectivityListener>) -> u64 {
            let token = self.next.fetch_add(1, Ordering::SeqCst);
            self.connectivity.lock().unwrap().push((token, listener));
            token
        }

        fn unsubscribe(&self, token: u64) {
            self.connectivity.lock().unwrap().retain(|(t, _)| *t != token);
            self.released.lock().unwrap().push(format!("connectivity:{token}"));
        }
    }

    impl HardwareBackSource for Arc<FakeHost> {
        fn add_back_listener(&self, listener: Arc<BackListener>) -> u64 {
            let token = self.next.fetch_add(1, Ordering::SeqCst);
            self.back.lock().unwrap().push((token, listener));
            token
        }

        fn remove_back_listener(&self, token: u64) {
            self.back.lock().unwrap().retain(|(t, _)| *t != token);
            self.released.lock().unwrap().push(format!("back:{token}"));
        }
    }

    fn mount(host: &Arc<FakeHost>) -> (Arc<ScreenMount>, flume::Receiver<CoreMsg>) {
        let (tx, rx) = flume::unbounded();
        let mount = ScreenMount::register(&tx, Arc::new(host.clone()), Arc::new(host.clone()));
        (mount, rx)
    }

    #[test]
    fn mount_registers_both_listeners() {
        let host = Arc::new(FakeHost::default());
        let (mount, rx) = mount(&host);
        assert!(mount.is_mounted());

        let connectivity = host.connectivity.lock().unwrap()[0].1.clone();
        let back = host.back.lock().unwrap()[0].1.clone();
        connectivity.on_change(None);
        assert!(back.on_back_pressed());

        let msgs: Vec<CoreMsg> = rx.try_iter().collect();
        assert_eq!(msgs.len(), 2);
        assert!(matches!(
            &msgs[0],
            CoreMsg::Internal(ev)
                if matches!(**ev, InternalEvent::ConnectivityReported { is_connected: None })
        ));
        assert!(matches!(
            &msgs[1],
            CoreMsg::Internal(ev) if matches!(**ev, InternalEvent::BackPressed)
        ));
    }

    #[test]
    fn unmount_releases_in_reverse_order_once() {
        let host = Arc::new(FakeHost::default());
        let (mount, _rx) = mount(&host);
        mount.unmount();
        mount.unmount();
        assert!(!mount.is_mounted());
        assert!(host.connectivity.lock().unwrap().is_empty());
        assert!(host.back.lock().unwrap().is_empty());
        assert_eq!(
            *host.released.lock().unwrap(),
            vec!["back:1".to_string(), "connectivity:0".to_string()]
        );
        drop(mount);
        assert_eq!(host.released.lock().unwrap().len(), 2);
    }

    #[test]
    fn drop_releases_without_explicit_unmount() {
        let host = Arc::new(FakeHost::default());
        let (mount, _rx) = mount(&host);
        drop(mount);
        assert_eq!(host.released.lock().unwrap().len(), 2);
        assert!(host.connectivity.lock().unwrap().is_empty());
        assert!(host.back.lock().unwrap().is_empty());
    }

    #[test]
    fn detached_listeners_ignore_late_events_but_still_consume_back() {
        let host = Arc::new(FakeHost::default());
        let (mount, rx) = mount(&host);
        let connectivity = host.connectivity.lock().unwrap()[0].1.clone();
        let back = host.back.lock().unwrap()[0].1.clone();
        mount.unmount();

        connectivity.on_change(Some(false));
        assert!(back.on_back_pressed());
        assert_eq!(rx.try_iter().count(), 0);
    }
}
