//! Toggle-key listener.
//!
//! Key presses arrive on a [`KeyHub`], which fans them out to every
//! subscriber. A [`HotkeyListener`] owns at most one subscriber thread and
//! calls [`Toggle::toggle`] whenever the armed key is pressed.

use std::{
    sync::{Arc, Weak},
    thread::{self, JoinHandle},
};

use crossbeam_channel::{select, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, trace};

use crate::key::ToggleKey;

/// Something the toggle key flips.
pub trait Toggle: Send + Sync + 'static {
    /// Flip the state, returning the new one.
    fn toggle(&self) -> bool;
}

/// Fan-out point for key-press events.
#[derive(Default)]
pub struct KeyHub {
    subscribers: Mutex<Vec<Sender<ToggleKey>>>,
}

impl KeyHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<ToggleKey> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Deliver `key` to every live subscriber, dropping the ones that hung up.
    pub fn publish(&self, key: ToggleKey) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(key).is_ok());
        trace!(%key, subscribers = subscribers.len(), "key press");
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

struct Armed {
    key: ToggleKey,
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Watches a [`KeyHub`] for one key at a time.
///
/// Holds only a weak reference to its target so the target may own the
/// listener.
pub struct HotkeyListener<T: Toggle> {
    hub: Arc<KeyHub>,
    target: Weak<T>,
    armed: Mutex<Option<Armed>>,
}

impl<T: Toggle> HotkeyListener<T> {
    pub fn new(hub: Arc<KeyHub>, target: Weak<T>) -> Self {
        Self {
            hub,
            target,
            armed: Mutex::new(None),
        }
    }

    /// Arm for `key`. Any previously armed listener is stopped first, so a
    /// rebind never leaves two threads watching at once.
    pub fn start(&self, key: ToggleKey) {
        let mut armed = self.armed.lock();
        if let Some(old) = armed.take() {
            Self::disarm(old);
        }

        let events = self.hub.subscribe();
        let (stop, stopped) = unbounded();
        let target = self.target.clone();
        let spawned = thread::Builder::new()
            .name(format!("hotkey-{key}"))
            .spawn(move || listen(key, &events, &stopped, &target));

        match spawned {
            Ok(handle) => {
                debug!(%key, "hotkey listener armed");
                *armed = Some(Armed { key, stop, handle });
            }
            Err(err) => error!(%key, %err, "failed to spawn hotkey listener"),
        }
    }

    pub fn stop(&self) {
        if let Some(old) = self.armed.lock().take() {
            Self::disarm(old);
        }
    }

    pub fn key(&self) -> Option<ToggleKey> {
        self.armed.lock().as_ref().map(|a| a.key)
    }

    fn disarm(armed: Armed) {
        drop(armed.stop);
        // The target can be dropped from inside the listener thread itself.
        if armed.handle.thread().id() != thread::current().id() {
            if let Err(panic) = armed.handle.join() {
                error!(key = %armed.key, ?panic, "hotkey listener panicked");
            }
        }
        debug!(key = %armed.key, "hotkey listener disarmed");
    }
}

impl<T: Toggle> Drop for HotkeyListener<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn listen<T: Toggle>(
    key: ToggleKey,
    events: &Receiver<ToggleKey>,
    stopped: &Receiver<()>,
    target: &Weak<T>,
) {
    loop {
        select! {
            recv(stopped) -> _ => return,
            recv(events) -> pressed => {
                let Ok(pressed) = pressed else { return };
                if pressed != key {
                    continue;
                }
                let Some(target) = target.upgrade() else { return };
                let enabled = target.toggle();
                debug!(%key, enabled, "toggle key pressed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::{Duration, Instant},
    };

    #[derive(Default)]
    struct Counter {
        toggles: AtomicUsize,
    }

    impl Toggle for Counter {
        fn toggle(&self) -> bool {
            self.toggles.fetch_add(1, Ordering::SeqCst) % 2 == 0
        }
    }

    impl Counter {
        fn count(&self) -> usize {
            self.toggles.load(Ordering::SeqCst)
        }
    }

    fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        cond()
    }

    fn fixture() -> (Arc<KeyHub>, Arc<Counter>, HotkeyListener<Counter>) {
        let hub = Arc::new(KeyHub::new());
        let counter = Arc::new(Counter::default());
        let listener = HotkeyListener::new(Arc::clone(&hub), Arc::downgrade(&counter));
        (hub, counter, listener)
    }

    #[test]
    fn test_matching_key_toggles() {
        let (hub, counter, listener) = fixture();
        listener.start(ToggleKey::Function(8));
        assert!(listener.key().is_some());

        hub.publish(ToggleKey::Function(8));
        assert!(wait_for(|| counter.count() == 1));
        hub.publish(ToggleKey::Function(8));
        assert!(wait_for(|| counter.count() == 2));
    }

    #[test]
    fn test_other_keys_are_ignored() {
        let (hub, counter, listener) = fixture();
        listener.start(ToggleKey::Char('q'));

        hub.publish(ToggleKey::Char('w'));
        hub.publish(ToggleKey::Space);
        hub.publish(ToggleKey::Function(8));
        // Events are handled in order, so once `q` lands the others were seen.
        hub.publish(ToggleKey::Char('q'));
        assert!(wait_for(|| counter.count() == 1));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(counter.count(), 1);
    }

    #[test]
    fn test_rebind_disarms_previous_key() {
        let (hub, counter, listener) = fixture();
        listener.start(ToggleKey::Function(8));
        listener.start("F9".parse().unwrap());
        assert_eq!(listener.key(), Some(ToggleKey::Function(9)));
        assert_eq!(hub.subscriber_count(), 2);

        hub.publish(ToggleKey::Function(8));
        hub.publish("f9".parse().unwrap());
        assert!(wait_for(|| counter.count() == 1));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(counter.count(), 1);

        // The old subscriber is pruned on the next publish.
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[test]
    fn test_stop_returns_to_unarmed() {
        let (hub, counter, listener) = fixture();
        listener.start(ToggleKey::Char('x'));
        listener.stop();
        assert_eq!(listener.key(), None);

        hub.publish(ToggleKey::Char('x'));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(counter.count(), 0);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_listener_exits_when_target_is_gone() {
        let (hub, counter, listener) = fixture();
        listener.start(ToggleKey::Char('x'));
        drop(counter);
        hub.publish(ToggleKey::Char('x'));
        listener.stop();
        assert_eq!(listener.key(), None);
    }

    struct Exploding;

    impl Toggle for Exploding {
        fn toggle(&self) -> bool {
            panic!("toggle failed");
        }
    }

    #[test]
    fn test_stop_survives_a_panicked_listener() {
        let hub = Arc::new(KeyHub::new());
        let target = Arc::new(Exploding);
        let listener = HotkeyListener::new(Arc::clone(&hub), Arc::downgrade(&target));
        listener.start(ToggleKey::Char('x'));

        hub.publish(ToggleKey::Char('x'));
        // The dead thread's receiver is gone once the next publish prunes it.
        assert!(wait_for(|| {
            hub.publish(ToggleKey::Char('z'));
            hub.subscriber_count() == 0
        }));

        listener.stop();
        assert_eq!(listener.key(), None);
    }
}
