use parking_lot::Mutex;
use std::{
    mem,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};
use tracing::{info, warn};

use crate::{
    clicker::{ClickLoop, ClickSettings, Clicker},
    error::KeyParseError,
    hotkey::{HotkeyListener, KeyHub, Toggle},
    key::ToggleKey,
    random::RandomSource,
};

/// Everything the guard protects.
struct ToggleState {
    enabled: bool,
    /// Run flag of the current fan-out. Each enable gets a fresh one, so a
    /// quick off/on never revives workers that have not exited yet.
    running: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

/// Owns the clicking state, the worker fan-out and the toggle-key listener.
pub struct ToggleController {
    settings: ClickSettings,
    clicker: Arc<dyn Clicker>,
    random: Arc<RandomSource>,
    state: Mutex<ToggleState>,
    listener: HotkeyListener<ToggleController>,
}

impl ToggleController {
    pub fn new(
        settings: ClickSettings,
        clicker: Arc<dyn Clicker>,
        random: Arc<RandomSource>,
        hub: Arc<KeyHub>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            settings,
            clicker,
            random,
            state: Mutex::new(ToggleState {
                enabled: false,
                running: Arc::new(AtomicBool::new(false)),
                workers: Vec::new(),
            }),
            listener: HotkeyListener::new(hub, this.clone()),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    /// Parse `text` as a key and re-arm the listener on it.
    ///
    /// On a parse error the current binding stays armed.
    pub fn set_toggle_key(&self, text: &str) -> Result<ToggleKey, KeyParseError> {
        let key: ToggleKey = text.parse()?;
        self.arm(key);
        Ok(key)
    }

    pub fn arm(&self, key: ToggleKey) {
        self.listener.start(key);
        info!(%key, "toggle key set");
    }

    pub fn toggle_key(&self) -> Option<ToggleKey> {
        self.listener.key()
    }

    /// Stop listening and clicking, then wait up to `grace` for the workers to
    /// finish. Returns false if some were still running at the deadline.
    pub fn shutdown(&self, grace: Duration) -> bool {
        self.listener.stop();
        let workers = {
            let mut state = self.state.lock();
            state.enabled = false;
            state.running.store(false, Ordering::Relaxed);
            mem::take(&mut state.workers)
        };

        let deadline = Instant::now() + grace;
        loop {
            let pending = workers.iter().filter(|h| !h.is_finished()).count();
            if pending == 0 {
                return true;
            }
            if Instant::now() >= deadline {
                warn!(pending, "click workers still running at shutdown");
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn spawn_workers(&self, running: &Arc<AtomicBool>) -> Vec<JoinHandle<()>> {
        (0..self.settings.workers)
            .filter_map(|id| {
                let worker = ClickLoop::new(
                    id,
                    Arc::clone(running),
                    Arc::clone(&self.clicker),
                    Arc::clone(&self.random),
                    self.settings.base_interval,
                );
                worker
                    .spawn()
                    .map_err(|err| warn!(worker = id, %err, "failed to spawn click worker"))
                    .ok()
            })
            .collect()
    }
}

impl Toggle for ToggleController {
    fn toggle(&self) -> bool {
        let mut state = self.state.lock();
        state.enabled = !state.enabled;
        if state.enabled {
            let running = Arc::new(AtomicBool::new(true));
            state.workers = self.spawn_workers(&running);
            state.running = running;
            info!(workers = state.workers.len(), "clicking on");
        } else {
            // Workers notice the flag on their next wake-up; nothing is joined.
            state.running.store(false, Ordering::Relaxed);
            state.workers.clear();
            info!("clicking off");
        }
        state.enabled
    }
}
