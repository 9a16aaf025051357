use enigo::{self, MouseButton, MouseControllable};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};
use tracing::debug;

use crate::random::RandomSource;

// -------------- Click Engine --------------

/// Synthetic click primitive.
pub trait Clicker: Send + Sync {
    /// Left click at the current pointer position.
    fn click(&self);
}

static ENIGO: Lazy<Mutex<enigo::Enigo>> = Lazy::new(|| Mutex::new(enigo::Enigo::new()));

/// Clicks through the platform input layer.
pub struct EnigoClicker;

impl Clicker for EnigoClicker {
    fn click(&self) {
        ENIGO.lock().mouse_click(MouseButton::Left);
    }
}

pub const DEFAULT_WORKERS: usize = 5;
pub const DEFAULT_CPS: f64 = 60.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClickSettings {
    /// Workers spawned on every enable.
    pub workers: usize,
    /// Sleep between clicks before jitter is added.
    pub base_interval: Duration,
}

impl ClickSettings {
    pub fn new(workers: usize, clicks_per_sec: f64) -> Self {
        Self {
            workers: workers.max(1),
            base_interval: Duration::from_secs_f64(1.0 / clicks_per_sec),
        }
    }
}

impl Default for ClickSettings {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS, DEFAULT_CPS)
    }
}

/// One click-sleep worker.
///
/// Runs until `running` reads false. The flag is only ever read here; the
/// controller owns every write.
pub struct ClickLoop {
    id: usize,
    running: Arc<AtomicBool>,
    clicker: Arc<dyn Clicker>,
    random: Arc<RandomSource>,
    base_interval: Duration,
}

impl ClickLoop {
    pub fn new(
        id: usize,
        running: Arc<AtomicBool>,
        clicker: Arc<dyn Clicker>,
        random: Arc<RandomSource>,
        base_interval: Duration,
    ) -> Self {
        Self { id, running, clicker, random, base_interval }
    }

    /// Start the loop on a detached thread.
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(format!("click-{}", self.id))
            .spawn(move || self.run())
    }

    fn run(&self) {
        debug!(worker = self.id, "click worker started");
        let mut clicks: u64 = 0;
        while self.running.load(Ordering::Relaxed) {
            self.clicker.click();
            clicks += 1;
            thread::sleep(self.base_interval + self.random.next_jitter());
        }
        debug!(worker = self.id, clicks, "click worker stopped");
    }
}
