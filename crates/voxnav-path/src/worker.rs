//! Background thread driving a navigation volume's tick loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::info;

use crate::scheduler::NavVolume;
use voxnav_octree::CollisionClassifier;

/// Owns the thread that ticks a [`NavVolume`] at its configured interval.
///
/// The worker is an explicitly owned handle, started with
/// [`NavWorker::start`] and stopped with [`NavWorker::stop`] or by dropping
/// it. Several workers for several volumes can run side by side.
pub struct NavWorker {
    should_run: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl NavWorker {
    /// Spawns the tick loop for `volume`.
    ///
    /// Each iteration runs one [`NavVolume::tick`] with the measured time
    /// since the previous iteration, then sleeps for the configured tick
    /// interval.
    pub fn start<C>(volume: Arc<NavVolume<C>>) -> Self
    where
        C: CollisionClassifier + Send + Sync + 'static,
    {
        let should_run = Arc::new(AtomicBool::new(true));
        let run_flag = Arc::clone(&should_run);
        let interval = volume.config().tick_interval;
        let max_tasks = volume.config().max_tasks_per_tick;

        let handle = thread::spawn(move || {
            info!("navigation worker started");
            let mut last = Instant::now();
            while run_flag.load(Ordering::Relaxed) {
                let now = Instant::now();
                volume.tick(now - last, max_tasks);
                last = now;
                thread::sleep(interval);
            }
            info!("navigation worker stopped");
        });

        Self {
            should_run,
            handle: Some(handle),
        }
    }

    /// Signals the loop to exit and joins the thread.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.should_run.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for NavWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
