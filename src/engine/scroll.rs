//! Scroll offset polling.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Source of the page's current vertical scroll offset.
pub trait ScrollProvider: Send + Sync {
    fn scroll_y(&self) -> f64;
}

/// Background poller that reports the scroll offset whenever it changes.
///
/// The thread stops when the watcher is dropped.
pub struct ScrollWatcher {
    stop_tx: Option<mpsc::Sender<()>>,
    updates: mpsc::Receiver<f64>,
    handle: Option<JoinHandle<()>>,
}

impl ScrollWatcher {
    pub fn spawn(provider: Arc<dyn ScrollProvider>, interval: Duration) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (tx, updates) = mpsc::channel();

        let handle = std::thread::spawn(move || {
            let mut last: Option<f64> = None;
            loop {
                let y = provider.scroll_y();
                if last != Some(y) {
                    last = Some(y);
                    if tx.send(y).is_err() {
                        break;
                    }
                }
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    _ => break,
                }
            }
        });

        Self {
            stop_tx: Some(stop_tx),
            updates,
            handle: Some(handle),
        }
    }

    /// Most recent offset reported since the last call, if any.
    pub fn latest(&self) -> Option<f64> {
        self.updates.try_iter().last()
    }
}

impl Drop for ScrollWatcher {
    fn drop(&mut self) {
        self.stop_tx = None;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
