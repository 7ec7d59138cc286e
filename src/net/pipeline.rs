//! Debounced, latest-wins background loads.
//!
//! Every [`LoadPipeline::dispatch`] starts a worker thread that first waits
//! out the debounce delay and then runs the job. A later dispatch
//! supersedes the earlier one: a worker still waiting is woken and exits
//! without running its job, and a worker that already ran has its result
//! dropped because its generation is no longer current.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A finished job, tagged with the generation it was dispatched under.
struct Delivery<T> {
    generation: u64,
    result: T,
}

pub struct LoadPipeline<T> {
    name: &'static str,
    debounce: Duration,
    generation: Arc<AtomicU64>,
    /// Dropping this wakes the worker currently sitting in its debounce wait.
    cancel_tx: Option<mpsc::Sender<()>>,
    tx: mpsc::Sender<Delivery<T>>,
    rx: mpsc::Receiver<Delivery<T>>,
    in_flight: Option<u64>,
}

impl<T: Send + 'static> LoadPipeline<T> {
    pub fn new(name: &'static str, debounce: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            name,
            debounce,
            generation: Arc::new(AtomicU64::new(0)),
            cancel_tx: None,
            tx,
            rx,
            in_flight: None,
        }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Current generation. Increments on every dispatch and cancel.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Schedule `job` after the debounce delay, superseding any earlier load.
    pub fn dispatch<F>(&mut self, job: F) -> u64
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
        // Replacing the sender disconnects the previous worker's wait.
        self.cancel_tx = Some(cancel_tx);
        self.in_flight = Some(generation);

        let current = Arc::clone(&self.generation);
        let tx = self.tx.clone();
        let debounce = self.debounce;
        let name = self.name;

        std::thread::spawn(move || {
            match cancel_rx.recv_timeout(debounce) {
                Err(RecvTimeoutError::Timeout) => {}
                _ => {
                    log::trace!("{}: load #{} cancelled during debounce", name, generation);
                    return;
                }
            }
            if current.load(Ordering::SeqCst) != generation {
                return;
            }

            let result = job();

            if current.load(Ordering::SeqCst) != generation {
                log::debug!("{}: dropping stale result of load #{}", name, generation);
                return;
            }
            let _ = tx.send(Delivery { generation, result });
        });

        generation
    }

    /// Abandon whatever is pending. Nothing dispatched so far will deliver.
    pub fn cancel(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cancel_tx = None;
        self.in_flight = None;
    }

    /// Take the current load's result if it has arrived.
    pub fn try_take(&mut self) -> Option<T> {
        loop {
            match self.rx.try_recv() {
                Ok(delivery) => {
                    if let Some(result) = self.accept(delivery) {
                        return Some(result);
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return None,
            }
        }
    }

    /// Block until the current load delivers or `timeout` passes.
    pub fn wait(&mut self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        while self.in_flight.is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            match self.rx.recv_timeout(remaining) {
                Ok(delivery) => {
                    if let Some(result) = self.accept(delivery) {
                        return Some(result);
                    }
                }
                Err(_) => return None,
            }
        }
        None
    }

    fn accept(&mut self, delivery: Delivery<T>) -> Option<T> {
        if self.in_flight == Some(delivery.generation) && delivery.generation == self.generation() {
            self.in_flight = None;
            Some(delivery.result)
        } else {
            None
        }
    }
}
