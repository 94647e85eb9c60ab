//! # Debouncer
//!
//! A cancellable one-shot timer. Every `arm` replaces the pending timer, so a
//! burst of edits produces a single recompute once the input goes quiet.
//!
//! ```text
//!  edits:   x  x   x          x
//!  timer:   ├──┼───┼─────────►│fire          ├──────────►│fire
//!           arm re  re                      arm
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::task::JoinHandle;
use tracing::debug;

/// Fires one message on its channel `delay` after the last [`arm`](Self::arm).
///
/// Every fire carries the generation it was armed under. `arm` and `cancel`
/// bump the generation, so a fire that was already queued when the timer was
/// replaced never reaches the caller.
#[derive(Debug)]
pub struct Debouncer {
    pending: Option<JoinHandle<()>>,
    fire_tx: mpsc::UnboundedSender<u64>,
    generation: Arc<AtomicU64>,
}

/// Receiving end of a [`Debouncer`]; yields only fires of the current timer.
#[derive(Debug)]
pub struct Fired {
    fire_rx: mpsc::UnboundedReceiver<u64>,
    generation: Arc<AtomicU64>,
}

impl Debouncer {
    /// Creates a disarmed debouncer and the receiver its timer fires into.
    pub fn new() -> (Self, Fired) {
        let (fire_tx, fire_rx) = mpsc::unbounded_channel();
        let generation = Arc::new(AtomicU64::new(0));
        (
            Debouncer {
                pending: None,
                fire_tx,
                generation: Arc::clone(&generation),
            },
            Fired {
                fire_rx,
                generation,
            },
        )
    }

    /// Starts the timer, cancelling any timer already running.
    pub fn arm(&mut self, delay: Duration) {
        self.cancel();

        let generation = self.generation.load(Ordering::SeqCst);
        let fire_tx = self.fire_tx.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = fire_tx.send(generation);
        }));
        debug!(delay_ms = delay.as_millis() as u64, generation, "Debounce timer armed");
    }

    /// Stops the pending timer, if any, and voids a fire it already queued.
    pub fn cancel(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// True while a timer is waiting to fire.
    pub fn is_armed(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl Fired {
    /// Waits for the current timer to fire. `None` once the debouncer is gone.
    ///
    /// Cancel safe: a fire is consumed only when this returns.
    pub async fn recv(&mut self) -> Option<()> {
        loop {
            let generation = self.fire_rx.recv().await?;
            if self.is_current(generation) {
                return Some(());
            }
            debug!(generation, "Stale debounce fire skipped");
        }
    }

    /// Non-blocking [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Result<(), TryRecvError> {
        loop {
            let generation = self.fire_rx.try_recv()?;
            if self.is_current(generation) {
                return Ok(());
            }
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        generation == self.generation.load(Ordering::SeqCst)
    }
}
