//! Pacing gate for generation starts
//!
//! One gate is shared by every caller in the process ([`PacingGate::global`]).
//! Reservations are handed out in lock order, so starts are FIFO and spaced
//! by at least the minimum interval.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::constants::defaults;

/// Shared pacing gate handle
pub type SharedPacingGate = Arc<PacingGate>;

static GLOBAL_GATE: Lazy<SharedPacingGate> =
    Lazy::new(|| PacingGate::shared(Duration::from_millis(defaults::MIN_GENERATION_INTERVAL_MS)));

pub struct PacingGate {
    /// Milliseconds; adjustable so a settings change keeps the same queue
    min_interval_ms: AtomicU64,
    /// Start time handed to the most recent reservation
    last_start: Mutex<Option<Instant>>,
}

impl PacingGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval_ms: AtomicU64::new(duration_ms(min_interval)),
            last_start: Mutex::new(None),
        }
    }

    pub fn shared(min_interval: Duration) -> SharedPacingGate {
        Arc::new(Self::new(min_interval))
    }

    /// The process-wide gate
    pub fn global() -> SharedPacingGate {
        GLOBAL_GATE.clone()
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms.load(Ordering::Relaxed))
    }

    /// Change the spacing for reservations made from now on
    pub fn set_min_interval(&self, min_interval: Duration) {
        self.min_interval_ms.store(duration_ms(min_interval), Ordering::Relaxed);
    }

    /// Reserve the next start slot and wait for it. Returns the time waited.
    ///
    /// The slot is computed under the lock; the sleep happens after the lock
    /// is released so later callers can queue their own slots meanwhile.
    pub async fn reserve(&self) -> Duration {
        let wait = {
            let mut last_start = self.last_start.lock().await;
            let now = Instant::now();
            let start = match *last_start {
                Some(previous) => (previous + self.min_interval()).max(now),
                None => now,
            };
            *last_start = Some(start);
            start - now
        };

        if !wait.is_zero() {
            log::debug!("Pacing gate: waiting {} ms before next start", wait.as_millis());
            sleep(wait).await;
        }
        wait
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
