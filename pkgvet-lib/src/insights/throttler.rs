use core::time::Duration;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

/// Gates outbound insights requests: bounded concurrency, fixed-rate
/// pacing, and a service-requested hold on dispatch.
///
/// Wrap in an `Arc` via [`Throttler::new`] and call [`Throttler::acquire`]
/// before each request. At most `max_concurrent` permits are out at once,
/// and successive acquisitions are spaced so the request rate stays at or
/// below `requests_per_second`. When the service answers 429, any worker
/// can call [`Throttler::pause_for`] to hold new dispatches until the
/// `Retry-After` deadline.
///
/// The hold is a single deadline that only moves forward. There is no
/// resume step and no timer task: each waiter sleeps until the recorded
/// deadline and then re-reads it, so a hold extended mid-sleep is honored
/// and an elapsed one costs nothing. Requests already past the gate are
/// never interrupted.
#[derive(Debug)]
pub struct Throttler {
    semaphore: Arc<Semaphore>,
    /// Dispatch is held until this deadline. `None` or a past instant means
    /// the gate is open.
    hold_until: std::sync::Mutex<Option<Instant>>,
    /// Minimum spacing between successive acquisitions; zero disables pacing.
    min_gap: Duration,
    next_slot: tokio::sync::Mutex<Instant>,
}

impl Throttler {
    /// Create a throttler allowing `max_concurrent` inflight requests and at
    /// most `requests_per_second` acquisitions per second (0 = unpaced).
    pub fn new(max_concurrent: usize, requests_per_second: u32) -> Arc<Self> {
        let min_gap = if requests_per_second == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(1) / requests_per_second
        };

        Arc::new(Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            hold_until: std::sync::Mutex::new(None),
            min_gap,
            next_slot: tokio::sync::Mutex::new(Instant::now()),
        })
    }

    /// The hold deadline, if it is still in the future. An elapsed deadline
    /// is cleared on the way out.
    fn active_hold(&self) -> Option<Instant> {
        let mut guard = self.hold_until.lock().expect("lock not poisoned");
        match *guard {
            Some(deadline) if deadline > Instant::now() => Some(deadline),
            Some(_) => {
                *guard = None;
                None
            }
            None => None,
        }
    }

    /// Wait out any dispatch hold, acquire a concurrency slot, then wait out
    /// the rate gate.
    ///
    /// The returned permit must be held for the duration of the request.
    /// When it is dropped, the slot becomes available for another task.
    pub async fn acquire(&self) -> tokio::sync::OwnedSemaphorePermit {
        // The deadline may have been pushed out while we slept, so re-read
        // it after every wakeup.
        while let Some(deadline) = self.active_hold() {
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
        }

        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .expect("semaphore is never closed");

        if !self.min_gap.is_zero() {
            let wake_at = {
                let mut next_slot = self.next_slot.lock().await;
                let now = Instant::now();
                let slot = (*next_slot).max(now);
                *next_slot = slot + self.min_gap;
                slot
            };
            tokio::time::sleep_until(tokio::time::Instant::from_std(wake_at)).await;
        }

        permit
    }

    /// Returns whether a dispatch hold is currently in effect.
    pub fn is_paused(&self) -> bool {
        self.active_hold().is_some()
    }

    /// Hold new dispatches for at least `duration` from now.
    ///
    /// The deadline only moves forward: a call landing inside a longer hold
    /// changes nothing and returns `false`. Requests already inflight are
    /// not interrupted; tasks parked in [`acquire`](Self::acquire) stay
    /// parked until the deadline passes.
    pub fn pause_for(&self, duration: Duration) -> bool {
        let until = Instant::now() + duration;

        let mut guard = self.hold_until.lock().expect("lock not poisoned");
        if guard.is_some_and(|current| current >= until) {
            return false;
        }

        *guard = Some(until);
        true
    }
}
