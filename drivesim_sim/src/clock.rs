//! Virtual clock implementing DriveContext for deterministic testing.

use drivesim_env::{DriveContext, TickFn, TimerId};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::trace;

/// A repeating timer waiting on the virtual clock.
struct ManualTimer {
    period_ns: u64,
    next_due_ns: u64,
    on_tick: TickFn,
}

/// Simulation context backed by a manually advanced clock.
///
/// Timers never fire on their own. [`ManualContext::advance`] moves virtual
/// time forward and runs every callback that falls due on the way, in due
/// order, so a test controls exactly how many ticks happen.
pub struct ManualContext {
    /// Current virtual time (nanoseconds since simulation start)
    virtual_time_ns: Arc<Mutex<u64>>,

    /// Pending timers by id
    timers: Arc<Mutex<BTreeMap<TimerId, ManualTimer>>>,

    /// Next timer id
    next_timer: Arc<AtomicU64>,
}

impl ManualContext {
    pub fn new() -> Self {
        Self {
            virtual_time_ns: Arc::new(Mutex::new(0)),
            timers: Arc::new(Mutex::new(BTreeMap::new())),
            next_timer: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Creates an Arc-wrapped context for sharing.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Advances virtual time by `duration`, firing due timers.
    ///
    /// Returns the ids of the timers that fired, in firing order.
    pub fn advance(&self, duration: Duration) -> Vec<TimerId> {
        let target = self.time_ns() + duration.as_nanos() as u64;
        let mut fired = Vec::new();

        while let Some((id, due, on_tick)) = self.pop_due(target) {
            *self.lock_time() = due;
            // Callback runs without any lock held so it may cancel timers
            on_tick(id);
            fired.push(id);
        }

        *self.lock_time() = target;
        fired
    }

    /// Number of timers that have not been cancelled.
    pub fn pending_timers(&self) -> usize {
        self.lock_timers().len()
    }

    /// Returns the current virtual time in nanoseconds.
    pub fn time_ns(&self) -> u64 {
        *self.lock_time()
    }

    /// Earliest timer due at or before `target`, rescheduled one period on.
    fn pop_due(&self, target: u64) -> Option<(TimerId, u64, TickFn)> {
        let mut timers = self.lock_timers();
        let (&id, timer) = timers
            .iter_mut()
            .filter(|(_, t)| t.next_due_ns <= target)
            .min_by_key(|(id, t)| (t.next_due_ns, **id))?;

        let due = timer.next_due_ns;
        timer.next_due_ns += timer.period_ns;
        Some((id, due, timer.on_tick.clone()))
    }

    fn lock_time(&self) -> std::sync::MutexGuard<'_, u64> {
        self.virtual_time_ns.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_timers(&self) -> std::sync::MutexGuard<'_, BTreeMap<TimerId, ManualTimer>> {
        self.timers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ManualContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ManualContext {
    fn clone(&self) -> Self {
        Self {
            virtual_time_ns: Arc::clone(&self.virtual_time_ns),
            timers: Arc::clone(&self.timers),
            next_timer: Arc::clone(&self.next_timer),
        }
    }
}

impl DriveContext for ManualContext {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.time_ns())
    }

    fn schedule_repeating(&self, period: Duration, on_tick: TickFn) -> TimerId {
        let id = TimerId(self.next_timer.fetch_add(1, Ordering::Relaxed));
        // A zero period would fire forever within a single advance
        let period_ns = (period.as_nanos() as u64).max(1);
        let timer = ManualTimer {
            period_ns,
            next_due_ns: self.time_ns() + period_ns,
            on_tick,
        };
        self.lock_timers().insert(id, timer);
        id
    }

    fn cancel(&self, timer: TimerId) {
        self.lock_timers().remove(&timer);
    }

    fn spawn<F>(&self, name: &str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        trace!(task = name, now = ?self.now(), "spawn");
        tokio::spawn(future);
    }
}
