//! Production implementation of DriveContext using Tokio.

use crate::context::{DriveContext, TickFn};
use crate::types::TimerId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Production context backed by the Tokio runtime.
///
/// Timers are Tokio tasks driving a `tokio::time::Interval`; cancelling a
/// timer aborts its task. Must be used from within a Tokio runtime.
pub struct TokioContext {
    /// Start time for monotonic duration calculations
    start: Instant,

    /// Live timer tasks by id
    timers: Mutex<HashMap<TimerId, JoinHandle<()>>>,

    /// Next timer id
    next_timer: AtomicU64,
}

impl TokioContext {
    /// Creates a new TokioContext.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            timers: Mutex::new(HashMap::new()),
            next_timer: AtomicU64::new(1),
        }
    }

    /// Creates an Arc-wrapped context for sharing across tasks.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of timers that have not been cancelled.
    pub fn active_timers(&self) -> usize {
        self.timers.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for TokioContext {
    fn default() -> Self {
        Self::new()
    }
}

impl DriveContext for TokioContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn schedule_repeating(&self, period: Duration, on_tick: TickFn) -> TimerId {
        let id = TimerId(self.next_timer.fetch_add(1, Ordering::Relaxed));

        let handle = tokio::spawn(async move {
            let first = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(first, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                on_tick(id);
            }
        });

        self.timers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, handle);
        id
    }

    fn cancel(&self, timer: TimerId) {
        let handle = self
            .timers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&timer);
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    fn spawn<F>(&self, _name: &str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(future);
    }
}

impl Drop for TokioContext {
    fn drop(&mut self) {
        let timers = self.timers.get_mut().unwrap_or_else(|e| e.into_inner());
        for (_, handle) in timers.drain() {
            handle.abort();
        }
    }
}
