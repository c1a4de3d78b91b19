//! Test doubles shared by the unit tests of this crate.

use drivesim_env::{DriveContext, TickFn, TimerId};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

/// Context that records timers instead of running them.
///
/// Tests fire ticks by hand through the controller, using
/// [`FakeContext::active_timer`] to learn the id.
#[derive(Default)]
pub struct FakeContext {
    timers: Mutex<BTreeMap<TimerId, Duration>>,
    scheduled: Mutex<u64>,
}

impl FakeContext {
    /// The only timer still active, if exactly one is.
    pub fn active_timer(&self) -> Option<TimerId> {
        let timers = self.timers.lock().unwrap();
        match timers.len() {
            1 => timers.keys().next().copied(),
            _ => None,
        }
    }

    pub fn active_count(&self) -> usize {
        self.timers.lock().unwrap().len()
    }

    /// Total timers ever scheduled.
    pub fn scheduled_count(&self) -> u64 {
        *self.scheduled.lock().unwrap()
    }

    pub fn period_of(&self, timer: TimerId) -> Option<Duration> {
        self.timers.lock().unwrap().get(&timer).copied()
    }
}

impl DriveContext for FakeContext {
    fn now(&self) -> Duration {
        Duration::ZERO
    }

    fn schedule_repeating(&self, period: Duration, _on_tick: TickFn) -> TimerId {
        let mut scheduled = self.scheduled.lock().unwrap();
        *scheduled += 1;
        let id = TimerId(*scheduled);
        self.timers.lock().unwrap().insert(id, period);
        id
    }

    fn cancel(&self, timer: TimerId) {
        self.timers.lock().unwrap().remove(&timer);
    }

    fn spawn<F>(&self, _name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(future);
    }
}
