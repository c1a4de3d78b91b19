//! Core environment context trait for drivesim.

use crate::types::TimerId;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Callback invoked on every tick of a repeating timer.
///
/// Receives the id of the timer that fired so that owners can discard ticks
/// from a timer they have already cancelled.
pub type TickFn = Arc<dyn Fn(TimerId) + Send + Sync + 'static>;

/// The central interface for time and task scheduling.
///
/// The simulation controller never touches a wall clock or a runtime
/// directly. Everything that would make it non-deterministic goes through
/// this trait.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time::interval` and `tokio::spawn`
/// - **Simulation**: `ManualContext` - virtual clock, timers fire only when advanced
pub trait DriveContext: Send + Sync + 'static {
    /// Returns the monotonic time since context creation.
    ///
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;

    /// Schedules `on_tick` to run every `period`, first firing one period
    /// from now.
    ///
    /// Returns an id that can be passed to [`DriveContext::cancel`].
    fn schedule_repeating(&self, period: Duration, on_tick: TickFn) -> TimerId;

    /// Cancels a repeating timer.
    ///
    /// Idempotent: cancelling an unknown or already cancelled timer is a no-op.
    fn cancel(&self, timer: TimerId);

    /// Spawns a background task.
    ///
    /// In production: `tokio::spawn`
    fn spawn<F>(&self, name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
