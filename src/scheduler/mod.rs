// src/scheduler/mod.rs
//! Cooperative scheduling hooks for the planner's blocking wait.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Called repeatedly while the planner waits for motion buffer space.
/// Must not call back into the planner.
pub trait Idle: Send {
    fn idle(&mut self);
}

/// Yields the current thread to the OS scheduler.
#[derive(Debug, Clone, Copy, Default)]
pub struct YieldNow;

impl Idle for YieldNow {
    fn idle(&mut self) {
        std::thread::yield_now();
    }
}

/// Sleeps for a fixed period, for hosts where the consumer runs at a known rate.
#[derive(Debug, Clone, Copy)]
pub struct SleepIdle {
    pub period: Duration,
}

impl SleepIdle {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }
}

impl Default for SleepIdle {
    fn default() -> Self {
        Self::new(Duration::from_millis(1))
    }
}

impl Idle for SleepIdle {
    fn idle(&mut self) {
        std::thread::sleep(self.period);
    }
}

/// Adapts a closure, e.g. a background task runner, into an idle hook.
pub struct FnIdle<F>(pub F);

impl<F: FnMut() + Send> Idle for FnIdle<F> {
    fn idle(&mut self) {
        (self.0)()
    }
}

/// Emergency stop flag shared between the planner and whoever may abort it.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.stopped.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_handle_is_shared() {
        let handle = StopHandle::new();
        let other = handle.clone();
        other.request_stop();
        assert!(handle.is_stop_requested());
        handle.reset();
        assert!(!other.is_stop_requested());
    }

    #[test]
    fn test_fn_idle_runs_closure() {
        let mut calls = 0;
        {
            let mut idle = FnIdle(|| calls += 1);
            idle.idle();
            idle.idle();
        }
        assert_eq!(calls, 2);
    }
}
