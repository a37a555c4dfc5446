//! Simulated time and the wall clock that drives it.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Monotonic simulated time in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimulationClock {
    time: f64,
}

impl SimulationClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Move forward by `dt` seconds. Negative or non-finite steps are ignored.
    pub fn advance(&mut self, dt: f64) -> f64 {
        if dt.is_finite() && dt > 0.0 {
            self.time += dt;
        }
        self.time
    }

    pub fn reset(&mut self) {
        self.time = 0.0;
    }
}

/// Source of wall-clock timestamps, in seconds from an arbitrary origin.
pub trait WallClock {
    fn now(&self) -> f64;
}

/// Real time, measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl WallClock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Hand-driven clock. Clones share the same time, so a test (or a
/// fixed-step driver) can keep one handle and give another to the controller.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, seconds: f64) {
        self.now.set(self.now.get() + seconds);
    }

    pub fn set(&self, seconds: f64) {
        self.now.set(seconds);
    }
}

impl WallClock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_ignores_bad_steps() {
        let mut clock = SimulationClock::new();
        clock.advance(0.5);
        clock.advance(-1.0);
        clock.advance(f64::NAN);
        clock.advance(f64::INFINITY);
        assert_eq!(clock.time(), 0.5);
        clock.reset();
        assert_eq!(clock.time(), 0.0);
    }

    #[test]
    fn manual_clock_handles_share_time() {
        let driver = ManualClock::new();
        let handle = driver.clone();
        driver.advance(0.25);
        driver.advance(0.25);
        assert_eq!(handle.now(), 0.5);
        driver.set(2.0);
        assert_eq!(handle.now(), 2.0);
    }

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
