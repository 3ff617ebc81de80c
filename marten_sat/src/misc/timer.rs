//! A process-relative clock, read as seconds.
//!
//! Lifecycle bookkeeping (arrival, activation, abort) and the demand/temperature
//! functions all work in seconds since some fixed origin.
//! The functions take the current reading as an argument, so tests may drive ages
//! directly, and a [Timer] provides the reading everywhere wall-clock time is meant.

use std::time::Instant;

/// A fixed origin from which elapsed seconds are read.
#[derive(Clone, Copy, Debug)]
pub struct Timer {
    origin: Instant,
}

impl Timer {
    /// A timer with its origin at the moment of the call.
    pub fn start() -> Self {
        Timer {
            origin: Instant::now(),
        }
    }

    /// Seconds elapsed since the origin.
    pub fn elapsed_seconds(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Timer::start()
    }
}
