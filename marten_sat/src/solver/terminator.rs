/*!
Cooperative cancellation and suspension of solver calls.

One [Terminator] is created per cube engine and connected to every solver instance
the engine's threads own.
Solver calls poll [is_interrupted](Terminator::is_interrupted) on each search step,
and hold at [hold_while_paused](Terminator::hold_while_paused) between steps while
the engine is suspended.

Interruption is idempotent, and wakes any solver holding at the pause gate so that
a suspended job can still be torn down.
*/

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Condvar, Mutex,
};

/// The interrupt flag and pause gate shared by the solver threads of one engine.
#[derive(Default)]
pub struct Terminator {
    interrupted: AtomicBool,
    paused: Mutex<bool>,
    gate: Condvar,
}

impl Terminator {
    pub fn new() -> Self {
        Terminator::default()
    }

    /// Requests termination of every connected solver call.
    ///
    /// Wakes solvers holding at the pause gate, as interruption overrides suspension.
    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::Release);
        self.gate.notify_all();
    }

    /// True iff termination has been requested.
    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Acquire)
    }

    /// Closes the pause gate: solver calls hold at their next poll.
    pub fn pause(&self) {
        *self.paused.lock().unwrap() = true;
    }

    /// Opens the pause gate and wakes any holding solver call.
    pub fn unpause(&self) {
        *self.paused.lock().unwrap() = false;
        self.gate.notify_all();
    }

    /// Blocks while the gate is closed, unless termination has been requested.
    pub fn hold_while_paused(&self) {
        let mut paused = self.paused.lock().unwrap();
        while *paused && !self.is_interrupted() {
            paused = self.gate.wait(paused).unwrap();
        }
    }
}

#[cfg(test)]
mod terminator_tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn interrupt_is_idempotent() {
        let terminator = Terminator::new();

        terminator.interrupt();
        terminator.interrupt();

        assert!(terminator.is_interrupted());
    }

    #[test]
    fn interrupt_releases_the_pause_gate() {
        let terminator = Arc::new(Terminator::new());
        terminator.pause();

        let held = {
            let terminator = terminator.clone();
            std::thread::spawn(move || terminator.hold_while_paused())
        };

        terminator.interrupt();
        held.join().unwrap();
    }
}
