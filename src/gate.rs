use std::sync::{Condvar, Mutex};

/// A one-shot start barrier.
///
/// Workers park in [`Gate::wait`] until the coordinator calls [`Gate::open`]
/// exactly once; every current and future waiter then passes. The blocking
/// equivalent of spinning on a shared `done` flag, minus the burned CPU.
pub struct Gate {
    opened: Mutex<bool>,
    signal: Condvar,
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

impl Gate {
    pub fn new() -> Self {
        Gate { opened: Mutex::new(false), signal: Condvar::new() }
    }

    pub fn open(&self) {
        let mut opened = self.opened.lock().unwrap();
        *opened = true;
        self.signal.notify_all();
    }

    pub fn wait(&self) {
        let mut opened = self.opened.lock().unwrap();
        while !*opened {
            opened = self.signal.wait(opened).unwrap();
        }
    }
}

/// Counts outstanding work items down to zero.
///
/// Built with the item count, decremented once per finished item via
/// [`Countdown::arrive`]; [`Countdown::wait`] blocks until the count hits
/// zero (and returns immediately if it started there). Waiters observe
/// everything that happened before the final `arrive`, per the usual
/// mutex/condvar ordering.
pub struct Countdown {
    remaining: Mutex<usize>,
    drained: Condvar,
}

impl Countdown {
    pub fn new(items: usize) -> Self {
        Countdown { remaining: Mutex::new(items), drained: Condvar::new() }
    }

    /// Marks one item finished. Calling more times than `items` is a bug.
    pub fn arrive(&self) {
        let mut remaining = self.remaining.lock().unwrap();
        debug_assert!(*remaining > 0, "more arrivals than items");
        *remaining -= 1;
        if *remaining == 0 {
            self.drained.notify_all();
        }
    }

    pub fn wait(&self) {
        let mut remaining = self.remaining.lock().unwrap();
        while *remaining > 0 {
            remaining = self.drained.wait(remaining).unwrap();
        }
    }
}
