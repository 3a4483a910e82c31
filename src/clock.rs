//! A `Clock` seam so the engine never calls `Instant::now()` directly;
//! tests substitute `TestClock`, which can be advanced by hand instead
//! of actually sleeping (spec §9: "drive it with a synthetic clock").

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

pub trait Clock {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

pub struct TestClock {
    current: Cell<Instant>,
}

impl TestClock {
    pub fn new() -> Self {
        TestClock {
            current: Cell::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.current.set(self.current.get() + by);
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        self.current.get()
    }
}

/// Lets a test keep a handle to advance the clock after handing a copy
/// to `Server::without_listener`, which otherwise takes `C` by value.
impl Clock for Rc<TestClock> {
    fn now(&self) -> Instant {
        self.as_ref().now()
    }
}
