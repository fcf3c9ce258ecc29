//! Single-fire completion flags.
//!
//! An [`EventFlag`] is the synchronization primitive behind waits like
//! "this frame has been accepted": one party fires it exactly once, any
//! number of observers poll it between kernel steps. Because the timeline
//! is single-threaded and the flag is checked at event boundaries rather
//! than inside agent code, there is no missed-edge race to guard against.

use std::cell::Cell;
use std::rc::Rc;

/// A completion signal that becomes set exactly once.
///
/// Clones share the underlying flag. Firing an already-set flag is a
/// protocol bug in the producer and trips a debug assertion.
#[derive(Clone, Debug, Default)]
pub struct EventFlag(Rc<Cell<bool>>);

impl EventFlag {
    /// Creates a new unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag. Must be called at most once per flag.
    pub fn fire(&self) {
        debug_assert!(!self.0.get(), "completion flag fired twice");
        self.0.set(true);
    }

    /// Returns whether the flag has been fired.
    pub fn is_set(&self) -> bool {
        self.0.get()
    }
}
