//! Work-in-progress drain loop.
//!
//! Sources call [`Serializer::drain`] whenever something changed (demand
//! arrived, a value was buffered, an upstream finished). Only one caller runs
//! the work at a time; concurrent or re-entrant callers just record that
//! another pass is needed and return immediately.
//!
//! ```text
//! drain():  wip 0 → 1   run work ──► wip -= missed ──► 0? done : run again
//!           wip n → n+1 return (the active drainer will loop)
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub(crate) struct Serializer {
    wip: AtomicUsize,
}

impl Serializer {
    pub(crate) fn new() -> Self {
        Self {
            wip: AtomicUsize::new(0),
        }
    }

    /// Runs `work` until no further pass was requested while it ran.
    pub(crate) fn drain(&self, mut work: impl FnMut()) {
        if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
            return;
        }
        let mut missed = 1;
        loop {
            work();
            let prev = self.wip.fetch_sub(missed, Ordering::AcqRel);
            missed = prev - missed;
            if missed == 0 {
                break;
            }
        }
    }
}
