//! # Subscription handle and demand bookkeeping.
//!
//! A [`Subscription`] is handed to a subscriber in `on_subscribe` and is the
//! only way it talks back to the source: [`Subscription::request`] grants more
//! demand, [`Subscription::cancel`] stops delivery for good.
//!
//! Every source keeps its side of the contract in a [`DemandState`]:
//! ```text
//! request(n) ──► requested += n (saturating at UNBOUNDED)
//! emit value ──► try_take(): requested > 0 ? requested -= 1 : refuse
//! terminal   ──► terminate(): first caller wins, later emissions refused
//! cancel()   ──► cancelled = true, token fired (timers released)
//! ```
//!
//! ## Rules
//! - Demand never goes negative; `UNBOUNDED` is never decremented.
//! - `request(0)` and requests while unbounded change nothing.
//! - After cancel or terminal, every `try_take` is refused.
//! - State is read and updated under one lock, so a decision to emit is never
//!   based on stale demand.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Demand sentinel meaning "no limit".
pub const UNBOUNDED: u64 = u64::MAX;

/// Source-side reaction to subscriber requests.
pub(crate) trait Control: Send + Sync {
    fn request(&self, n: u64);
    fn cancel(&self);
}

/// Handle a subscriber uses to request demand or cancel.
///
/// Cheap to clone; all clones control the same attachment.
#[derive(Clone)]
pub struct Subscription {
    control: Arc<dyn Control>,
}

impl Subscription {
    pub(crate) fn new(control: Arc<dyn Control>) -> Self {
        Self { control }
    }

    /// A subscription that ignores requests and cancellation.
    ///
    /// Used when a source fails before it has anything to control.
    pub(crate) fn noop() -> Self {
        Self::new(Arc::new(Noop))
    }

    /// Grants `n` more values. `0` is a no-op; use [`UNBOUNDED`] for no limit.
    pub fn request(&self, n: u64) {
        if n == 0 {
            return;
        }
        self.control.request(n);
    }

    /// Cancels the attachment. Idempotent; no terminal signal follows.
    pub fn cancel(&self) {
        self.control.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

struct Noop;

impl Control for Noop {
    fn request(&self, _n: u64) {}
    fn cancel(&self) {}
}

#[derive(Debug, Default)]
struct DemandInner {
    requested: u64,
    cancelled: bool,
    terminated: bool,
}

/// Outstanding demand plus cancellation/termination flags of one attachment.
pub(crate) struct DemandState {
    inner: Mutex<DemandInner>,
    token: CancellationToken,
}

impl DemandState {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(DemandInner::default()),
            token: CancellationToken::new(),
        }
    }

    /// Adds `n` to outstanding demand.
    ///
    /// Returns `false` when the attachment is already cancelled or terminated.
    pub(crate) fn request(&self, n: u64) -> bool {
        let mut inner = self.inner.lock();
        if inner.cancelled || inner.terminated {
            return false;
        }
        inner.requested = inner.requested.saturating_add(n);
        true
    }

    /// Consumes one unit of demand if available.
    pub(crate) fn try_take(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.cancelled || inner.terminated || inner.requested == 0 {
            return false;
        }
        if inner.requested != UNBOUNDED {
            inner.requested -= 1;
        }
        true
    }

    /// Outstanding demand (0 once cancelled or terminated).
    pub(crate) fn outstanding(&self) -> u64 {
        let inner = self.inner.lock();
        if inner.cancelled || inner.terminated {
            0
        } else {
            inner.requested
        }
    }

    /// Marks the attachment cancelled.
    ///
    /// Returns `true` only for the call that performed the transition.
    pub(crate) fn cancel(&self) -> bool {
        let first = {
            let mut inner = self.inner.lock();
            if inner.cancelled || inner.terminated {
                false
            } else {
                inner.cancelled = true;
                true
            }
        };
        self.token.cancel();
        first
    }

    /// Claims the right to deliver the terminal signal.
    ///
    /// Returns `true` exactly once, and never after a cancellation.
    pub(crate) fn terminate(&self) -> bool {
        let won = {
            let mut inner = self.inner.lock();
            if inner.cancelled || inner.terminated {
                false
            } else {
                inner.terminated = true;
                inner.requested = 0;
                true
            }
        };
        if won {
            self.token.cancel();
        }
        won
    }

    /// True once cancelled or terminated.
    pub(crate) fn is_done(&self) -> bool {
        let inner = self.inner.lock();
        inner.cancelled || inner.terminated
    }

    /// Token fired when the attachment ends for any reason.
    pub(crate) fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demand_is_consumed_one_by_one() {
        let demand = DemandState::new();
        assert!(!demand.try_take());
        assert!(demand.request(2));
        assert!(demand.try_take());
        assert!(demand.try_take());
        assert!(!demand.try_take());
        assert_eq!(demand.outstanding(), 0);
    }

    #[test]
    fn unbounded_demand_saturates_and_never_decrements() {
        let demand = DemandState::new();
        demand.request(5);
        demand.request(UNBOUNDED);
        assert_eq!(demand.outstanding(), UNBOUNDED);
        for _ in 0..1_000 {
            assert!(demand.try_take());
        }
        demand.request(7);
        assert_eq!(demand.outstanding(), UNBOUNDED);
    }

    #[test]
    fn cancel_refuses_further_emission_and_fires_token() {
        let demand = DemandState::new();
        demand.request(10);
        let token = demand.token();
        assert!(demand.cancel());
        assert!(!demand.cancel());
        assert!(token.is_cancelled());
        assert!(!demand.try_take());
        assert!(!demand.request(1));
        assert!(!demand.terminate());
    }

    #[test]
    fn terminate_wins_only_once() {
        let demand = DemandState::new();
        assert!(demand.terminate());
        assert!(!demand.terminate());
        assert!(demand.is_done());
        assert!(!demand.cancel());
        assert!(demand.token().is_cancelled());
    }

    #[test]
    fn zero_request_through_handle_is_ignored() {
        struct Counting(Mutex<Vec<u64>>);
        impl Control for Counting {
            fn request(&self, n: u64) {
                self.0.lock().push(n);
            }
            fn cancel(&self) {}
        }

        let control = Arc::new(Counting(Mutex::new(Vec::new())));
        let sub = Subscription::new(control.clone());
        sub.request(0);
        sub.request(3);
        assert_eq!(*control.0.lock(), vec![3]);
    }
}
