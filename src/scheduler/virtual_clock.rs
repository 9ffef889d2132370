//! # Virtual clock for deterministic time.
//!
//! [`VirtualClock`] is a logical clock that only moves when told to. Time-based
//! sources register callbacks on it, and tests release them by advancing the
//! clock instead of sleeping.
//!
//! ## Architecture
//! ```text
//! schedule(delay, task) ──► BinaryHeap<(at, seq)>  (min-heap, seq = registration order)
//!
//! advance_to(target):
//!   loop {
//!     pop earliest entry with at <= target  (skip cancelled)
//!     now = entry.at                          (callback never sees an earlier time)
//!     run callback                            (lock released; may schedule more)
//!     periodic? re-push at at + period
//!   }
//!   now = target
//! ```
//!
//! ## Rules
//! - Time starts at zero and never decreases.
//! - Entries run in ascending time; ties run in registration order.
//! - Callbacks never overlap and never run while the clock lock is held.
//!   Advances are serialized by a separate drive lock; it is re-entrant, so a
//!   callback may advance the clock it runs on.
//! - Callbacks scheduled during an advance run in the same advance if due.
//! - Cancelled entries are dropped when they reach the head of the queue.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, ReentrantMutex};
use tokio_util::sync::CancellationToken;

type Callback = Box<dyn FnMut() + Send>;

struct Entry {
    at: Duration,
    seq: u64,
    period: Option<Duration>,
    token: CancellationToken,
    task: Callback,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Reversed: BinaryHeap is a max-heap, the earliest entry must surface first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at
            .cmp(&self.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct ClockState {
    now: Duration,
    next_seq: u64,
    queue: BinaryHeap<Entry>,
}

impl ClockState {
    fn push(&mut self, mut entry: Entry) {
        entry.seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(entry);
    }

    /// Pops the earliest live entry due at or before `target`.
    fn pop_due(&mut self, target: Duration) -> Option<Entry> {
        while let Some(head) = self.queue.peek() {
            if head.token.is_cancelled() {
                self.queue.pop();
                continue;
            }
            if head.at > target {
                return None;
            }
            return self.queue.pop();
        }
        None
    }

    fn next_due(&mut self) -> Option<Duration> {
        while let Some(head) = self.queue.peek() {
            if head.token.is_cancelled() {
                self.queue.pop();
                continue;
            }
            return Some(head.at);
        }
        None
    }
}

/// Logical clock with a queue of scheduled callbacks.
///
/// Cheap to clone; clones share the same time and queue.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::time::Duration;
/// use fluxvisor::VirtualClock;
///
/// let clock = VirtualClock::new();
/// let fired = Arc::new(AtomicU32::new(0));
/// let f = fired.clone();
/// clock.schedule_periodic(Duration::from_secs(1), Duration::from_secs(1), move || {
///     f.fetch_add(1, Ordering::SeqCst);
/// });
///
/// clock.advance(Duration::from_millis(2_500));
/// assert_eq!(fired.load(Ordering::SeqCst), 2);
/// assert_eq!(clock.now(), Duration::from_millis(2_500));
/// ```
#[derive(Clone, Default)]
pub struct VirtualClock {
    state: Arc<Mutex<ClockState>>,
    drive: Arc<ReentrantMutex<()>>,
}

impl VirtualClock {
    /// Creates a clock at time zero with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current logical time since the clock was created.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Number of live (not cancelled) scheduled entries.
    pub fn pending(&self) -> usize {
        self.state
            .lock()
            .queue
            .iter()
            .filter(|e| !e.token.is_cancelled())
            .count()
    }

    /// True when nothing live is scheduled.
    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Runs `task` once, `delay` after the current time.
    ///
    /// Cancel the returned token to drop the entry.
    pub fn schedule<F>(&self, delay: Duration, task: F) -> CancellationToken
    where
        F: FnOnce() + Send + 'static,
    {
        let mut once = Some(task);
        let token = CancellationToken::new();
        self.insert(
            delay,
            None,
            token.clone(),
            Box::new(move || {
                if let Some(f) = once.take() {
                    f();
                }
            }),
        );
        token
    }

    /// Runs `task` at `now + initial_delay`, then every `period`.
    ///
    /// A zero `period` is raised to one nanosecond so an advance always
    /// terminates.
    pub fn schedule_periodic<F>(
        &self,
        initial_delay: Duration,
        period: Duration,
        task: F,
    ) -> CancellationToken
    where
        F: FnMut() + Send + 'static,
    {
        let token = CancellationToken::new();
        self.schedule_periodic_until(initial_delay, period, token.clone(), task);
        token
    }

    /// Same as [`schedule_periodic`](Self::schedule_periodic), stopped by a caller-owned token.
    pub(crate) fn schedule_periodic_until<F>(
        &self,
        initial_delay: Duration,
        period: Duration,
        token: CancellationToken,
        task: F,
    ) where
        F: FnMut() + Send + 'static,
    {
        let period = period.max(Duration::from_nanos(1));
        self.insert(initial_delay, Some(period), token, Box::new(task));
    }

    fn insert(
        &self,
        delay: Duration,
        period: Option<Duration>,
        token: CancellationToken,
        task: Callback,
    ) {
        let mut state = self.state.lock();
        let at = state.now.saturating_add(delay);
        state.push(Entry {
            at,
            seq: 0,
            period,
            token,
            task,
        });
    }

    /// Moves time forward by `by` and runs every callback that becomes due.
    pub fn advance(&self, by: Duration) {
        let _drive = self.drive.lock();
        let target = self.now().saturating_add(by);
        self.advance_to(target);
    }

    /// Moves time forward to `target` and runs every callback due by then.
    ///
    /// A `target` in the past still runs callbacks already due, but time does
    /// not move backwards.
    pub fn advance_to(&self, target: Duration) {
        let _drive = self.drive.lock();
        loop {
            let mut entry = {
                let mut state = self.state.lock();
                let target = target.max(state.now);
                match state.pop_due(target) {
                    Some(entry) => {
                        state.now = entry.at.max(state.now);
                        entry
                    }
                    None => {
                        state.now = target;
                        return;
                    }
                }
            };

            (entry.task)();

            if let Some(period) = entry.period {
                if !entry.token.is_cancelled() {
                    entry.at = entry.at.saturating_add(period);
                    self.state.lock().push(entry);
                }
            }
        }
    }

    /// Advances exactly to the nearest pending entry and runs what is due then.
    ///
    /// Returns `false` (and leaves time unchanged) when nothing is scheduled.
    pub fn advance_to_next_event(&self) -> bool {
        let _drive = self.drive.lock();
        let next = self.state.lock().next_due();
        match next {
            Some(at) => {
                self.advance_to(at);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for VirtualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("VirtualClock")
            .field("now", &state.now)
            .field("queued", &state.queue.len())
            .finish()
    }
}
