//! # Manually driven publisher.
//!
//! [`ManualPublisher`] lets a test push values and terminal signals by hand
//! and inspect how subscribers interacted with it.
//!
//! ## Rules
//! - Every pushed value goes to every attached subscriber that has demand.
//! - A subscriber with no outstanding demand cannot take a pushed value: it is
//!   terminated with [`StreamError::Backpressure`] and `next` reports the error.
//! - At most one terminal signal; anything pushed after it is rejected with
//!   [`StreamError::Protocol`].
//! - Subscribers attaching after the terminal signal receive it right away.
//!
//! ### Notes
//! Driver calls (`next`, `complete`, `error`) are expected to come from one
//! thread at a time; subscribers may request and cancel from anywhere.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::StreamError;
use crate::publishers::flux::{Flux, FluxKind, Value};
use crate::signals::{Control, DemandState, Subscription};
use crate::subscribers::Subscriber;

/// A hand-driven source for tests.
///
/// # Example
/// ```
/// use fluxvisor::{ManualPublisher, StepVerifier};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let publisher = ManualPublisher::new();
/// let driver = publisher.clone();
///
/// StepVerifier::create(publisher.flux())
///     .then(move || driver.emit(["a", "b"]).unwrap())
///     .expect_next("a")
///     .expect_next("b")
///     .expect_complete()
///     .verify()
///     .await
///     .unwrap();
///
/// assert!(publisher.was_subscribed());
/// assert!(publisher.was_requested());
/// # }
/// ```
pub struct ManualPublisher<T> {
    state: Arc<ManualState<T>>,
}

impl<T> Clone for ManualPublisher<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Value> Default for ManualPublisher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Value> ManualPublisher<T> {
    /// Creates a publisher with no subscribers.
    pub fn new() -> Self {
        Self {
            state: Arc::new(ManualState {
                subscribers: Mutex::new(Vec::new()),
                terminal: Mutex::new(None),
                subscribed: AtomicBool::new(false),
                cancelled: AtomicBool::new(false),
                requested: AtomicBool::new(false),
            }),
        }
    }

    /// A [`Flux`] attaching to this publisher. Each subscription shares the
    /// publisher but has its own demand.
    pub fn flux(&self) -> Flux<T> {
        Flux::from_kind(FluxKind::Manual(Arc::clone(&self.state)))
    }

    /// Pushes `value` to every attached subscriber.
    ///
    /// ### Errors
    /// - [`StreamError::Protocol`] once a terminal signal was sent;
    /// - [`StreamError::Backpressure`] if some subscriber had no demand (that
    ///   subscriber is terminated with the same error).
    pub fn next(&self, value: T) -> Result<(), StreamError> {
        if self.state.terminal.lock().is_some() {
            return Err(StreamError::protocol("value pushed after terminal signal"));
        }
        let attached = self.state.subscribers.lock().clone();
        let mut outcome = Ok(());
        for sub in attached {
            if sub.demand.try_take() {
                sub.downstream.on_next(value.clone());
            } else if sub.demand.terminate() {
                let error = StreamError::backpressure("could not emit value due to lack of requests");
                tracing::warn!(subscriber = sub.downstream.name(), "manual publisher overflow");
                self.state.detach(&sub);
                sub.downstream.on_error(error.clone());
                outcome = Err(error);
            }
        }
        outcome
    }

    /// Pushes every value in order, then completes.
    pub fn emit<I>(&self, values: I) -> Result<(), StreamError>
    where
        I: IntoIterator<Item = T>,
    {
        for value in values {
            self.next(value)?;
        }
        self.complete()
    }

    /// Completes every attached subscriber.
    ///
    /// ### Errors
    /// [`StreamError::Protocol`] if a terminal signal was already sent.
    pub fn complete(&self) -> Result<(), StreamError> {
        self.state.finish(Ok(()))
    }

    /// Errors every attached subscriber with `error`.
    ///
    /// ### Errors
    /// [`StreamError::Protocol`] if a terminal signal was already sent.
    pub fn error(&self, error: StreamError) -> Result<(), StreamError> {
        self.state.finish(Err(error))
    }

    /// Number of subscribers currently attached (not cancelled, not terminated).
    pub fn subscriber_count(&self) -> usize {
        self.state.subscribers.lock().len()
    }

    /// True once any subscriber attached.
    pub fn was_subscribed(&self) -> bool {
        self.state.subscribed.load(Ordering::Acquire)
    }

    /// True once any subscriber cancelled.
    pub fn was_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }

    /// True once any subscriber requested a non-zero amount.
    pub fn was_requested(&self) -> bool {
        self.state.requested.load(Ordering::Acquire)
    }

    /// Sum of outstanding demand over attached subscribers (saturating).
    pub fn requested(&self) -> u64 {
        self.state
            .subscribers
            .lock()
            .iter()
            .fold(0u64, |acc, sub| acc.saturating_add(sub.demand.outstanding()))
    }
}

impl<T> std::fmt::Debug for ManualPublisher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualPublisher")
            .field("subscribers", &self.state.subscribers.lock().len())
            .field("terminated", &self.state.terminal.lock().is_some())
            .finish()
    }
}

pub(crate) struct ManualState<T> {
    subscribers: Mutex<Vec<Arc<ManualSubscription<T>>>>,
    terminal: Mutex<Option<Result<(), StreamError>>>,
    subscribed: AtomicBool,
    cancelled: AtomicBool,
    requested: AtomicBool,
}

impl<T: Value> ManualState<T> {
    pub(crate) fn attach(self: &Arc<Self>, downstream: Arc<dyn Subscriber<T>>) {
        self.subscribed.store(true, Ordering::Release);
        let sub = Arc::new(ManualSubscription {
            demand: DemandState::new(),
            downstream,
            state: Arc::downgrade(self),
        });

        // Registered before on_subscribe so a cancel made there detaches it.
        let replay = {
            let terminal = self.terminal.lock();
            if terminal.is_none() {
                self.subscribers.lock().push(Arc::clone(&sub));
            }
            terminal.clone()
        };

        sub.downstream.on_subscribe(Subscription::new(sub.clone()));
        if let Some(outcome) = replay {
            sub.finish(outcome);
        }
    }

    fn finish(&self, outcome: Result<(), StreamError>) -> Result<(), StreamError> {
        let attached = {
            let mut terminal = self.terminal.lock();
            if terminal.is_some() {
                return Err(StreamError::protocol("terminal signal sent twice"));
            }
            *terminal = Some(outcome.clone());
            std::mem::take(&mut *self.subscribers.lock())
        };
        for sub in attached {
            sub.finish(outcome.clone());
        }
        Ok(())
    }

    fn detach(&self, target: &ManualSubscription<T>) {
        self.subscribers
            .lock()
            .retain(|sub| !std::ptr::eq(Arc::as_ptr(sub), target));
    }
}

struct ManualSubscription<T> {
    demand: DemandState,
    downstream: Arc<dyn Subscriber<T>>,
    state: Weak<ManualState<T>>,
}

impl<T: 'static> ManualSubscription<T> {
    fn finish(&self, outcome: Result<(), StreamError>) {
        if !self.demand.terminate() {
            return;
        }
        match outcome {
            Ok(()) => self.downstream.on_complete(),
            Err(error) => self.downstream.on_error(error),
        }
    }
}

impl<T: Value> Control for ManualSubscription<T> {
    fn request(&self, n: u64) {
        if n == 0 {
            return;
        }
        if let Some(state) = self.state.upgrade() {
            state.requested.store(true, Ordering::Release);
        }
        self.demand.request(n);
    }

    fn cancel(&self) {
        if !self.demand.cancel() {
            return;
        }
        if let Some(state) = self.state.upgrade() {
            state.cancelled.store(true, Ordering::Release);
            state.detach(self);
        }
        tracing::debug!(subscriber = self.downstream.name(), "manual subscription cancelled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::signals::{Signal, UNBOUNDED};
    use crate::subscribers::collect::Collect;

    #[test]
    fn values_reach_every_subscriber_with_demand() {
        let publisher = ManualPublisher::new();
        let a = Collect::new(UNBOUNDED);
        let b = Collect::new(UNBOUNDED);
        publisher.flux().subscribe(a.clone());
        publisher.flux().subscribe(b.clone());
        assert_eq!(publisher.subscriber_count(), 2);

        publisher.emit([1, 2]).unwrap();

        for sub in [a, b] {
            assert_eq!(
                sub.signals(),
                vec![Signal::Subscribed, Signal::Next(1), Signal::Next(2), Signal::Complete]
            );
        }
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[test]
    fn push_without_demand_is_a_backpressure_error() {
        let publisher = ManualPublisher::new();
        let sub = Collect::new(1);
        publisher.flux().subscribe(sub.clone());

        publisher.next("first").unwrap();
        let err = publisher.next("second").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BackpressureViolation);
        assert_eq!(sub.values(), vec!["first"]);
        assert_eq!(sub.last(), Some(Signal::Error(err)));
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[test]
    fn anything_after_terminal_is_rejected() {
        let publisher = ManualPublisher::<u8>::new();
        publisher.complete().unwrap();

        assert_eq!(publisher.next(1).unwrap_err().kind(), ErrorKind::ProtocolViolation);
        assert!(publisher.complete().is_err());
        assert!(publisher.error(StreamError::upstream("late")).is_err());
    }

    #[test]
    fn late_subscriber_sees_the_terminal() {
        let publisher = ManualPublisher::<u8>::new();
        publisher.error(StreamError::upstream("gone")).unwrap();

        let sub = Collect::new(0);
        publisher.flux().subscribe(sub.clone());
        assert_eq!(
            sub.signals(),
            vec![Signal::Subscribed, Signal::Error(StreamError::upstream("gone"))]
        );
    }

    #[test]
    fn tracks_requests_and_cancellation() {
        let publisher = ManualPublisher::<u8>::new();
        assert!(!publisher.was_subscribed());

        let sub = Collect::new(0);
        publisher.flux().subscribe(sub.clone());
        assert!(publisher.was_subscribed());
        assert!(!publisher.was_requested());

        sub.request(5);
        sub.request(UNBOUNDED);
        assert!(publisher.was_requested());
        assert_eq!(publisher.requested(), UNBOUNDED);

        sub.cancel();
        assert!(publisher.was_cancelled());
        assert_eq!(publisher.subscriber_count(), 0);
        assert_eq!(publisher.requested(), 0);
        publisher.next(7).unwrap();
        assert!(sub.values().is_empty());
    }
}
