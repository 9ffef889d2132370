//! # `Flux`: the publisher tagged union.
//!
//! A [`Flux`] is stateless configuration. Nothing happens until it is
//! subscribed; every subscription builds fresh per-subscription state, so the
//! same value can be subscribed many times independently.
//!
//! ## Variants
//! ```text
//! Literal(items)          just / from_iter / empty
//! Range { start, count }  range
//! Interval { period }     interval              (needs a Scheduler)
//! Zip(operator)           zip / zip_with / zip_with_prefetch
//! Map(operator)           map / try_map
//! Error(reason)           error
//! Manual(shared state)    ManualPublisher::flux
//! ```
//!
//! All variants are dispatched by the single `match` in [`Flux::subscribe_on`].
//! `Zip` and `Map` change the element type, so their upstream types live
//! behind a crate-private `Operator<T>` object inside the variant.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use fluxvisor::Flux;
//!
//! let ticks = Flux::interval(Duration::from_secs(60))
//!     .zip_with(Flux::just(["a", "b", "c"]), |i, s| format!("[{i},{s}]"));
//! let doubled = Flux::range(0, 10).map(|n| n * 2);
//! # let _ = (ticks, doubled);
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::error::StreamError;
use crate::publishers::{
    failed, indexed, interval, manual::ManualState, map::MapOperator, zip::ZipOperator,
};
use crate::scheduler::Scheduler;
use crate::subscribers::Subscriber;

/// Bound shared by every element type flowing through a [`Flux`].
pub trait Value: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Value for T {}

/// Type-changing operator hidden inside a [`Flux`] variant.
pub(crate) trait Operator<T>: Send + Sync {
    fn subscribe(&self, scheduler: &Scheduler, downstream: Arc<dyn Subscriber<T>>);
}

pub(crate) enum FluxKind<T> {
    Literal(Arc<[T]>),
    Range {
        start: i64,
        count: u64,
        emit: fn(i64) -> T,
    },
    Interval {
        period: Duration,
        emit: fn(u64) -> T,
    },
    Zip(Box<dyn Operator<T>>),
    Map(Box<dyn Operator<T>>),
    Error(StreamError),
    Manual(Arc<ManualState<T>>),
}

/// A cold, reusable description of a stream of `T`.
pub struct Flux<T> {
    kind: Arc<FluxKind<T>>,
}

impl<T> Clone for Flux<T> {
    fn clone(&self) -> Self {
        Self {
            kind: Arc::clone(&self.kind),
        }
    }
}

impl<T: Value> Flux<T> {
    pub(crate) fn from_kind(kind: FluxKind<T>) -> Self {
        Self {
            kind: Arc::new(kind),
        }
    }

    /// Emits the given items in order, then completes.
    pub fn just<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        items.into_iter().collect()
    }

    /// Completes immediately after subscription.
    pub fn empty() -> Self {
        Self::from_kind(FluxKind::Literal(Arc::from(Vec::new())))
    }

    /// Signals `error` on the first request, with no values.
    pub fn error(error: StreamError) -> Self {
        Self::from_kind(FluxKind::Error(error))
    }

    /// Applies `f` to every value; demand passes through 1:1.
    pub fn map<U, F>(self, f: F) -> Flux<U>
    where
        U: Value,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        self.try_map(move |v| Ok(f(v)))
    }

    /// Applies a fallible `f`; the first `Err` cancels upstream and is signalled downstream.
    pub fn try_map<U, F>(self, f: F) -> Flux<U>
    where
        U: Value,
        F: Fn(T) -> Result<U, StreamError> + Send + Sync + 'static,
    {
        Flux::from_kind(FluxKind::Map(Box::new(MapOperator::new(self, f))))
    }

    /// Pairs the i-th values of `self` and `other`.
    pub fn zip<U: Value>(self, other: Flux<U>) -> Flux<(T, U)> {
        self.zip_with(other, |a, b| (a, b))
    }

    /// Combines the i-th values of `self` and `other` with `combine`.
    ///
    /// Completes as soon as either side has completed and has no buffered values left.
    pub fn zip_with<U, R, F>(self, other: Flux<U>, combine: F) -> Flux<R>
    where
        U: Value,
        R: Value,
        F: Fn(T, U) -> R + Send + Sync + 'static,
    {
        self.zip_with_prefetch(other, crate::publishers::DEFAULT_PREFETCH, combine)
    }

    /// Like [`zip_with`](Self::zip_with), requesting `prefetch` values up front from each side.
    ///
    /// `prefetch` is clamped to at least 1.
    pub fn zip_with_prefetch<U, R, F>(self, other: Flux<U>, prefetch: u64, combine: F) -> Flux<R>
    where
        U: Value,
        R: Value,
        F: Fn(T, U) -> R + Send + Sync + 'static,
    {
        Flux::from_kind(FluxKind::Zip(Box::new(ZipOperator::new(
            self,
            other,
            prefetch.max(1),
            combine,
        ))))
    }

    /// Subscribes on the real-time scheduler.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        self.subscribe_on(&Scheduler::RealTime, subscriber);
    }

    /// Subscribes `subscriber`, taking time from `scheduler`.
    pub fn subscribe_on(&self, scheduler: &Scheduler, subscriber: Arc<dyn Subscriber<T>>) {
        tracing::trace!(
            subscriber = subscriber.name(),
            virtual_time = scheduler.is_virtual(),
            "subscribe"
        );
        match &*self.kind {
            FluxKind::Literal(items) => {
                let items = Arc::clone(items);
                let len = items.len() as u64;
                indexed::subscribe(len, move |i| items[i as usize].clone(), subscriber);
            }
            FluxKind::Range { start, count, emit } => {
                let (start, emit) = (*start, *emit);
                if *count > 0 && start.checked_add_unsigned(*count - 1).is_none() {
                    failed::fail_now(
                        subscriber,
                        StreamError::upstream(format!("range {start} + {count} overflows i64")),
                    );
                    return;
                }
                indexed::subscribe(*count, move |i| emit(start.wrapping_add_unsigned(i)), subscriber);
            }
            FluxKind::Interval { period, emit } => {
                interval::subscribe(*period, *emit, scheduler, subscriber);
            }
            FluxKind::Zip(op) | FluxKind::Map(op) => op.subscribe(scheduler, subscriber),
            FluxKind::Error(error) => failed::subscribe(error.clone(), subscriber),
            FluxKind::Manual(state) => state.attach(subscriber),
        }
    }
}

impl<T: Value> FromIterator<T> for Flux<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let items: Vec<T> = iter.into_iter().collect();
        Flux::from_kind(FluxKind::Literal(Arc::from(items)))
    }
}

impl Flux<i64> {
    /// Emits `count` consecutive integers starting at `start`, then completes.
    pub fn range(start: i64, count: u64) -> Self {
        Flux::from_kind(FluxKind::Range {
            start,
            count,
            emit: std::convert::identity,
        })
    }
}

impl Flux<u64> {
    /// Emits `0, 1, 2, …`, value `k` at `(k + 1) × period` after subscription. Never completes.
    ///
    /// Ticks that find no outstanding demand terminate the stream with a
    /// backpressure error.
    pub fn interval(period: Duration) -> Self {
        Flux::from_kind(FluxKind::Interval {
            period,
            emit: std::convert::identity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::{Signal, UNBOUNDED};
    use crate::subscribers::collect::Collect;

    #[test]
    fn same_flux_subscribes_independently() {
        let flux = Flux::just([1, 2, 3]);
        let first = Collect::new(UNBOUNDED);
        let second = Collect::new(2);
        flux.subscribe(first.clone());
        flux.subscribe(second.clone());

        assert_eq!(first.values(), vec![1, 2, 3]);
        assert_eq!(first.last(), Some(Signal::Complete));
        assert_eq!(second.values(), vec![1, 2]);
    }

    #[test]
    fn range_emits_one_per_request_then_completes() {
        let sub = Collect::new(0);
        Flux::range(5, 3).subscribe(sub.clone());
        assert_eq!(sub.signals(), vec![Signal::Subscribed]);

        sub.request(1);
        assert_eq!(sub.values(), vec![5]);
        sub.request(2);
        assert_eq!(sub.values(), vec![5, 6, 7]);
        assert_eq!(sub.last(), Some(Signal::Complete));

        sub.request(10);
        assert_eq!(sub.signals().len(), 5);
    }

    #[test]
    fn empty_range_and_literal_complete_without_demand() {
        let range = Collect::new(0);
        Flux::range(0, 0).subscribe(range.clone());
        assert_eq!(range.signals(), vec![Signal::Subscribed, Signal::Complete]);

        let literal = Collect::<u8>::new(0);
        Flux::empty().subscribe(literal.clone());
        assert_eq!(literal.signals(), vec![Signal::Subscribed, Signal::Complete]);
    }

    #[test]
    fn overflowing_range_fails_at_subscription() {
        let sub = Collect::new(UNBOUNDED);
        Flux::range(i64::MAX, 2).subscribe(sub.clone());
        assert!(matches!(sub.last(), Some(Signal::Error(StreamError::Upstream { .. }))));
        assert!(sub.values().is_empty());
    }

    #[test]
    fn range_reaching_i64_max_is_fine() {
        let sub = Collect::new(UNBOUNDED);
        Flux::range(i64::MAX - 1, 2).subscribe(sub.clone());
        assert_eq!(sub.values(), vec![i64::MAX - 1, i64::MAX]);
    }

    #[test]
    fn error_waits_for_first_request() {
        let sub = Collect::<u8>::new(0);
        Flux::error(StreamError::upstream("boom")).subscribe(sub.clone());
        assert_eq!(sub.signals(), vec![Signal::Subscribed]);

        sub.request(0);
        assert_eq!(sub.signals().len(), 1);

        sub.request(1);
        sub.request(1);
        assert_eq!(
            sub.signals(),
            vec![Signal::Subscribed, Signal::Error(StreamError::upstream("boom"))]
        );
    }

    #[test]
    fn cancel_suppresses_everything_including_terminal() {
        let sub = Collect::new(1);
        Flux::just(["x", "y"]).subscribe(sub.clone());
        sub.cancel();
        sub.request(UNBOUNDED);
        assert_eq!(sub.signals(), vec![Signal::Subscribed, Signal::Next("x")]);
    }

    #[test]
    fn map_passes_demand_through() {
        let sub = Collect::new(2);
        Flux::range(1, 10).map(|n| n * 10).subscribe(sub.clone());
        assert_eq!(sub.values(), vec![10, 20]);
        sub.request(1);
        assert_eq!(sub.values(), vec![10, 20, 30]);
    }
}
