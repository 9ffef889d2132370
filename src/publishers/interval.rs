//! # Periodic source (`Interval`).
//!
//! Registers one periodic callback on the [`Scheduler`] at subscription. Tick
//! `k` (emitting value `k`) fires `(k + 1) × period` after subscription.
//!
//! ## Rules
//! - Never completes on its own.
//! - A tick that finds no outstanding demand cannot be buffered: the source
//!   terminates with [`StreamError::Backpressure`].
//! - Cancellation fires the demand token, which also stops the scheduled work.
//! - Ticks are serialized by the scheduler; requests may arrive concurrently and
//!   only touch the demand counter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::StreamError;
use crate::publishers::failed;
use crate::scheduler::Scheduler;
use crate::signals::{Control, DemandState, Subscription};
use crate::subscribers::Subscriber;

struct IntervalSource<T> {
    emit: fn(u64) -> T,
    tick: AtomicU64,
    demand: DemandState,
    downstream: Arc<dyn Subscriber<T>>,
}

pub(crate) fn subscribe<T: Send + 'static>(
    period: Duration,
    emit: fn(u64) -> T,
    scheduler: &Scheduler,
    downstream: Arc<dyn Subscriber<T>>,
) {
    if period.is_zero() {
        failed::fail_now(downstream, StreamError::upstream("interval period must be greater than zero"));
        return;
    }

    let source = Arc::new(IntervalSource {
        emit,
        tick: AtomicU64::new(0),
        demand: DemandState::new(),
        downstream,
    });
    source
        .downstream
        .on_subscribe(Subscription::new(source.clone()));
    if source.demand.is_done() {
        return;
    }

    let ticking = Arc::clone(&source);
    let scheduled = scheduler.schedule_periodic(period, source.demand.token(), move || ticking.on_tick());
    if let Err(error) = scheduled {
        if source.demand.terminate() {
            tracing::warn!(subscriber = source.downstream.name(), %error, "interval could not be scheduled");
            source.downstream.on_error(error);
        }
    }
}

impl<T: Send + 'static> IntervalSource<T> {
    fn on_tick(&self) {
        if self.demand.is_done() {
            return;
        }
        let n = self.tick.fetch_add(1, Ordering::Relaxed);
        if self.demand.try_take() {
            self.downstream.on_next((self.emit)(n));
        } else if self.demand.terminate() {
            tracing::warn!(subscriber = self.downstream.name(), tick = n, "interval overflow");
            self.downstream.on_error(StreamError::backpressure(format!(
                "could not emit tick {n} due to lack of requests"
            )));
        }
    }
}

impl<T: Send + 'static> Control for IntervalSource<T> {
    fn request(&self, n: u64) {
        self.demand.request(n);
    }

    fn cancel(&self) {
        if self.demand.cancel() {
            tracing::debug!(subscriber = self.downstream.name(), "interval cancelled");
        }
    }
}
