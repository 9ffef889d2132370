//! # Transforming operator (`Map`).
//!
//! Sits between an upstream `Flux<U>` and a downstream subscriber of `T`:
//! ```text
//! upstream ──► MapSubscriber ──► downstream
//!   ▲              │  on_next(u) ──► f(u) ── Ok(t) ──► on_next(t)
//!   │              │                       └─ Err(e) ─► cancel upstream, on_error(e)
//!   └─ MapControl handed to downstream (demand passes through 1:1)
//! ```
//!
//! The upstream handle lives in a slot shared with [`MapControl`]; a terminal
//! signal, a failed transform or a downstream cancel empties it, so nothing
//! keeps the upstream source alive afterwards.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::StreamError;
use crate::publishers::flux::{Flux, Operator, Value};
use crate::scheduler::Scheduler;
use crate::signals::{Control, Subscription};
use crate::subscribers::Subscriber;

type Transform<U, T> = Arc<dyn Fn(U) -> Result<T, StreamError> + Send + Sync>;

type UpstreamSlot = Arc<Mutex<Option<Subscription>>>;

pub(crate) struct MapOperator<U, T> {
    source: Flux<U>,
    transform: Transform<U, T>,
}

impl<U: Value, T: Value> MapOperator<U, T> {
    pub(crate) fn new<F>(source: Flux<U>, f: F) -> Self
    where
        F: Fn(U) -> Result<T, StreamError> + Send + Sync + 'static,
    {
        Self {
            source,
            transform: Arc::new(f),
        }
    }
}

impl<U: Value, T: Value> Operator<T> for MapOperator<U, T> {
    fn subscribe(&self, scheduler: &Scheduler, downstream: Arc<dyn Subscriber<T>>) {
        let inner = Arc::new(MapSubscriber {
            transform: Arc::clone(&self.transform),
            downstream,
            upstream: Arc::new(Mutex::new(None)),
            done: AtomicBool::new(false),
        });
        self.source.subscribe_on(scheduler, inner);
    }
}

struct MapSubscriber<U, T> {
    transform: Transform<U, T>,
    downstream: Arc<dyn Subscriber<T>>,
    upstream: UpstreamSlot,
    done: AtomicBool,
}

/// Downstream's view of the upstream subscription.
struct MapControl {
    upstream: UpstreamSlot,
}

impl Control for MapControl {
    fn request(&self, n: u64) {
        let upstream = self.upstream.lock().clone();
        if let Some(upstream) = upstream {
            upstream.request(n);
        }
    }

    fn cancel(&self) {
        let upstream = self.upstream.lock().take();
        if let Some(upstream) = upstream {
            upstream.cancel();
        }
    }
}

impl<U: Value, T: Value> Subscriber<U> for MapSubscriber<U, T> {
    fn on_subscribe(&self, subscription: Subscription) {
        *self.upstream.lock() = Some(subscription);
        let control = MapControl {
            upstream: Arc::clone(&self.upstream),
        };
        self.downstream.on_subscribe(Subscription::new(Arc::new(control)));
    }

    fn on_next(&self, value: U) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        match (self.transform)(value) {
            Ok(mapped) => self.downstream.on_next(mapped),
            Err(error) => {
                if self.done.swap(true, Ordering::AcqRel) {
                    return;
                }
                let upstream = self.upstream.lock().take();
                if let Some(upstream) = upstream {
                    upstream.cancel();
                }
                tracing::debug!(subscriber = self.downstream.name(), %error, "map transform failed");
                self.downstream.on_error(error);
            }
        }
    }

    fn on_error(&self, error: StreamError) {
        if !self.done.swap(true, Ordering::AcqRel) {
            self.upstream.lock().take();
            self.downstream.on_error(error);
        }
    }

    fn on_complete(&self) {
        if !self.done.swap(true, Ordering::AcqRel) {
            self.upstream.lock().take();
            self.downstream.on_complete();
        }
    }

    fn name(&self) -> &'static str {
        "map"
    }
}
