//! # Finite, index-addressed sources (`Literal`, `Range`).
//!
//! Both variants are "emit element `i` for `i in 0..len`, then complete", so
//! they share one source that is parameterised by an element function.
//!
//! ## Flow
//! ```text
//! subscribe ──► on_subscribe(sub) ──► drain()
//! request(n) ──► demand += n ──► drain()
//!
//! drain(): while index < len && try_take() { on_next(at(index)); index += 1 }
//!          index == len && terminate() ──► on_complete()
//! ```
//!
//! Completion needs no demand: an empty source completes right after
//! subscription, and a source completes as soon as its last value is out.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::signals::{Control, DemandState, Serializer, Subscription};
use crate::subscribers::Subscriber;

struct IndexedSource<T, F> {
    len: u64,
    at: F,
    index: AtomicU64,
    demand: DemandState,
    serializer: Serializer,
    downstream: Arc<dyn Subscriber<T>>,
}

pub(crate) fn subscribe<T, F>(len: u64, at: F, downstream: Arc<dyn Subscriber<T>>)
where
    T: Send + 'static,
    F: Fn(u64) -> T + Send + Sync + 'static,
{
    let source = Arc::new(IndexedSource {
        len,
        at,
        index: AtomicU64::new(0),
        demand: DemandState::new(),
        serializer: Serializer::new(),
        downstream,
    });
    source
        .downstream
        .on_subscribe(Subscription::new(source.clone()));
    source.drain();
}

impl<T, F> IndexedSource<T, F>
where
    T: Send + 'static,
    F: Fn(u64) -> T + Send + Sync + 'static,
{
    fn drain(&self) {
        self.serializer.drain(|| self.emit_ready());
    }

    // Only the drainer touches `index`; the serializer orders the passes.
    fn emit_ready(&self) {
        loop {
            let i = self.index.load(Ordering::Relaxed);
            if i >= self.len {
                if self.demand.terminate() {
                    tracing::debug!(subscriber = self.downstream.name(), emitted = i, "complete");
                    self.downstream.on_complete();
                }
                return;
            }
            if !self.demand.try_take() {
                return;
            }
            self.index.store(i + 1, Ordering::Relaxed);
            self.downstream.on_next((self.at)(i));
        }
    }
}

impl<T, F> Control for IndexedSource<T, F>
where
    T: Send + 'static,
    F: Fn(u64) -> T + Send + Sync + 'static,
{
    fn request(&self, n: u64) {
        if self.demand.request(n) {
            self.drain();
        }
    }

    fn cancel(&self) {
        if self.demand.cancel() {
            tracing::debug!(subscriber = self.downstream.name(), "cancelled");
        }
    }
}
