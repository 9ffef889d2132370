//! # Pairing operator (`Zip`).
//!
//! Subscribes to both sides, prefetches from each, and emits `combine(a, b)`
//! for the i-th value of each side as downstream demand allows.
//!
//! ## Architecture
//! ```text
//!  left  ──► LeftInner  ──┐                     ┌──► downstream
//!                          ├──► ZipCoordinator ─┤
//!  right ──► RightInner ──┘   (queues, demand)  └──◄ request / cancel
//! ```
//!
//! ## Rules
//! - Each side is asked for `prefetch` values up front, and for one more each
//!   time a pair is emitted.
//! - A pair is emitted only when both queues are non-empty and downstream has
//!   outstanding demand.
//! - Completes as soon as one side has completed with nothing left in its
//!   queue; the other side is cancelled.
//! - An error from either side cancels the other and is forwarded once, from
//!   the drain loop, so it never overlaps an `on_next` in flight.
//! - Cancelling downstream cancels both sides and drops the queues.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::StreamError;
use crate::publishers::flux::{Flux, Operator, Value};
use crate::scheduler::Scheduler;
use crate::signals::{Control, DemandState, Serializer, Subscription};
use crate::subscribers::Subscriber;

/// Values requested up front from each side of a zip.
pub const DEFAULT_PREFETCH: u64 = 32;

type Combine<A, B, R> = Arc<dyn Fn(A, B) -> R + Send + Sync>;

pub(crate) struct ZipOperator<A, B, R> {
    left: Flux<A>,
    right: Flux<B>,
    prefetch: u64,
    combine: Combine<A, B, R>,
}

impl<A: Value, B: Value, R: Value> ZipOperator<A, B, R> {
    pub(crate) fn new<F>(left: Flux<A>, right: Flux<B>, prefetch: u64, combine: F) -> Self
    where
        F: Fn(A, B) -> R + Send + Sync + 'static,
    {
        Self {
            left,
            right,
            prefetch,
            combine: Arc::new(combine),
        }
    }
}

impl<A: Value, B: Value, R: Value> Operator<R> for ZipOperator<A, B, R> {
    fn subscribe(&self, scheduler: &Scheduler, downstream: Arc<dyn Subscriber<R>>) {
        let coordinator = Arc::new(ZipCoordinator {
            state: Mutex::new(ZipState {
                left: VecDeque::new(),
                right: VecDeque::new(),
                left_done: false,
                right_done: false,
                error: None,
                upstreams: [None, None],
            }),
            demand: DemandState::new(),
            serializer: Serializer::new(),
            downstream,
            combine: Arc::clone(&self.combine),
            prefetch: self.prefetch,
        });

        coordinator
            .downstream
            .on_subscribe(Subscription::new(coordinator.clone()));
        if coordinator.demand.is_done() {
            return;
        }
        self.left
            .subscribe_on(scheduler, Arc::new(LeftInner(Arc::clone(&coordinator))));
        if coordinator.demand.is_done() {
            return;
        }
        self.right
            .subscribe_on(scheduler, Arc::new(RightInner(coordinator)));
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Left = 0,
    Right = 1,
}

impl Side {
    fn other(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

struct ZipState<A, B> {
    left: VecDeque<A>,
    right: VecDeque<B>,
    left_done: bool,
    right_done: bool,
    error: Option<StreamError>,
    upstreams: [Option<Subscription>; 2],
}

impl<A, B> ZipState<A, B> {
    fn exhausted(&self) -> bool {
        (self.left_done && self.left.is_empty()) || (self.right_done && self.right.is_empty())
    }

    fn release(&mut self) -> [Option<Subscription>; 2] {
        self.left.clear();
        self.right.clear();
        std::mem::take(&mut self.upstreams)
    }
}

struct ZipCoordinator<A, B, R> {
    state: Mutex<ZipState<A, B>>,
    demand: DemandState,
    serializer: Serializer,
    downstream: Arc<dyn Subscriber<R>>,
    combine: Combine<A, B, R>,
    prefetch: u64,
}

enum Ready<A, B> {
    Emit(A, B, [Option<Subscription>; 2]),
    Complete([Option<Subscription>; 2]),
    Fail(StreamError),
    Idle,
}

impl<A: Value, B: Value, R: Value> ZipCoordinator<A, B, R> {
    fn attach(&self, side: Side, subscription: Subscription) {
        let accepted = {
            let mut st = self.state.lock();
            if self.demand.is_done() || st.error.is_some() {
                false
            } else {
                st.upstreams[side as usize] = Some(subscription.clone());
                true
            }
        };
        if accepted {
            subscription.request(self.prefetch);
        } else {
            subscription.cancel();
        }
    }

    fn push_left(&self, value: A) {
        if self.demand.is_done() {
            return;
        }
        self.state.lock().left.push_back(value);
        self.drain();
    }

    fn push_right(&self, value: B) {
        if self.demand.is_done() {
            return;
        }
        self.state.lock().right.push_back(value);
        self.drain();
    }

    fn side_complete(&self, side: Side) {
        {
            let mut st = self.state.lock();
            match side {
                Side::Left => st.left_done = true,
                Side::Right => st.right_done = true,
            }
        }
        self.drain();
    }

    fn side_error(&self, side: Side, error: StreamError) {
        let upstreams = {
            let mut st = self.state.lock();
            if self.demand.is_done() || st.error.is_some() {
                return;
            }
            tracing::debug!(subscriber = self.downstream.name(), ?side, %error, "zip side failed");
            st.error = Some(error);
            st.release()
        };
        if let Some(other) = &upstreams[side.other() as usize] {
            other.cancel();
        }
        self.drain();
    }

    fn drain(&self) {
        self.serializer.drain(|| self.emit_ready());
    }

    fn emit_ready(&self) {
        loop {
            if self.demand.is_done() {
                return;
            }
            let step = {
                let mut st = self.state.lock();
                if let Some(error) = st.error.take() {
                    Ready::Fail(error)
                } else if st.exhausted() {
                    Ready::Complete(st.release())
                } else if st.left.is_empty() || st.right.is_empty() || !self.demand.try_take() {
                    Ready::Idle
                } else {
                    match (st.left.pop_front(), st.right.pop_front()) {
                        (Some(a), Some(b)) => Ready::Emit(a, b, st.upstreams.clone()),
                        _ => Ready::Idle,
                    }
                }
            };

            match step {
                Ready::Idle => return,
                Ready::Complete(upstreams) => {
                    if self.demand.terminate() {
                        for up in upstreams.iter().flatten() {
                            up.cancel();
                        }
                        tracing::debug!(subscriber = self.downstream.name(), "zip complete");
                        self.downstream.on_complete();
                    }
                    return;
                }
                Ready::Fail(error) => {
                    if self.demand.terminate() {
                        self.downstream.on_error(error);
                    }
                    return;
                }
                Ready::Emit(a, b, upstreams) => {
                    self.downstream.on_next((self.combine)(a, b));
                    for up in upstreams.iter().flatten() {
                        up.request(1);
                    }
                }
            }
        }
    }
}

impl<A: Value, B: Value, R: Value> Control for ZipCoordinator<A, B, R> {
    fn request(&self, n: u64) {
        if self.demand.request(n) {
            self.drain();
        }
    }

    fn cancel(&self) {
        if !self.demand.cancel() {
            return;
        }
        let upstreams = self.state.lock().release();
        for up in upstreams.iter().flatten() {
            up.cancel();
        }
        tracing::debug!(subscriber = self.downstream.name(), "zip cancelled");
    }
}

struct LeftInner<A, B, R>(Arc<ZipCoordinator<A, B, R>>);

struct RightInner<A, B, R>(Arc<ZipCoordinator<A, B, R>>);

impl<A: Value, B: Value, R: Value> Subscriber<A> for LeftInner<A, B, R> {
    fn on_subscribe(&self, subscription: Subscription) {
        self.0.attach(Side::Left, subscription);
    }

    fn on_next(&self, value: A) {
        self.0.push_left(value);
    }

    fn on_error(&self, error: StreamError) {
        self.0.side_error(Side::Left, error);
    }

    fn on_complete(&self) {
        self.0.side_complete(Side::Left);
    }

    fn name(&self) -> &'static str {
        "zip-left"
    }
}

impl<A: Value, B: Value, R: Value> Subscriber<B> for RightInner<A, B, R> {
    fn on_subscribe(&self, subscription: Subscription) {
        self.0.attach(Side::Right, subscription);
    }

    fn on_next(&self, value: B) {
        self.0.push_right(value);
    }

    fn on_error(&self, error: StreamError) {
        self.0.side_error(Side::Right, error);
    }

    fn on_complete(&self) {
        self.0.side_complete(Side::Right);
    }

    fn name(&self) -> &'static str {
        "zip-right"
    }
}
