//! # Subscriber trait.
//!
//! Provides [`Subscriber`], the consumer side of a stream attachment.
//!
//! ## Rules
//! - `on_subscribe` is called exactly once, before anything else.
//! - `on_next` is called at most as many times as demand was requested.
//! - At most one of `on_error` / `on_complete` is called, and nothing after it.
//! - Calls are never concurrent for one attachment.
//! - Callbacks may call back into the [`Subscription`] (request/cancel); the
//!   source handles the re-entry without recursion.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use fluxvisor::{Flux, StreamError, Subscriber, Subscription};
//!
//! #[derive(Default)]
//! struct Sum {
//!     total: Mutex<i64>,
//! }
//!
//! impl Subscriber<i64> for Sum {
//!     fn on_subscribe(&self, subscription: Subscription) {
//!         subscription.request(fluxvisor::UNBOUNDED);
//!     }
//!     fn on_next(&self, value: i64) {
//!         *self.total.lock() += value;
//!     }
//!     fn on_error(&self, _error: StreamError) {}
//!     fn on_complete(&self) {}
//!     fn name(&self) -> &'static str { "sum" }
//! }
//!
//! let sum = Arc::new(Sum::default());
//! Flux::range(1, 4).subscribe(sum.clone());
//! assert_eq!(*sum.total.lock(), 10);
//! ```

use crate::error::StreamError;
use crate::signals::Subscription;

/// Consumer of one stream attachment.
///
/// Implementations must not block: callbacks run on the emitting context
/// (the caller of `request`, a scheduler callback or a manual driver).
pub trait Subscriber<T>: Send + Sync + 'static {
    /// Receives the subscription handle. Request demand here to start the flow.
    fn on_subscribe(&self, subscription: Subscription);

    /// Receives one value.
    fn on_next(&self, value: T);

    /// Receives the failure terminal signal.
    fn on_error(&self, error: StreamError);

    /// Receives the success terminal signal.
    fn on_complete(&self);

    /// Returns the subscriber name used in logs.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
