//! # Stream subscribers.
//!
//! This module provides the [`Subscriber`] trait and built-in implementations.
//!
//! ## Architecture
//! ```text
//! Flux::subscribe_on(scheduler, subscriber)
//!        │
//!        ├──► on_subscribe(Subscription) ──► subscriber requests demand
//!        │                                        │
//!        │          ┌─────────────────────────────┘
//!        │          ▼
//!        ├──► on_next(value)   (≤ requested)
//!        └──► on_complete() | on_error(e)   (at most one)
//! ```
//!
//! ## Subscriber types
//! - **Verifier recorder** (internal) records signals for the step verifier
//! - [`LogSubscriber`] logs every signal (feature `logging`)
//! - Custom subscribers implement [`Subscriber`] directly

#[cfg(test)]
pub(crate) mod collect;
#[cfg(feature = "logging")]
mod log;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogSubscriber;
pub use subscriber::Subscriber;
