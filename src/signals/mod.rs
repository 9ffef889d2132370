//! Signal model: what flows from a publisher to a subscriber, and how demand
//! flows back.
//!
//! ## Contents
//! - [`Signal`], [`SignalKind`] the events of one attachment
//! - [`Subscription`] the subscriber's handle for demand and cancellation
//! - `DemandState` per-attachment demand counter with cancel/terminal flags
//! - `Serializer` the drain loop every source emits through

mod serializer;
mod signal;
mod subscription;

pub(crate) use serializer::Serializer;
pub use signal::{Signal, SignalKind};
pub(crate) use subscription::{Control, DemandState};
pub use subscription::{Subscription, UNBOUNDED};
