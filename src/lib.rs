//! # fluxvisor
//!
//! **Fluxvisor** is a small in-memory reactive-streams engine with explicit
//! backpressure, a virtual-time scheduler, and a step verifier that asserts the
//! exact signal sequence a publisher produces.
//!
//! It provides composable cold publishers ([`Flux`]), a hand-driven test
//! source ([`ManualPublisher`]), and a scripted harness ([`StepVerifier`]) that
//! can drive time-based publishers on a [`VirtualClock`] instead of waiting.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ Flux::just   │   │ Flux::range  │   │Flux::interval│
//!     │ Flux::error  │   │  .map(..)    │   │  .zip(..)    │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Flux::subscribe_on(scheduler, subscriber)                        │
//! │  - one match over the variants                                    │
//! │  - fresh per-subscription state (DemandState + Serializer)        │
//! │  - Scheduler: RealTime (tokio timers) | Virtual(VirtualClock)     │
//! └──────┬───────────────────────────────────────────────────▲────────┘
//!        │ on_subscribe / on_next / on_complete / on_error    │ request(n) / cancel()
//!        ▼                                                    │
//! ┌───────────────────────────────────────────────────────────┴───────┐
//! │  Subscriber (user impl, LogSubscriber, or the verifier recorder)  │
//! └──────┬────────────────────────────────────────────────────────────┘
//!        │ recorder only: mpsc (unbounded)
//!        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  StepVerifier::verify()                                           │
//! │  - consumes the script in order                                   │
//! │  - bounded wait per signal, advances the virtual clock on demand  │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Signal lifecycle
//! ```text
//! subscribe ──► Subscribed
//!                  │
//!                  ├─► request(n) ──► Next × ≤ n ──► request(m) ──► ...
//!                  │
//!                  └─► exactly one of:
//!                        - Complete            (finite source exhausted)
//!                        - Error(StreamError)  (declared failure, backpressure, ...)
//!                        - cancel()            (nothing follows, not even a terminal)
//! ```
//!
//! ## Features
//! | Area              | Description                                                       | Key types / traits                       |
//! |-------------------|-------------------------------------------------------------------|------------------------------------------|
//! | **Publishers**    | Cold, reusable stream descriptions and operators.                 | [`Flux`], [`ManualPublisher`]            |
//! | **Subscribers**   | Receive signals, negotiate demand.                                | [`Subscriber`], [`Subscription`]         |
//! | **Time**          | Real-time ticks or an explicitly advanced logical clock.          | [`Scheduler`], [`VirtualClock`]          |
//! | **Verification**  | Scripted expectations over a live subscription.                   | [`StepVerifier`], [`VerifierConfig`]     |
//! | **Errors**        | Typed errors for streams and verification runs.                   | [`StreamError`], [`VerifyError`]         |
//! | **Payments**      | Example domain exposed as streams.                                | [`PaymentService`], [`Payment`]          |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in `LogSubscriber` _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use fluxvisor::{Flux, StepVerifier};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // An hour of ticks, checked in no time.
//!     StepVerifier::with_virtual_time(|| {
//!         Flux::interval(Duration::from_secs(60))
//!             .zip_with(Flux::just(["foo", "bar"]), |i, s| format!("[{i},{s}]"))
//!     })
//!     .expect_subscription()
//!     .expect_no_event(Duration::from_secs(60))
//!     .expect_next("[0,foo]".to_string())
//!     .then_await(Duration::from_secs(60))
//!     .expect_next("[1,bar]".to_string())
//!     .verify_complete()
//!     .await?;
//!     Ok(())
//! }
//! ```
mod error;
mod payments;
mod publishers;
mod scheduler;
mod signals;
mod subscribers;
mod verifier;

// ---- Public re-exports ----

pub use error::{ErrorKind, StreamError, VerifyError};
pub use payments::{InMemoryPaymentService, Payment, PaymentService};
pub use publishers::{Flux, ManualPublisher, Value, DEFAULT_PREFETCH};
pub use scheduler::{Scheduler, VirtualClock};
pub use signals::{Signal, SignalKind, Subscription, UNBOUNDED};
pub use subscribers::Subscriber;
pub use verifier::{StepVerifier, Verified, VerifierConfig};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogSubscriber;
