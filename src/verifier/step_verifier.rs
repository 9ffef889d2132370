//! # Step verifier: scripted assertions over a running publisher.
//!
//! A [`StepVerifier`] is built in two phases: first a script of expectations
//! and actions is recorded, then [`StepVerifier::verify`] subscribes a
//! recording subscriber and consumes the script strictly in order.
//!
//! ## Architecture
//! ```text
//! StepVerifier::create(flux) / with_virtual_time(|| flux)
//!     │  .expect_next(..) .then_request(..) .then_await(..) ...
//!     ▼
//! verify().await
//!     ├─ subscribe Recorder on Scheduler (RealTime | Virtual(clock))
//!     │       Recorder ──(mpsc unbounded)──► Run
//!     └─ for each step:
//!          expect_*      ──► read next observed signal (bounded wait)
//!          then_request  ──► Recorder::request
//!          then_await    ──► clock.advance | tokio sleep
//!          then_cancel   ──► Recorder::cancel
//! ```
//!
//! ## Rules
//! - `Subscribed` is consumed implicitly when the script does not start with
//!   [`expect_subscription`](StepVerifier::expect_subscription).
//! - Each wait for a signal is bounded by [`VerifierConfig::timeout`].
//! - The subscription is cancelled when the run ends, however it ends.
//! - `then_cancel` ends the run successfully; later steps are not evaluated.
//! - A panic in a matcher or side effect becomes [`VerifyError::Panicked`].
//!
//! ### Virtual time
//! `expect_no_event(d)` advances `d - 1ns`, fails on anything observed, then
//! advances the last nanosecond: a signal due exactly at the end of the window
//! belongs to the next step.

use std::fmt::Debug;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::mpsc;

use crate::error::{ErrorKind, StreamError, VerifyError};
use crate::publishers::{Flux, Value};
use crate::scheduler::{Scheduler, VirtualClock};
use crate::signals::Signal;
use crate::verifier::config::VerifierConfig;
use crate::verifier::recorder::{Observed, Recorder};
use crate::verifier::report::Verified;
use crate::verifier::step::Step;

const NANO: Duration = Duration::from_nanos(1);

enum Source<T> {
    Ready(Flux<T>),
    Deferred(Box<dyn FnOnce() -> Flux<T> + Send>),
}

/// Scripted verification of a [`Flux`].
///
/// # Example
/// ```
/// use fluxvisor::{Flux, StepVerifier};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// StepVerifier::create(Flux::range(0, 100))
///     .expect_next(0)
///     .expect_next_count(98)
///     .expect_next(99)
///     .verify_complete()
///     .await
///     .unwrap();
/// # }
/// ```
pub struct StepVerifier<T> {
    source: Source<T>,
    config: VerifierConfig,
    steps: Vec<Step<T>>,
}

impl<T: Value + Debug> StepVerifier<T> {
    /// Verifies `flux` on the real-time scheduler with unbounded initial demand.
    pub fn create(flux: Flux<T>) -> Self {
        Self {
            source: Source::Ready(flux),
            config: VerifierConfig::default(),
            steps: Vec::new(),
        }
    }

    /// Like [`create`](Self::create), requesting only `demand` on subscription.
    pub fn create_with_demand(flux: Flux<T>, demand: u64) -> Self {
        Self::create(flux).with_initial_demand(demand)
    }

    /// Verifies the flux built by `supplier` against a fresh [`VirtualClock`].
    ///
    /// The supplier runs at subscription, inside the verification run.
    pub fn with_virtual_time<F>(supplier: F) -> Self
    where
        F: FnOnce() -> Flux<T> + Send + 'static,
    {
        Self {
            source: Source::Deferred(Box::new(supplier)),
            config: VerifierConfig::default(),
            steps: Vec::new(),
        }
    }

    /// Replaces the whole configuration.
    pub fn with_config(mut self, config: VerifierConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the per-signal wait (`0s` waits forever).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Sets the demand requested on subscription.
    pub fn with_initial_demand(mut self, demand: u64) -> Self {
        self.config.initial_demand = demand;
        self
    }

    fn push(mut self, step: Step<T>) -> Self {
        self.steps.push(step);
        self
    }

    /// Expects the subscription handshake.
    pub fn expect_subscription(self) -> Self {
        self.push(Step::Subscription)
    }

    /// Expects the next signal to be `Next(value)`.
    pub fn expect_next(self, value: T) -> Self
    where
        T: PartialEq,
    {
        let description = format!("next({value:?})");
        self.push(Step::Next {
            description,
            check: Box::new(move |v| *v == value),
        })
    }

    /// Expects each of `values`, in order.
    pub fn expect_next_values<I>(self, values: I) -> Self
    where
        T: PartialEq,
        I: IntoIterator<Item = T>,
    {
        values.into_iter().fold(self, Self::expect_next)
    }

    /// Expects a `Next` whose value satisfies `predicate`.
    pub fn expect_next_matches<F>(self, predicate: F) -> Self
    where
        F: FnMut(&T) -> bool + Send + 'static,
    {
        self.push(Step::Next {
            description: "next matching predicate".to_string(),
            check: Box::new(predicate),
        })
    }

    /// Expects `n` values, whatever they are.
    pub fn expect_next_count(self, n: u64) -> Self {
        self.push(Step::NextCount(n))
    }

    /// Expects silence for `duration`.
    pub fn expect_no_event(self, duration: Duration) -> Self {
        self.push(Step::NoEvent(duration))
    }

    /// Requests `n` more values.
    pub fn then_request(self, n: u64) -> Self {
        self.push(Step::Request(n))
    }

    /// Cancels the subscription.
    pub fn then_cancel(self) -> Self {
        self.push(Step::Cancel)
    }

    /// Lets `duration` pass: advances the virtual clock, or sleeps in real time.
    pub fn then_await(self, duration: Duration) -> Self {
        self.push(Step::Await(duration))
    }

    /// Runs virtual-time work that is already due, without advancing the clock.
    pub fn then_await_due(self) -> Self {
        self.push(Step::Await(Duration::ZERO))
    }

    /// Runs `side_effect` at this point of the script.
    pub fn then<F>(self, side_effect: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.push(Step::Then(Box::new(side_effect)))
    }

    /// Expects successful completion.
    pub fn expect_complete(self) -> Self {
        self.push(Step::Complete)
    }

    /// Expects an error of any kind.
    pub fn expect_error(self) -> Self {
        self.push(Step::Error {
            description: "error".to_string(),
            check: Box::new(|_| true),
        })
    }

    /// Expects an error of the given [`ErrorKind`].
    pub fn expect_error_kind(self, kind: ErrorKind) -> Self {
        self.push(Step::Error {
            description: format!("error of kind {kind:?}"),
            check: Box::new(move |e| e.kind() == kind),
        })
    }

    /// Expects an error satisfying `predicate`.
    pub fn expect_error_matches<F>(self, predicate: F) -> Self
    where
        F: FnMut(&StreamError) -> bool + Send + 'static,
    {
        self.push(Step::Error {
            description: "error matching predicate".to_string(),
            check: Box::new(predicate),
        })
    }

    /// Shorthand for `.expect_complete().verify()`.
    pub async fn verify_complete(self) -> Result<Verified, VerifyError> {
        self.expect_complete().verify().await
    }

    /// Subscribes and evaluates the script.
    ///
    /// ### Errors
    /// The first failing step, as a [`VerifyError`] naming its index.
    pub async fn verify(self) -> Result<Verified, VerifyError> {
        let started = Instant::now();
        let steps = self.steps.len();
        let outcome = AssertUnwindSafe(self.run()).catch_unwind().await;
        match outcome {
            Ok(Ok(mut verified)) => {
                verified.elapsed = started.elapsed();
                tracing::debug!(steps, signals = verified.signals, "verification passed");
                Ok(verified)
            }
            Ok(Err(error)) => {
                tracing::debug!(label = error.as_label(), %error, "verification failed");
                Err(error)
            }
            Err(panic) => {
                let message = if let Some(msg) = panic.downcast_ref::<&'static str>() {
                    (*msg).to_string()
                } else if let Some(msg) = panic.downcast_ref::<String>() {
                    msg.clone()
                } else {
                    "unknown panic".to_string()
                };
                tracing::warn!(%message, "verification panicked");
                Err(VerifyError::Panicked { message })
            }
        }
    }

    async fn run(self) -> Result<Verified, VerifyError> {
        let StepVerifier {
            source,
            config,
            steps,
        } = self;

        let (scheduler, flux) = match source {
            Source::Ready(flux) => (Scheduler::RealTime, flux),
            Source::Deferred(supplier) => (Scheduler::Virtual(VirtualClock::new()), supplier()),
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let recorder = Recorder::new(tx, config.initial_demand);
        let mut run = Run {
            recorder: Arc::clone(&recorder),
            rx,
            clock: scheduler.clock().cloned(),
            wait_limit: config.wait_limit(),
            subscription_seen: false,
            signals: 0,
            cancelled: false,
            step: 0,
        };
        flux.subscribe_on(&scheduler, recorder);

        let total = steps.len();
        for (index, step) in steps.into_iter().enumerate() {
            run.step = index;
            tracing::debug!(step = index, expectation = %step.describe(), "verify step");
            if !matches!(step, Step::Subscription) && !run.subscription_seen {
                run.consume_subscription().await?;
            }
            run.evaluate(step).await?;
            if run.cancelled {
                tracing::debug!(step = index, skipped = total - index - 1, "cancelled, script ends here");
                return Ok(run.report(index + 1));
            }
        }
        run.step = total.saturating_sub(1);
        run.check_trailing_violations()?;

        Ok(run.report(total))
    }
}

/// State of one verification run. Dropping it cancels the subscription.
struct Run<T: Send + 'static> {
    recorder: Arc<Recorder<T>>,
    rx: mpsc::UnboundedReceiver<Observed<T>>,
    clock: Option<VirtualClock>,
    wait_limit: Option<Duration>,
    subscription_seen: bool,
    signals: usize,
    cancelled: bool,
    step: usize,
}

impl<T: Send + 'static> Drop for Run<T> {
    fn drop(&mut self) {
        self.recorder.cancel();
    }
}

impl<T: Value + Debug> Run<T> {
    async fn evaluate(&mut self, step: Step<T>) -> Result<(), VerifyError> {
        match step {
            Step::Subscription => {
                if self.subscription_seen {
                    return Err(VerifyError::ScriptMismatch {
                        step: self.step,
                        expected: "subscription".to_string(),
                        actual: "the subscription was already consumed".to_string(),
                    });
                }
                self.consume_subscription().await
            }
            Step::Next {
                description,
                mut check,
            } => match self.next_signal(&description).await? {
                Signal::Next(value) if check(&value) => Ok(()),
                other => Err(self.mismatch(description, &other)),
            },
            Step::NextCount(n) => {
                let expected = format!("{n} values");
                for seen in 0..n {
                    match self.next_signal(&expected).await? {
                        Signal::Next(_) => {}
                        other => return Err(with_progress(self.mismatch(expected, &other), seen)),
                    }
                }
                Ok(())
            }
            Step::NoEvent(duration) => self.expect_silence(duration).await,
            Step::Request(n) => {
                self.recorder.request(n);
                Ok(())
            }
            Step::Cancel => {
                self.recorder.cancel();
                self.cancelled = true;
                Ok(())
            }
            Step::Await(duration) => {
                match &self.clock {
                    Some(clock) => clock.advance(duration),
                    None if duration.is_zero() => tokio::task::yield_now().await,
                    None => tokio::time::sleep(duration).await,
                }
                Ok(())
            }
            Step::Then(side_effect) => {
                side_effect();
                Ok(())
            }
            Step::Complete => match self.next_signal("complete").await? {
                Signal::Complete => Ok(()),
                other => Err(self.mismatch("complete".to_string(), &other)),
            },
            Step::Error {
                description,
                mut check,
            } => match self.next_signal(&description).await? {
                Signal::Error(error) if check(&error) => Ok(()),
                other => Err(self.mismatch(description, &other)),
            },
        }
    }

    async fn consume_subscription(&mut self) -> Result<(), VerifyError> {
        match self.next_signal("subscription").await? {
            Signal::Subscribed => {
                self.subscription_seen = true;
                Ok(())
            }
            other => Err(self.mismatch("subscription".to_string(), &other)),
        }
    }

    async fn next_signal(&mut self, expected: &str) -> Result<Signal<T>, VerifyError> {
        let observed = match self.wait_limit {
            Some(limit) => match tokio::time::timeout(limit, self.rx.recv()).await {
                Ok(observed) => observed,
                Err(_) => {
                    return Err(VerifyError::Timeout {
                        step: self.step,
                        expected: expected.to_string(),
                        waited: limit,
                    })
                }
            },
            None => self.rx.recv().await,
        };
        self.accept(observed)
    }

    fn accept(&mut self, observed: Option<Observed<T>>) -> Result<Signal<T>, VerifyError> {
        match observed {
            Some(Observed::Signal(signal)) => {
                self.signals += 1;
                tracing::trace!(step = self.step, signal = %signal.kind(), "observed");
                Ok(signal)
            }
            Some(Observed::Violation(reason)) => Err(VerifyError::ProtocolViolation {
                step: self.step,
                reason,
            }),
            None => Err(VerifyError::ProtocolViolation {
                step: self.step,
                reason: "subscriber released without a terminal signal".to_string(),
            }),
        }
    }

    async fn expect_silence(&mut self, duration: Duration) -> Result<(), VerifyError> {
        let expected = format!("no event for {duration:?}");
        match self.clock.clone() {
            Some(clock) => {
                let head = duration.saturating_sub(NANO);
                clock.advance(head);
                if let Ok(observed) = self.rx.try_recv() {
                    let signal = self.accept(Some(observed))?;
                    return Err(self.mismatch(expected, &signal));
                }
                clock.advance(duration - head);
                Ok(())
            }
            None => match tokio::time::timeout(duration, self.rx.recv()).await {
                Err(_) => Ok(()),
                Ok(observed) => {
                    let signal = self.accept(observed)?;
                    Err(self.mismatch(expected, &signal))
                }
            },
        }
    }

    fn check_trailing_violations(&mut self) -> Result<(), VerifyError> {
        while let Ok(observed) = self.rx.try_recv() {
            if let Observed::Violation(reason) = observed {
                return Err(VerifyError::ProtocolViolation {
                    step: self.step,
                    reason,
                });
            }
        }
        Ok(())
    }

    fn report(&self, steps: usize) -> Verified {
        Verified {
            steps,
            signals: self.signals,
            cancelled: self.cancelled,
            virtual_elapsed: self.clock.as_ref().map(VirtualClock::now),
            elapsed: Duration::ZERO,
        }
    }

    fn mismatch(&self, expected: String, actual: &Signal<T>) -> VerifyError {
        VerifyError::ExpectationFailed {
            step: self.step,
            expected,
            actual: actual.describe(),
        }
    }
}

fn with_progress(error: VerifyError, seen: u64) -> VerifyError {
    match error {
        VerifyError::ExpectationFailed {
            step,
            expected,
            actual,
        } => VerifyError::ExpectationFailed {
            step,
            expected,
            actual: format!("{actual} after {seen} values"),
        },
        other => other,
    }
}
