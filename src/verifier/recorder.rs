//! # Recording subscriber used by the step verifier.
//!
//! Forwards every signal to the harness over an unbounded channel and checks
//! the publisher against the protocol as it goes.
//!
//! ## Rules
//! ```text
//! on_subscribe  twice               ──► violation (second one is cancelled)
//! on_next       beyond granted      ──► violation
//! on_next       after terminal      ──► violation
//! on_complete / on_error  twice     ──► violation
//! anything      after harness cancel ──► ignored
//! ```
//!
//! Granted demand is updated *before* a request is forwarded: sources emit
//! synchronously from inside `request`.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::StreamError;
use crate::signals::{Signal, Subscription, UNBOUNDED};
use crate::subscribers::Subscriber;

/// What the harness reads from the recorder.
pub(crate) enum Observed<T> {
    Signal(Signal<T>),
    Violation(String),
}

#[derive(Default)]
struct Ledger {
    subscribed: bool,
    granted: u64,
    delivered: u64,
    terminated: bool,
    cancelled: bool,
}

pub(crate) struct Recorder<T> {
    tx: mpsc::UnboundedSender<Observed<T>>,
    ledger: Mutex<Ledger>,
    subscription: Mutex<Option<Subscription>>,
    initial_demand: u64,
}

impl<T: Send + 'static> Recorder<T> {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Observed<T>>, initial_demand: u64) -> Arc<Self> {
        Arc::new(Self {
            tx,
            ledger: Mutex::new(Ledger::default()),
            subscription: Mutex::new(None),
            initial_demand,
        })
    }

    pub(crate) fn request(&self, n: u64) {
        if n == 0 {
            return;
        }
        {
            let mut ledger = self.ledger.lock();
            if ledger.cancelled || ledger.terminated {
                return;
            }
            ledger.granted = ledger.granted.saturating_add(n);
        }
        let subscription = self.subscription.lock().clone();
        if let Some(subscription) = subscription {
            subscription.request(n);
        }
    }

    pub(crate) fn cancel(&self) {
        self.ledger.lock().cancelled = true;
        let subscription = self.subscription.lock().take();
        if let Some(subscription) = subscription {
            subscription.cancel();
        }
    }

    fn send(&self, observed: Observed<T>) {
        // The harness may already be gone; nothing left to tell.
        let _ = self.tx.send(observed);
    }

    fn violation(&self, reason: String) {
        tracing::warn!(%reason, "protocol violation");
        self.send(Observed::Violation(reason));
    }

    fn terminal(&self, signal: Signal<T>) {
        {
            let mut ledger = self.ledger.lock();
            if ledger.cancelled {
                return;
            }
            if ledger.terminated {
                drop(ledger);
                self.violation(format!("{} after a terminal signal", signal.kind()));
                return;
            }
            ledger.terminated = true;
        }
        self.subscription.lock().take();
        self.send(Observed::Signal(signal));
    }
}

impl<T: Send + 'static> Subscriber<T> for Recorder<T> {
    fn on_subscribe(&self, subscription: Subscription) {
        let first = {
            let mut ledger = self.ledger.lock();
            !std::mem::replace(&mut ledger.subscribed, true)
        };
        if !first {
            subscription.cancel();
            self.violation("on_subscribe called more than once".to_string());
            return;
        }
        *self.subscription.lock() = Some(subscription);
        self.send(Observed::Signal(Signal::Subscribed));
        self.request(self.initial_demand);
    }

    fn on_next(&self, value: T) {
        let verdict = {
            let mut ledger = self.ledger.lock();
            if ledger.cancelled {
                return;
            }
            if ledger.terminated {
                Err("next after a terminal signal".to_string())
            } else if ledger.granted != UNBOUNDED && ledger.delivered >= ledger.granted {
                Err(format!(
                    "next beyond granted demand ({} requested)",
                    ledger.granted
                ))
            } else {
                ledger.delivered += 1;
                Ok(())
            }
        };
        match verdict {
            Ok(()) => self.send(Observed::Signal(Signal::Next(value))),
            Err(reason) => self.violation(reason),
        }
    }

    fn on_error(&self, error: StreamError) {
        self.terminal(Signal::Error(error));
    }

    fn on_complete(&self) {
        self.terminal(Signal::Complete);
    }

    fn name(&self) -> &'static str {
        "step-verifier"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publishers::ManualPublisher;

    fn drain<T>(rx: &mut mpsc::UnboundedReceiver<Observed<T>>) -> Vec<Result<Signal<T>, String>> {
        let mut out = Vec::new();
        while let Ok(observed) = rx.try_recv() {
            out.push(match observed {
                Observed::Signal(s) => Ok(s),
                Observed::Violation(v) => Err(v),
            });
        }
        out
    }

    #[test]
    fn next_beyond_demand_is_a_violation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let recorder = Recorder::new(tx, 1);
        recorder.on_subscribe(Subscription::noop());
        recorder.on_next(1);
        recorder.on_next(2);

        let seen = drain(&mut rx);
        assert_eq!(seen[0], Ok(Signal::Subscribed));
        assert_eq!(seen[1], Ok(Signal::Next(1)));
        assert!(matches!(&seen[2], Err(reason) if reason.contains("beyond granted demand")));
    }

    #[test]
    fn second_terminal_and_late_next_are_violations() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Observed<u8>>();
        let recorder = Recorder::new(tx, UNBOUNDED);
        recorder.on_subscribe(Subscription::noop());
        recorder.on_complete();
        recorder.on_next(1);
        recorder.on_error(StreamError::upstream("late"));

        let seen = drain(&mut rx);
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[1], Ok(Signal::Complete));
        assert!(seen[2].is_err());
        assert!(seen[3].is_err());
    }

    #[test]
    fn signals_after_cancel_are_ignored() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Observed<u8>>();
        let recorder = Recorder::new(tx, UNBOUNDED);
        let publisher = ManualPublisher::new();
        publisher.flux().subscribe(recorder.clone());

        recorder.cancel();
        assert!(publisher.was_cancelled());
        recorder.on_next(9);
        recorder.on_complete();

        assert_eq!(drain(&mut rx), vec![Ok(Signal::Subscribed)]);
    }

    #[test]
    fn second_subscription_is_cancelled() {
        let (tx, mut rx) = mpsc::unbounded_channel::<Observed<u8>>();
        let recorder = Recorder::new(tx, UNBOUNDED);
        let first = ManualPublisher::new();
        let second = ManualPublisher::new();
        first.flux().subscribe(recorder.clone());
        second.flux().subscribe(recorder.clone());

        assert!(second.was_cancelled());
        assert!(!first.was_cancelled());
        assert!(drain(&mut rx)[1].is_err());
    }
}
