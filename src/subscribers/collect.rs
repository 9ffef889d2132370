//! Test-only subscriber that records every signal it receives.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::StreamError;
use crate::signals::{Signal, Subscription};
use crate::subscribers::Subscriber;

pub(crate) struct Collect<T> {
    initial: u64,
    signals: Mutex<Vec<Signal<T>>>,
    subscription: Mutex<Option<Subscription>>,
}

impl<T: Clone + Send + 'static> Collect<T> {
    pub(crate) fn new(initial: u64) -> Arc<Self> {
        Arc::new(Self {
            initial,
            signals: Mutex::new(Vec::new()),
            subscription: Mutex::new(None),
        })
    }

    pub(crate) fn signals(&self) -> Vec<Signal<T>> {
        self.signals.lock().clone()
    }

    pub(crate) fn values(&self) -> Vec<T> {
        self.signals
            .lock()
            .iter()
            .filter_map(|s| match s {
                Signal::Next(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn last(&self) -> Option<Signal<T>> {
        self.signals.lock().last().cloned()
    }

    pub(crate) fn request(&self, n: u64) {
        let sub = self.subscription.lock().clone();
        if let Some(sub) = sub {
            sub.request(n);
        }
    }

    pub(crate) fn cancel(&self) {
        let sub = self.subscription.lock().take();
        if let Some(sub) = sub {
            sub.cancel();
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Subscriber<T> for Collect<T> {
    fn on_subscribe(&self, subscription: Subscription) {
        self.signals.lock().push(Signal::Subscribed);
        *self.subscription.lock() = Some(subscription.clone());
        subscription.request(self.initial);
    }

    fn on_next(&self, value: T) {
        self.signals.lock().push(Signal::Next(value));
    }

    fn on_error(&self, error: StreamError) {
        self.signals.lock().push(Signal::Error(error));
    }

    fn on_complete(&self) {
        self.signals.lock().push(Signal::Complete);
    }
}
