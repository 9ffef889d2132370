//! # LogSubscriber: simple signal printer
//!
//! A minimal subscriber that requests unbounded demand and logs every signal
//! through `tracing`. Use it for demos or to eyeball a pipeline.
//!
//! ## Example output
//! ```text
//! INFO [subscribed] subscriber="payments"
//! INFO [next] subscriber="payments" value=Payment { id: 1, amount: 1000 }
//! INFO [complete] subscriber="payments"
//! ```

use std::fmt::Debug;

use parking_lot::Mutex;

use crate::error::StreamError;
use crate::signals::{Subscription, UNBOUNDED};
use crate::subscribers::Subscriber;

/// Signal logging subscriber.
pub struct LogSubscriber {
    name: &'static str,
    subscription: Mutex<Option<Subscription>>,
}

impl LogSubscriber {
    /// Construct a new [`LogSubscriber`] labelled `name` in log lines.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            subscription: Mutex::new(None),
        }
    }

    /// Cancels the current attachment, if any.
    pub fn cancel(&self) {
        let sub = self.subscription.lock().take();
        if let Some(sub) = sub {
            tracing::info!(subscriber = self.name, "[cancelled]");
            sub.cancel();
        }
    }
}

impl Default for LogSubscriber {
    fn default() -> Self {
        Self::new("log")
    }
}

impl<T: Debug + Send + 'static> Subscriber<T> for LogSubscriber {
    fn on_subscribe(&self, subscription: Subscription) {
        tracing::info!(subscriber = self.name, "[subscribed]");
        *self.subscription.lock() = Some(subscription.clone());
        subscription.request(UNBOUNDED);
    }

    fn on_next(&self, value: T) {
        tracing::info!(subscriber = self.name, value = ?value, "[next]");
    }

    fn on_error(&self, error: StreamError) {
        self.subscription.lock().take();
        tracing::warn!(subscriber = self.name, label = error.as_label(), %error, "[error]");
    }

    fn on_complete(&self) {
        self.subscription.lock().take();
        tracing::info!(subscriber = self.name, "[complete]");
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
