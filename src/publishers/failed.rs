//! Error source, plus the helper other sources use to fail at subscription.

use std::sync::Arc;

use crate::error::StreamError;
use crate::signals::{Control, DemandState, Subscription};
use crate::subscribers::Subscriber;

struct ErrorSource<T> {
    error: StreamError,
    demand: DemandState,
    downstream: Arc<dyn Subscriber<T>>,
}

/// Subscribes to a source that errors on the first non-zero request.
pub(crate) fn subscribe<T: Send + 'static>(error: StreamError, downstream: Arc<dyn Subscriber<T>>) {
    let source = Arc::new(ErrorSource {
        error,
        demand: DemandState::new(),
        downstream,
    });
    source
        .downstream
        .on_subscribe(Subscription::new(source.clone()));
}

/// Hands out a no-op subscription and errors right away.
pub(crate) fn fail_now<T: 'static>(downstream: Arc<dyn Subscriber<T>>, error: StreamError) {
    tracing::debug!(subscriber = downstream.name(), label = error.as_label(), %error, "failed at subscription");
    downstream.on_subscribe(Subscription::noop());
    downstream.on_error(error);
}

impl<T: Send + 'static> Control for ErrorSource<T> {
    fn request(&self, n: u64) {
        if self.demand.request(n) && self.demand.terminate() {
            tracing::debug!(subscriber = self.downstream.name(), label = self.error.as_label(), "error");
            self.downstream.on_error(self.error.clone());
        }
    }

    fn cancel(&self) {
        self.demand.cancel();
    }
}
