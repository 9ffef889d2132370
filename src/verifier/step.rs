//! Script entries of a [`StepVerifier`](crate::StepVerifier).

use std::time::Duration;

use crate::error::StreamError;

pub(crate) type ValueCheck<T> = Box<dyn FnMut(&T) -> bool + Send>;
pub(crate) type ErrorCheck = Box<dyn FnMut(&StreamError) -> bool + Send>;

/// One scripted expectation or action, consumed strictly in order.
pub(crate) enum Step<T> {
    Subscription,
    Next {
        description: String,
        check: ValueCheck<T>,
    },
    NextCount(u64),
    NoEvent(Duration),
    Request(u64),
    Cancel,
    /// Advance time; zero releases only what is already due.
    Await(Duration),
    Then(Box<dyn FnOnce() + Send>),
    Complete,
    Error {
        description: String,
        check: ErrorCheck,
    },
}

impl<T> Step<T> {
    pub(crate) fn describe(&self) -> String {
        match self {
            Step::Subscription => "subscription".to_string(),
            Step::Next { description, .. } | Step::Error { description, .. } => description.clone(),
            Step::NextCount(n) => format!("{n} values"),
            Step::NoEvent(d) => format!("no event for {d:?}"),
            Step::Request(n) => format!("request({n})"),
            Step::Cancel => "cancel".to_string(),
            Step::Await(d) if d.is_zero() => "await due tasks".to_string(),
            Step::Await(d) => format!("await {d:?}"),
            Step::Then(_) => "side effect".to_string(),
            Step::Complete => "complete".to_string(),
        }
    }
}
