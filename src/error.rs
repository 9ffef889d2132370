//! Error types used by streams and by the step verifier.
//!
//! This module defines two main error enums:
//!
//! - [`StreamError`]: the reason carried by a terminal `Error` signal.
//! - [`VerifyError`]: why a verification run was aborted.
//!
//! Both types provide `as_label` for logging. [`StreamError::kind`] collapses a
//! stream error into an [`ErrorKind`] for matching in verification scripts.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Coarse classification of a [`StreamError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A publisher's own declared failure (error source, failing transform).
    Upstream,
    /// A value was pushed to a subscriber that had no outstanding demand.
    BackpressureViolation,
    /// A publisher broke the signal protocol.
    ProtocolViolation,
    /// Time-based work could not be scheduled.
    Scheduler,
}

/// # Errors delivered downstream as a terminal `Error` signal.
///
/// Cheap to clone: every message is an `Arc<str>` so one error can fan out to
/// several subscribers.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// Declared failure of the publisher itself.
    #[error("upstream error: {message}")]
    Upstream {
        /// Human-readable description.
        message: Arc<str>,
    },

    /// A `try_map` transform rejected a value.
    #[error("transform failed: {message}")]
    Transform {
        /// Message returned by the transform.
        message: Arc<str>,
    },

    /// Emission was attempted without outstanding demand.
    #[error("backpressure violation: {reason}")]
    Backpressure {
        /// What could not be delivered.
        reason: Arc<str>,
    },

    /// A publisher broke the protocol (e.g. emitted after a terminal signal).
    #[error("protocol violation: {reason}")]
    Protocol {
        /// Description of the broken rule.
        reason: Arc<str>,
    },

    /// Time-based work could not be scheduled (e.g. no tokio runtime).
    #[error("scheduler unavailable: {reason}")]
    Scheduler {
        /// Underlying cause.
        reason: Arc<str>,
    },
}

impl StreamError {
    /// Shorthand for [`StreamError::Upstream`].
    ///
    /// # Example
    /// ```
    /// use fluxvisor::{ErrorKind, StreamError};
    ///
    /// let err = StreamError::upstream("boom");
    /// assert_eq!(err.kind(), ErrorKind::Upstream);
    /// assert_eq!(err.to_string(), "upstream error: boom");
    /// ```
    pub fn upstream(message: impl Into<Arc<str>>) -> Self {
        StreamError::Upstream {
            message: message.into(),
        }
    }

    /// Shorthand for [`StreamError::Transform`].
    pub fn transform(message: impl Into<Arc<str>>) -> Self {
        StreamError::Transform {
            message: message.into(),
        }
    }

    pub(crate) fn backpressure(reason: impl Into<Arc<str>>) -> Self {
        StreamError::Backpressure {
            reason: reason.into(),
        }
    }

    pub(crate) fn protocol(reason: impl Into<Arc<str>>) -> Self {
        StreamError::Protocol {
            reason: reason.into(),
        }
    }

    pub(crate) fn scheduler(reason: impl Into<Arc<str>>) -> Self {
        StreamError::Scheduler {
            reason: reason.into(),
        }
    }

    /// Returns the coarse [`ErrorKind`] of this error.
    ///
    /// A failing transform is reported as [`ErrorKind::Upstream`]: from the
    /// subscriber's point of view it is the publisher that failed.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StreamError::Upstream { .. } | StreamError::Transform { .. } => ErrorKind::Upstream,
            StreamError::Backpressure { .. } => ErrorKind::BackpressureViolation,
            StreamError::Protocol { .. } => ErrorKind::ProtocolViolation,
            StreamError::Scheduler { .. } => ErrorKind::Scheduler,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            StreamError::Upstream { .. } => "stream_upstream",
            StreamError::Transform { .. } => "stream_transform",
            StreamError::Backpressure { .. } => "stream_backpressure",
            StreamError::Protocol { .. } => "stream_protocol",
            StreamError::Scheduler { .. } => "stream_scheduler",
        }
    }
}

/// # Errors produced by a verification run.
///
/// Every variant except [`VerifyError::Panicked`] names the zero-based index of
/// the script step that was being evaluated.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// The observed signal is inconsistent with the current step.
    #[error("step {step}: expected {expected}, got {actual}")]
    ExpectationFailed {
        /// Index of the failing step.
        step: usize,
        /// Description of the expectation.
        expected: String,
        /// Description of what was observed ("no signal" when nothing was).
        actual: String,
    },

    /// A structural step was evaluated out of order.
    #[error("step {step}: script mismatch, expected {expected}, but {actual}")]
    ScriptMismatch {
        /// Index of the failing step.
        step: usize,
        /// Description of the expectation.
        expected: String,
        /// Description of the actual harness state.
        actual: String,
    },

    /// No signal arrived within the configured real-time wait.
    #[error("step {step}: timed out after {waited:?} waiting for {expected}")]
    Timeout {
        /// Index of the failing step.
        step: usize,
        /// Description of the awaited signal.
        expected: String,
        /// How long the harness waited.
        waited: Duration,
    },

    /// The publisher under test broke the signal protocol.
    #[error("step {step}: protocol violation: {reason}")]
    ProtocolViolation {
        /// Index of the step that observed the violation.
        step: usize,
        /// Description of the broken rule.
        reason: String,
    },

    /// A matcher or side effect panicked.
    #[error("verification panicked: {message}")]
    Panicked {
        /// Panic payload, when it was a string.
        message: String,
    },
}

impl VerifyError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use fluxvisor::VerifyError;
    ///
    /// let err = VerifyError::ScriptMismatch {
    ///     step: 0,
    ///     expected: "subscription".into(),
    ///     actual: "already consumed".into(),
    /// };
    /// assert_eq!(err.as_label(), "verify_script_mismatch");
    /// assert_eq!(err.step(), Some(0));
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            VerifyError::ExpectationFailed { .. } => "verify_expectation_failed",
            VerifyError::ScriptMismatch { .. } => "verify_script_mismatch",
            VerifyError::Timeout { .. } => "verify_timeout",
            VerifyError::ProtocolViolation { .. } => "verify_protocol_violation",
            VerifyError::Panicked { .. } => "verify_panicked",
        }
    }

    /// Returns the index of the offending step, if the error is tied to one.
    pub fn step(&self) -> Option<usize> {
        match self {
            VerifyError::ExpectationFailed { step, .. }
            | VerifyError::ScriptMismatch { step, .. }
            | VerifyError::Timeout { step, .. }
            | VerifyError::ProtocolViolation { step, .. } => Some(*step),
            VerifyError::Panicked { .. } => None,
        }
    }
}
