//! # Signals delivered from a publisher to a subscriber.
//!
//! The [`Signal`] enum is the vocabulary of one stream attachment:
//! - **Subscribed**: the subscription handshake (exactly once, first)
//! - **Next**: one value, bounded by granted demand
//! - **Complete** / **Error**: terminal, at most one, nothing follows
//!
//! ## Example
//! ```rust
//! use fluxvisor::{Signal, SignalKind, StreamError};
//!
//! let sig: Signal<u32> = Signal::Error(StreamError::upstream("boom"));
//! assert_eq!(sig.kind(), SignalKind::Error);
//! assert!(sig.is_terminal());
//! assert_eq!(sig.describe(), "error(upstream error: boom)");
//! ```

use std::fmt;

use crate::error::StreamError;

/// One event delivered to a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal<T> {
    /// The subscription was granted.
    Subscribed,
    /// A value.
    Next(T),
    /// Successful termination.
    Complete,
    /// Failed termination.
    Error(StreamError),
}

/// Payload-free classification of a [`Signal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Subscribed,
    Next,
    Complete,
    Error,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalKind::Subscribed => "subscription",
            SignalKind::Next => "next",
            SignalKind::Complete => "complete",
            SignalKind::Error => "error",
        };
        f.write_str(s)
    }
}

impl<T> Signal<T> {
    /// Returns the payload-free kind of this signal.
    #[inline]
    pub fn kind(&self) -> SignalKind {
        match self {
            Signal::Subscribed => SignalKind::Subscribed,
            Signal::Next(_) => SignalKind::Next,
            Signal::Complete => SignalKind::Complete,
            Signal::Error(_) => SignalKind::Error,
        }
    }

    /// True for `Complete` and `Error`.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Signal::Complete | Signal::Error(_))
    }
}

impl<T: fmt::Debug> Signal<T> {
    /// Renders the signal for failure reports, e.g. `next("foo")`.
    pub fn describe(&self) -> String {
        match self {
            Signal::Subscribed => "subscription".to_string(),
            Signal::Next(v) => format!("next({v:?})"),
            Signal::Complete => "complete".to_string(),
            Signal::Error(e) => format!("error({e})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_uses_debug_formatting_for_values() {
        assert_eq!(Signal::Next("foo").describe(), "next(\"foo\")");
        assert_eq!(Signal::<u8>::Complete.describe(), "complete");
        assert_eq!(Signal::<u8>::Subscribed.describe(), "subscription");
    }

    #[test]
    fn only_complete_and_error_are_terminal() {
        assert!(!Signal::<u8>::Subscribed.is_terminal());
        assert!(!Signal::Next(1u8).is_terminal());
        assert!(Signal::<u8>::Complete.is_terminal());
        assert!(Signal::<u8>::Error(StreamError::upstream("x")).is_terminal());
    }

    #[test]
    fn kind_displays_lowercase() {
        assert_eq!(SignalKind::Subscribed.to_string(), "subscription");
        assert_eq!(Signal::Next(1).kind().to_string(), "next");
    }
}
