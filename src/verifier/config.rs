//! # Verification configuration.
//!
//! Provides [`VerifierConfig`], the per-run settings of a
//! [`StepVerifier`](crate::StepVerifier).
//!
//! ## Sentinel values
//! - `timeout = 0s` → wait forever for each awaited signal
//! - `initial_demand = UNBOUNDED` → the recorder never limits the publisher

use std::time::Duration;

use crate::signals::UNBOUNDED;

/// Settings for one verification run.
///
/// ## Field semantics
/// - `timeout`: real-time bound on each wait for a signal (`0s` = no bound)
/// - `initial_demand`: requested right after subscription (`0` = nothing until
///   the script asks)
///
/// ## Notes
/// All fields are public. Prefer [`VerifierConfig::wait_limit`] over checking
/// the `0s` sentinel by hand.
#[derive(Clone, Debug)]
pub struct VerifierConfig {
    /// Longest real-time wait for the next signal.
    ///
    /// Applies in virtual-time runs too: there it only matters when the
    /// publisher is driven from outside the clock.
    pub timeout: Duration,

    /// Demand requested by the recording subscriber on subscription.
    pub initial_demand: u64,
}

impl VerifierConfig {
    /// Returns the per-signal wait as an `Option`.
    ///
    /// - `None` → wait forever
    /// - `Some(d)` → give up after `d`
    #[inline]
    pub fn wait_limit(&self) -> Option<Duration> {
        if self.timeout.is_zero() {
            None
        } else {
            Some(self.timeout)
        }
    }
}

impl Default for VerifierConfig {
    /// Default configuration:
    ///
    /// - `timeout = 10s`
    /// - `initial_demand = UNBOUNDED`
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            initial_demand: UNBOUNDED,
        }
    }
}
