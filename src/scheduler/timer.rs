//! # Time source for time-based publishers.
//!
//! A [`Scheduler`] is handed to `Flux::subscribe_on` and decides where ticks
//! come from:
//! - [`Scheduler::RealTime`]: a tokio task driven by `tokio::time::interval_at`;
//! - [`Scheduler::Virtual`]: callbacks on a [`VirtualClock`], released by
//!   explicit advances.
//!
//! ## Rules
//! - Scheduled work stops as soon as the caller's token is cancelled.
//! - Real-time scheduling needs an ambient tokio runtime; without one the
//!   caller gets [`StreamError::Scheduler`] instead of a panic.

use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::StreamError;
use crate::scheduler::VirtualClock;

/// Where time-based sources get their ticks from.
#[derive(Clone, Debug, Default)]
pub enum Scheduler {
    /// Wall-clock timers on the current tokio runtime.
    #[default]
    RealTime,
    /// A logical clock advanced explicitly.
    Virtual(VirtualClock),
}

impl Scheduler {
    /// Returns the virtual clock, if this scheduler uses one.
    pub fn clock(&self) -> Option<&VirtualClock> {
        match self {
            Scheduler::RealTime => None,
            Scheduler::Virtual(clock) => Some(clock),
        }
    }

    /// True for [`Scheduler::Virtual`].
    #[inline]
    pub fn is_virtual(&self) -> bool {
        matches!(self, Scheduler::Virtual(_))
    }

    /// Runs `task` every `period`, first one `period` from now, until `token` is cancelled.
    ///
    /// ### Errors
    /// - zero `period` is rejected;
    /// - real-time scheduling without a tokio runtime fails.
    pub(crate) fn schedule_periodic<F>(
        &self,
        period: Duration,
        token: CancellationToken,
        mut task: F,
    ) -> Result<(), StreamError>
    where
        F: FnMut() + Send + 'static,
    {
        if period.is_zero() {
            return Err(StreamError::scheduler("period must be greater than zero"));
        }

        match self {
            Scheduler::Virtual(clock) => {
                clock.schedule_periodic_until(period, period, token, task);
                Ok(())
            }
            Scheduler::RealTime => {
                let handle = tokio::runtime::Handle::try_current()
                    .map_err(|e| StreamError::scheduler(e.to_string()))?;

                handle.spawn(async move {
                    let mut ticker = time::interval_at(Instant::now() + period, period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    loop {
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => break,
                            _ = ticker.tick() => task(),
                        }
                    }
                });
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn zero_period_is_rejected() {
        let err = Scheduler::Virtual(VirtualClock::new())
            .schedule_periodic(Duration::ZERO, CancellationToken::new(), || {})
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Scheduler);
    }

    #[test]
    fn real_time_without_runtime_is_an_error() {
        let err = Scheduler::RealTime
            .schedule_periodic(Duration::from_millis(5), CancellationToken::new(), || {})
            .unwrap_err();
        assert!(matches!(err, StreamError::Scheduler { .. }));
    }

    #[test]
    fn virtual_ticks_stop_when_token_is_cancelled() {
        let clock = VirtualClock::new();
        let scheduler = Scheduler::Virtual(clock.clone());
        let token = CancellationToken::new();
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        scheduler
            .schedule_periodic(Duration::from_secs(1), token.clone(), move || {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        clock.advance(Duration::from_secs(3));
        token.cancel();
        clock.advance(Duration::from_secs(3));

        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(clock.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn real_time_ticks_follow_tokio_time() {
        let token = CancellationToken::new();
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        Scheduler::RealTime
            .schedule_periodic(Duration::from_secs(1), token.clone(), move || {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        token.cancel();
        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
