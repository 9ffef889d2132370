//! Time for time-based publishers.
//!
//! ## Contents
//! - [`VirtualClock`] logical clock with an ordered callback queue
//! - [`Scheduler`] real-time (tokio) or virtual tick source handed to `subscribe_on`

mod timer;
mod virtual_clock;

pub use timer::Scheduler;
pub use virtual_clock::VirtualClock;
