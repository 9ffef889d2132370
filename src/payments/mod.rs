//! Payment domain: the [`Payment`] value and the stream-shaped
//! [`PaymentService`] boundary, with a fixed in-memory implementation.

mod payment;
mod service;

pub use payment::Payment;
pub use service::{InMemoryPaymentService, PaymentService};
