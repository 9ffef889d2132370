use crate::payments::Payment;
use crate::publishers::Flux;

/// Read and submit access to payments, exposed as streams.
///
/// # Example
/// ```
/// use fluxvisor::{Flux, Payment, PaymentService, StepVerifier};
///
/// struct Fixed;
///
/// impl PaymentService for Fixed {
///     fn list(&self) -> Flux<Payment> {
///         Flux::just([Payment::new(7, 70)])
///     }
///     fn send(&self, _payment: Flux<Payment>) -> Flux<String> {
///         Flux::just(["accepted".to_string()])
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// StepVerifier::create(Fixed.list())
///     .expect_next_matches(|p| p.id == 7)
///     .verify_complete()
///     .await
///     .unwrap();
/// # }
/// ```
pub trait PaymentService: Send + Sync {
    /// All known payments, then completion.
    fn list(&self) -> Flux<Payment>;

    /// Submits a deferred payment; the result stream carries acknowledgments.
    fn send(&self, payment: Flux<Payment>) -> Flux<String>;
}

/// Fixed in-memory catalogue of two payments.
///
/// `send` accepts nothing: its input is dropped unsubscribed and the
/// acknowledgment stream is empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryPaymentService;

impl PaymentService for InMemoryPaymentService {
    fn list(&self) -> Flux<Payment> {
        Flux::just([Payment::new(1, 1000), Payment::new(2, 2500)])
    }

    fn send(&self, payment: Flux<Payment>) -> Flux<String> {
        tracing::debug!("payment submission discarded");
        drop(payment);
        Flux::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publishers::ManualPublisher;
    use crate::verifier::StepVerifier;

    #[tokio::test]
    async fn list_yields_the_catalogue() {
        StepVerifier::create(InMemoryPaymentService.list())
            .expect_next(Payment::new(1, 1000))
            .expect_next(Payment::new(2, 2500))
            .verify_complete()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn send_acknowledges_with_an_empty_stream() {
        let input = ManualPublisher::<Payment>::new();
        let service: &dyn PaymentService = &InMemoryPaymentService;

        StepVerifier::create(service.send(input.flux()))
            .verify_complete()
            .await
            .unwrap();
        assert!(!input.was_subscribed());
    }
}
