use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fluxvisor::{
    ErrorKind, Flux, InMemoryPaymentService, ManualPublisher, Payment, PaymentService,
    StepVerifier, StreamError, VerifyError, UNBOUNDED,
};

const MINUTE: Duration = Duration::from_secs(60);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn send_with_interval() -> Flux<String> {
    Flux::interval(MINUTE)
        .zip(Flux::just(["a", "b", "c"]))
        .map(|(i, s)| format!("[{i},{s}]"))
}

#[tokio::test]
async fn literal_values_then_complete() {
    init_tracing();
    StepVerifier::create(Flux::just(["foo", "bar"]))
        .expect_subscription()
        .expect_next("foo")
        .expect_next("bar")
        .expect_complete()
        .verify()
        .await
        .unwrap();
}

#[tokio::test]
async fn range_with_counted_middle() {
    StepVerifier::create(Flux::range(0, 100))
        .expect_subscription()
        .expect_next(0)
        .expect_next_count(98)
        .expect_next(99)
        .expect_complete()
        .verify()
        .await
        .unwrap();
}

#[tokio::test]
async fn predicate_then_cancel() {
    let verified = StepVerifier::create(Flux::just(["alpha-foo", "beta-bar"]))
        .expect_subscription()
        .expect_next_matches(|s| s.starts_with("alpha"))
        .then_cancel()
        .verify()
        .await
        .unwrap();
    assert!(verified.cancelled);
}

#[tokio::test]
async fn declared_error_is_matched_by_kind() {
    StepVerifier::create(Flux::<String>::error(StreamError::upstream("Error")))
        .expect_error_kind(ErrorKind::Upstream)
        .verify()
        .await
        .unwrap();
}

#[tokio::test]
async fn wrong_error_kind_is_an_expectation_failure() {
    let err = StepVerifier::create(Flux::<u8>::error(StreamError::upstream("Error")))
        .expect_error_kind(ErrorKind::BackpressureViolation)
        .verify()
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::ExpectationFailed { step: 0, .. }));
}

#[tokio::test]
async fn limited_demand_then_request_more() {
    StepVerifier::create_with_demand(Flux::range(0, 100), 2)
        .expect_subscription()
        .expect_next(0)
        .expect_next(1)
        .then_request(3)
        .expect_next_values([2, 3, 4])
        .then_cancel()
        .verify()
        .await
        .unwrap();
}

#[tokio::test]
async fn limited_demand_is_never_exceeded() {
    let err = StepVerifier::create_with_demand(Flux::range(0, 100), 2)
        .with_timeout(Duration::from_millis(50))
        .expect_next_values([0, 1, 2])
        .verify()
        .await
        .unwrap_err();
    assert!(matches!(err, VerifyError::Timeout { step: 2, .. }));
}

#[tokio::test]
async fn manual_publisher_driven_from_side_effects() {
    let ids = ManualPublisher::new();
    let (next, complete) = (ids.clone(), ids.clone());

    StepVerifier::create(ids.flux())
        .expect_subscription()
        .then(move || next.next("1".to_string()).unwrap())
        .expect_next("1".to_string())
        .then(move || complete.complete().unwrap())
        .expect_complete()
        .verify()
        .await
        .unwrap();

    assert!(ids.was_subscribed());
    assert_eq!(ids.subscriber_count(), 0);
}

#[tokio::test]
async fn manual_publisher_without_demand_fails_the_subscriber() {
    let ids = ManualPublisher::new();
    let driver = ids.clone();

    StepVerifier::create_with_demand(ids.flux(), 0)
        .expect_subscription()
        .then(move || assert!(driver.next(1u32).is_err()))
        .expect_error_kind(ErrorKind::BackpressureViolation)
        .verify()
        .await
        .unwrap();
}

#[tokio::test]
async fn virtual_time_await_three_minutes() {
    init_tracing();
    let verified = StepVerifier::with_virtual_time(send_with_interval)
        .expect_subscription()
        .then_await(MINUTE * 3)
        .expect_next_values(["[0,a]", "[1,b]", "[2,c]"].map(String::from))
        .expect_complete()
        .verify()
        .await
        .unwrap();
    assert_eq!(verified.virtual_elapsed, Some(MINUTE * 3));
}

#[tokio::test]
async fn virtual_time_split_awaits_match_one_await() {
    StepVerifier::with_virtual_time(send_with_interval)
        .then_await(MINUTE)
        .then_await(MINUTE + Duration::from_secs(30))
        .then_await(Duration::from_secs(30))
        .expect_next_values(["[0,a]", "[1,b]", "[2,c]"].map(String::from))
        .verify_complete()
        .await
        .unwrap();
}

#[tokio::test]
async fn virtual_time_no_event_windows() {
    StepVerifier::with_virtual_time(send_with_interval)
        .expect_subscription()
        .expect_no_event(MINUTE)
        .expect_next("[0,a]".to_string())
        .expect_no_event(MINUTE)
        .expect_next("[1,b]".to_string())
        .then_cancel()
        .verify()
        .await
        .unwrap();
}

#[tokio::test]
async fn virtual_time_supplier_runs_once_per_verification() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);

    let verifier = StepVerifier::with_virtual_time(move || {
        counted.fetch_add(1, Ordering::SeqCst);
        Flux::interval(MINUTE)
    });
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    verifier
        .then_await(MINUTE)
        .expect_next(0)
        .then_cancel()
        .verify()
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn interval_overflow_surfaces_as_backpressure() {
    StepVerifier::with_virtual_time(|| Flux::interval(MINUTE))
        .with_initial_demand(1)
        .then_await(MINUTE * 2)
        .expect_next(0)
        .expect_error_kind(ErrorKind::BackpressureViolation)
        .verify()
        .await
        .unwrap();
}

#[tokio::test]
async fn failing_transform_is_an_upstream_error() {
    StepVerifier::create(Flux::range(1, 5).try_map(|n| {
        if n < 3 {
            Ok(n)
        } else {
            Err(StreamError::transform("too big"))
        }
    }))
    .expect_next_values([1, 2])
    .expect_error_matches(|e| matches!(e, StreamError::Transform { .. }))
    .verify()
    .await
    .unwrap();
}

#[tokio::test]
async fn payment_list_from_a_mock_service() {
    struct Mock;

    impl PaymentService for Mock {
        fn list(&self) -> Flux<Payment> {
            Flux::just([Payment::new(1, 1000), Payment::new(2, 2000)])
        }
        fn send(&self, _payment: Flux<Payment>) -> Flux<String> {
            Flux::empty()
        }
    }

    let service: Arc<dyn PaymentService> = Arc::new(Mock);
    StepVerifier::create(service.list())
        .expect_next_matches(|p| p.id == 1)
        .expect_next_matches(|p| p.id == 2)
        .expect_complete()
        .verify()
        .await
        .unwrap();
}

#[tokio::test]
async fn in_memory_payment_service() {
    let service = InMemoryPaymentService;
    StepVerifier::create(service.list())
        .expect_next_matches(|p| p.id == 1 && p.amount == 1000)
        .expect_next_matches(|p| p.id == 2 && p.amount == 2500)
        .verify_complete()
        .await
        .unwrap();

    StepVerifier::create(service.send(Flux::just([Payment::new(3, 10)])))
        .verify_complete()
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn manual_publisher_driven_from_another_task() {
    let ids = ManualPublisher::new();
    let driver = ids.clone();
    let verify = tokio::spawn(
        StepVerifier::create(ids.flux())
            .with_initial_demand(UNBOUNDED)
            .expect_next_values([1u32, 2, 3])
            .verify_complete(),
    );

    while !driver.was_requested() {
        tokio::task::yield_now().await;
    }
    driver.emit([1, 2, 3]).unwrap();

    verify.await.unwrap().unwrap();
}

#[tokio::test]
async fn cancel_succeeds_whatever_follows_it() {
    let verified = StepVerifier::create(Flux::range(0, 10))
        .with_timeout(Duration::from_millis(200))
        .expect_next(0)
        .then_cancel()
        .expect_next(42)
        .expect_error()
        .expect_complete()
        .verify()
        .await
        .unwrap();
    assert!(verified.cancelled);
    assert_eq!(verified.steps, 2);

    StepVerifier::with_virtual_time(send_with_interval)
        .then_await(MINUTE)
        .expect_next("[0,a]".to_string())
        .then_cancel()
        .then_await(MINUTE * 10)
        .expect_next("never".to_string())
        .verify_complete()
        .await
        .unwrap();
}

#[tokio::test]
async fn cancelled_mapped_pipeline_releases_its_values() {
    let item = Arc::new(1u32);
    let flux = Flux::just([Arc::clone(&item), Arc::clone(&item)]).map(|v| v);

    StepVerifier::create_with_demand(flux, 1)
        .expect_next_matches(|v| **v == 1)
        .then_cancel()
        .verify()
        .await
        .unwrap();

    assert_eq!(Arc::strong_count(&item), 1);
}
