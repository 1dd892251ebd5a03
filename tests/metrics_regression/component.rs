//! Component metrics regression tests

use super::helpers::*;
use serial_test::serial;
use std::time::Duration;
use tower_failover_component::{
    ApplicationError, BoxError, Component, ConnectRequest, DefaultClassifier, SessionEnd, TlsError,
};
use tower_failover_transport::{BackoffPolicy, Endpoint, TransportConfig};

fn transport(port: u16) -> TransportConfig {
    TransportConfig::rawsocket(Endpoint::tcp("127.0.0.1", port))
        .unwrap()
        .backoff(BackoffPolicy::fixed(Duration::from_millis(1)))
        .unwrap()
}

#[tokio::test]
#[serial]
async fn component_metrics_exist() {
    init_recorder();

    let counter = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter_clone = counter.clone();
    let component = Component::builder(tower::service_fn(move |req: ConnectRequest| {
        let count = counter_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        async move {
            if req.transport == 0 {
                Err(Box::new(TlsError::new("bad certificate")) as BoxError)
            } else if count < 2 {
                Err(Box::new(ApplicationError::new("wamp.error.system_shutdown")) as BoxError)
            } else {
                Ok(SessionEnd::Completed)
            }
        }
    }))
    .name("test_component")
    .classifier(DefaultClassifier::new().retry_application_errors(true))
    .transport(transport(8443))
    .transport(transport(8080))
    .build()
    .unwrap();

    let _ = component.start(&tokio::runtime::Handle::current()).await;

    // Verify counter metrics
    assert_counter_exists("failover_attempts_total");
    assert_metric_has_label("failover_attempts_total", "component", "test_component");
    assert_metric_has_label("failover_attempts_total", "transport", "0");
    assert_metric_has_label("failover_attempts_total", "transport", "1");

    assert_counter_exists("failover_failures_total");
    assert_metric_has_label("failover_failures_total", "disposition", "transport_local");
    assert_metric_has_label("failover_failures_total", "disposition", "retryable");

    assert_counter_exists("failover_terminations_total");
    assert_metric_has_label("failover_terminations_total", "outcome", "success");

    // Verify gauge metric
    assert_gauge_exists("failover_eligible_transports");
    assert_metric_has_label("failover_eligible_transports", "component", "test_component");
}

#[tokio::test]
#[serial]
async fn fatal_termination_metrics() {
    init_recorder();

    let component = Component::builder(tower::service_fn(|_req: ConnectRequest| async {
        Err::<SessionEnd, _>(ApplicationError::new(
            tower_failover_component::NO_SUCH_REALM,
        ))
    }))
    .name("fatal_component")
    .transport(transport(8080))
    .build()
    .unwrap();

    let _ = component.start(&tokio::runtime::Handle::current()).await;

    assert_counter_exists("failover_terminations_total");
    assert_metric_has_label("failover_terminations_total", "component", "fatal_component");
    assert_metric_has_label("failover_terminations_total", "outcome", "fatal");
    assert_metric_has_label("failover_failures_total", "disposition", "fatal");
}
