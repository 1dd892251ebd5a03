//! Property tests for the reconnection engine.
//!
//! Invariants tested:
//! - Transports are attempted round-robin, skipping ineligible ones
//! - Every unit of retry budget is spent exactly once before exhaustion
//! - A disqualified transport is never attempted again

use proptest::prelude::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Builder;
use tower_failover_component::{
    BoxError, Component, ConnectRequest, Done, ErrorClassifier, Disposition, SessionEnd, TlsError,
};
use tower_failover_transport::{BackoffPolicy, Endpoint, TransportConfig};

/// Transports in `tls_broken` fail their handshake, the others are refused.
struct Classify;

impl ErrorClassifier for Classify {
    fn classify(&self, error: &(dyn std::error::Error + 'static)) -> Disposition {
        if error.is::<TlsError>() {
            Disposition::TransportLocal
        } else {
            Disposition::Retryable
        }
    }
}

fn run_failing(budgets: &[u32], tls_broken: &[bool]) -> (Done, Vec<usize>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&calls);
    let broken = tls_broken.to_vec();

    let mut builder = Component::builder(tower::service_fn(move |req: ConnectRequest| {
        recorded.lock().unwrap().push(req.transport);
        let error: BoxError = if broken[req.transport] {
            Box::new(TlsError::new("handshake failure"))
        } else {
            Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "refused",
            ))
        };
        async move { Err::<SessionEnd, _>(error) }
    }))
    .classifier(Classify);

    for (i, budget) in budgets.iter().enumerate() {
        builder = builder.transport(
            TransportConfig::rawsocket(Endpoint::tcp("127.0.0.1", 9000 + i as u16))
                .unwrap()
                .max_retries(*budget)
                .backoff(BackoffPolicy::fixed(Duration::from_millis(10)))
                .unwrap(),
        );
    }
    let component = builder.build().unwrap();

    let rt = Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap();
    let done = rt
        .block_on(async { component.start(rt.handle()).await })
        .unwrap();

    let calls = calls.lock().unwrap().clone();
    (done, calls)
}

/// Round-robin over transports that still have budget and were not
/// disqualified.
fn expected_order(budgets: &[u32], tls_broken: &[bool]) -> Vec<usize> {
    let mut remaining: Vec<u32> = budgets.to_vec();
    let mut failed = vec![false; budgets.len()];
    let mut order = Vec::new();

    loop {
        let mut progressed = false;
        for i in 0..budgets.len() {
            if failed[i] || remaining[i] == 0 {
                continue;
            }
            order.push(i);
            remaining[i] -= 1;
            failed[i] = tls_broken[i];
            progressed = true;
        }
        if !progressed {
            return order;
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: attempts follow round-robin order and spend every budget
    #[test]
    fn attempts_are_round_robin(
        budgets in prop::collection::vec(0u32..6, 1..6),
    ) {
        let healthy = vec![false; budgets.len()];
        let (done, calls) = run_failing(&budgets, &healthy);

        prop_assert_eq!(done, Done::Exhausted);
        prop_assert_eq!(calls.len() as u32, budgets.iter().sum::<u32>());
        prop_assert_eq!(calls, expected_order(&budgets, &healthy));
    }

    /// Property: a transport-local failure removes the transport for good
    #[test]
    fn disqualified_transports_are_never_retried(
        transports in prop::collection::vec((1u32..6, any::<bool>()), 1..6),
    ) {
        let budgets: Vec<u32> = transports.iter().map(|(b, _)| *b).collect();
        let broken: Vec<bool> = transports.iter().map(|(_, t)| *t).collect();
        let (done, calls) = run_failing(&budgets, &broken);

        prop_assert_eq!(done, Done::Exhausted);
        for (i, is_broken) in broken.iter().enumerate() {
            let attempts = calls.iter().filter(|t| **t == i).count();
            if *is_broken {
                prop_assert_eq!(attempts, 1);
            } else {
                prop_assert_eq!(attempts as u32, budgets[i]);
            }
        }
        prop_assert_eq!(calls, expected_order(&budgets, &broken));
    }
}
