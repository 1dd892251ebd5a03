use super::*;
use tokio::time::Instant;
use tower_failover_component::Done;
use tower_failover_transport::{BackoffReset, BackoffStrategy, ExponentialBackoff};

fn doubling(reset: BackoffReset) -> BackoffPolicy {
    BackoffPolicy::from_strategy(BackoffStrategy::Exponential(
        ExponentialBackoff::new(Duration::from_secs(1))
            .multiplier(2.0)
            .max_interval(Duration::from_secs(8)),
    ))
    .reset(reset)
}

fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s)
}

#[tokio::test(start_paused = true)]
async fn delays_grow_until_capped() {
    let log = CallLog::default();
    let events = EventLog::default();

    let builder = scripted(&log, |_, _| Err(refused()))
        .classifier(RetryEverything)
        .transport(
            transport(8001)
                .max_retries(6)
                .backoff(BackoffPolicy::exponential(
                    Duration::from_secs(1),
                    Duration::from_secs(4),
                ))
                .unwrap(),
        );
    let component = events.attach(builder).build().unwrap();

    let start = Instant::now();
    let done = component.start(&handle()).await.unwrap();
    let elapsed = start.elapsed();

    assert!(matches!(done, Done::Exhausted));
    let delays: Vec<_> = events.attempts().into_iter().map(|(_, _, d)| d).collect();
    assert_eq!(
        delays,
        vec![
            Duration::ZERO,
            secs(1.0),
            secs(1.5),
            secs(2.25),
            secs(3.375),
            secs(4.0),
        ]
    );
    assert!(elapsed >= secs(12.125), "elapsed {:?}", elapsed);
    assert!(elapsed < secs(12.5), "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn backoff_rewinds_when_cycle_returns() {
    let log = CallLog::default();
    let events = EventLog::default();

    let builder = scripted(&log, |_, _| Err(refused()))
        .classifier(RetryEverything)
        .transport(transport(8001).max_retries(3).backoff(doubling(BackoffReset::OnCycleReturn)).unwrap())
        .transport(transport(8002).max_retries(3).backoff(doubling(BackoffReset::OnCycleReturn)).unwrap());
    let component = events.attach(builder).build().unwrap();

    component.start(&handle()).await.unwrap();

    assert_eq!(
        events.attempts(),
        vec![
            (0, 1, Duration::ZERO),
            (1, 1, Duration::ZERO),
            (0, 2, secs(1.0)),
            (1, 2, secs(1.0)),
            (0, 3, secs(1.0)),
            (1, 3, secs(1.0)),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn backoff_keeps_growing_without_reset() {
    let log = CallLog::default();
    let events = EventLog::default();

    let builder = scripted(&log, |_, _| Err(refused()))
        .classifier(RetryEverything)
        .transport(transport(8001).max_retries(3).backoff(doubling(BackoffReset::Never)).unwrap())
        .transport(transport(8002).max_retries(3).backoff(doubling(BackoffReset::Never)).unwrap());
    let component = events.attach(builder).build().unwrap();

    component.start(&handle()).await.unwrap();

    assert_eq!(
        events.attempts(),
        vec![
            (0, 1, Duration::ZERO),
            (1, 1, Duration::ZERO),
            (0, 2, secs(1.0)),
            (1, 2, secs(1.0)),
            (0, 3, secs(2.0)),
            (1, 3, secs(2.0)),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn single_transport_is_never_rewound() {
    let log = CallLog::default();
    let events = EventLog::default();

    let builder = scripted(&log, |_, _| Err(refused()))
        .classifier(RetryEverything)
        .transport(transport(8001).max_retries(4).backoff(doubling(BackoffReset::OnCycleReturn)).unwrap());
    let component = events.attach(builder).build().unwrap();

    component.start(&handle()).await.unwrap();

    let delays: Vec<_> = events.attempts().into_iter().map(|(_, _, d)| d).collect();
    assert_eq!(delays, vec![Duration::ZERO, secs(1.0), secs(2.0), secs(4.0)]);
}

#[tokio::test(start_paused = true)]
async fn first_attempt_can_wait() {
    let log = CallLog::default();

    let component = scripted(&log, |_, _| Ok(SessionEnd::Completed))
        .transport(
            transport(8001)
                .backoff(BackoffPolicy::fixed(Duration::from_secs(5)).immediate_first_attempt(false))
                .unwrap(),
        )
        .build()
        .unwrap();

    let start = Instant::now();
    component.start(&handle()).await.unwrap();

    assert!(start.elapsed() >= Duration::from_secs(5));
    assert_eq!(log.len(), 1);
}
