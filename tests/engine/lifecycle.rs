use super::*;
use tokio::time::{Instant, sleep};
use tower_failover_component::{Done, EngineState, Termination, stop_signal};

#[tokio::test(start_paused = true)]
async fn stop_during_backoff_cancels() {
    let log = CallLog::default();
    let (stop, signal) = stop_signal();

    let component = scripted(&log, |_, _| Err(refused()))
        .classifier(RetryEverything)
        .stop_signal(signal)
        .transport(
            transport(8001)
                .backoff(BackoffPolicy::fixed(Duration::from_secs(60)))
                .unwrap(),
        )
        .build()
        .unwrap();

    let handle = handle();
    let start = Instant::now();
    let (done, _) = tokio::join!(component.start(&handle), async {
        sleep(Duration::from_secs(10)).await;
        stop.stop();
    });

    assert_eq!(done.unwrap(), Done::Cancelled);
    assert_eq!(log.len(), 1);
    assert!(start.elapsed() < Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn stop_before_start_never_connects() {
    let log = CallLog::default();
    let (stop, signal) = stop_signal();
    stop.stop();

    let component = scripted(&log, |_, _| Ok(SessionEnd::Completed))
        .stop_signal(signal)
        .transport(transport(8001))
        .build()
        .unwrap();

    let done = component.start(&handle()).await.unwrap();

    assert_eq!(done, Done::Cancelled);
    assert_eq!(log.len(), 0);
}

#[tokio::test(start_paused = true)]
async fn dropped_stop_handle_does_not_cancel() {
    let log = CallLog::default();
    let (stop, signal) = stop_signal();
    drop(stop);

    let component = scripted(&log, |_, nth| {
        if nth == 2 {
            Ok(SessionEnd::Completed)
        } else {
            Err(refused())
        }
    })
    .classifier(RetryEverything)
    .stop_signal(signal)
    .transport(transport(8001))
    .build()
    .unwrap();

    let done = component.start(&handle()).await.unwrap();

    assert_eq!(done, Done::Success(SessionEnd::Completed));
    assert_eq!(log.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn state_transitions_follow_the_cycle() {
    let log = CallLog::default();
    let transitions = Arc::new(Mutex::new(Vec::new()));
    let t = Arc::clone(&transitions);

    let component = scripted(&log, |_, nth| {
        if nth == 2 {
            Ok(SessionEnd::Completed)
        } else {
            Err(refused())
        }
    })
    .classifier(RetryEverything)
    .transport(transport(8001))
    .on_state_change(move |_, to| t.lock().unwrap().push(to))
    .build()
    .unwrap();

    component.start(&handle()).await.unwrap();

    assert_eq!(
        *transitions.lock().unwrap(),
        vec![
            EngineState::WaitingBackoff {
                transport: 0,
                delay: Duration::ZERO,
            },
            EngineState::Connecting { transport: 0 },
            EngineState::WaitingBackoff {
                transport: 0,
                delay: Duration::from_millis(100),
            },
            EngineState::Connecting { transport: 0 },
            EngineState::Done(Termination::Success),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn terminal_state_is_final() {
    let log = CallLog::default();
    let events = EventLog::default();

    let builder = scripted(&log, |_, _| Err(refused()))
        .name("final")
        .transport(transport(8001))
        .transport(transport(8002));
    let component = events.attach(builder).build().unwrap();

    let err = component.start(&handle()).await.unwrap_err();
    assert_eq!(err.component(), "final");

    let calls = log.len();
    let emitted = events.events().len();

    sleep(Duration::from_secs(3600)).await;

    assert_eq!(log.len(), calls);
    assert_eq!(events.events().len(), emitted);

    let finished: Vec<_> = events
        .events()
        .into_iter()
        .filter_map(|event| match event {
            ComponentEvent::Finished { termination, .. } => Some(termination),
            _ => None,
        })
        .collect();
    assert_eq!(finished, vec![Termination::Failed]);
    assert!(matches!(
        events.events().last(),
        Some(ComponentEvent::Finished { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn panicking_listener_does_not_stop_the_engine() {
    let log = CallLog::default();

    let component = scripted(&log, |_, _| Ok(SessionEnd::Completed))
        .transport(transport(8001))
        .on_attempt(|_, _, _| panic!("listener bug"))
        .build()
        .unwrap();

    let done = component.start(&handle()).await.unwrap();

    assert_eq!(done, Done::Success(SessionEnd::Completed));
    assert_eq!(log.len(), 1);
}
