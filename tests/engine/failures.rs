use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tower_failover_component::{
    ApplicationError, ComponentError, DefaultClassifier, Done, NO_SUCH_REALM, TlsError,
};

/// A connector-side error wrapping the handshake failure as its source.
#[derive(Debug)]
struct DialError(TlsError);

impl std::fmt::Display for DialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dial failed")
    }
}

impl std::error::Error for DialError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

#[tokio::test(start_paused = true)]
async fn fatal_error_short_circuits() {
    let log = CallLog::default();

    let component = scripted(&log, |transport, _| match transport {
        0 => Err(Box::new(ApplicationError::new(NO_SUCH_REALM).with_message("realm 'app' not found"))
            as BoxError),
        _ => Ok(SessionEnd::Completed),
    })
    .name("fatal")
    .transport(transport(8001))
    .transport(transport(8002))
    .build()
    .unwrap();

    let err = component.start(&handle()).await.unwrap_err();

    assert_eq!(log.calls(), vec![0]);
    assert!(err.is_fatal());
    assert_eq!(err.component(), "fatal");
    assert_eq!(err.transport(), Some(0));

    let original = err.into_inner().unwrap();
    let app = original.downcast_ref::<ApplicationError>().unwrap();
    assert_eq!(app.uri, NO_SUCH_REALM);
    assert_eq!(app.message.as_deref(), Some("realm 'app' not found"));
}

#[tokio::test(start_paused = true)]
async fn custom_fatal_uri() {
    let log = CallLog::default();

    let component = scripted(&log, |_, _| {
        Err(Box::new(ApplicationError::new("wamp.error.not_authorized")) as BoxError)
    })
    .classifier(DefaultClassifier::new().fatal_uri("wamp.error.not_authorized"))
    .transport(transport(8001))
    .transport(transport(8002))
    .build()
    .unwrap();

    let err = component.start(&handle()).await.unwrap_err();
    assert!(matches!(err, ComponentError::Fatal { transport: 0, .. }));
    assert_eq!(log.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn tls_failure_disqualifies_transport() {
    let log = CallLog::default();
    let disqualified = Arc::new(AtomicUsize::new(0));
    let d = Arc::clone(&disqualified);

    let component = scripted(&log, |transport, nth| match (transport, nth) {
        (0, _) => Err(Box::new(TlsError::new("certificate verify failed")) as BoxError),
        (1, 3) => Ok(SessionEnd::Completed),
        _ => Err(Box::new(ApplicationError::new("wamp.error.system_shutdown")) as BoxError),
    })
    .name("tls")
    .classifier(DefaultClassifier::new().retryable_uri("wamp.error.system_shutdown"))
    .transport(transport(8443))
    .transport(transport(8080))
    .on_disqualified(move |transport| {
        assert_eq!(transport, 0);
        d.fetch_add(1, Ordering::SeqCst);
    })
    .build()
    .unwrap();

    let done = component.start(&handle()).await.unwrap();

    assert!(matches!(done, Done::Success(SessionEnd::Completed)));
    assert_eq!(log.calls(), vec![0, 1, 1, 1]);
    assert_eq!(disqualified.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn tls_failure_found_in_source_chain() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .try_init();
    let log = CallLog::default();

    let component = scripted(&log, |_, _| {
        Err(Box::new(DialError(TlsError::new("unknown ca"))) as BoxError)
    })
    .transport(transport(8443))
    .transport(transport(8444))
    .build()
    .unwrap();

    let done = component.start(&handle()).await.unwrap();

    assert!(matches!(done, Done::Exhausted));
    assert_eq!(log.calls(), vec![0, 1]);
}

#[tokio::test(start_paused = true)]
async fn unclassified_error_is_terminal() {
    let log = CallLog::default();

    let component = scripted(&log, |_, _| Err(refused()))
        .name("plain")
        .transport(transport(8001))
        .transport(transport(8002))
        .build()
        .unwrap();

    let err = component.start(&handle()).await.unwrap_err();

    assert!(!err.is_fatal());
    assert!(matches!(err, ComponentError::Failed { transport: 0, .. }));
    assert_eq!(log.len(), 1);

    let io = err.get_ref().unwrap().downcast_ref::<std::io::Error>().unwrap();
    assert_eq!(io.kind(), std::io::ErrorKind::ConnectionRefused);
}

#[tokio::test(start_paused = true)]
async fn retryable_errors_consume_budget() {
    let log = CallLog::default();
    let failures = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::clone(&failures);

    let component = scripted(&log, |_, _| {
        Err(Box::new(ApplicationError::new("wamp.error.system_shutdown")) as BoxError)
    })
    .classifier(DefaultClassifier::new().retry_application_errors(true))
    .transport(transport(8001).max_retries(3))
    .on_failure(move |transport, disposition| f.lock().unwrap().push((transport, disposition)))
    .build()
    .unwrap();

    let done = component.start(&handle()).await.unwrap();

    assert!(matches!(done, Done::Exhausted));
    assert_eq!(log.len(), 3);
    assert_eq!(
        *failures.lock().unwrap(),
        vec![(0, Disposition::Retryable); 3]
    );
}

#[tokio::test(start_paused = true)]
async fn unknown_serializer_fails_without_connecting() {
    let log = CallLog::default();

    let component = scripted(&log, |_, _| Ok(SessionEnd::Completed))
        .transport(transport(8001).serializers(["cbor"]))
        .transport(transport(8002))
        .build()
        .unwrap();

    let err = component.start(&handle()).await.unwrap_err();

    assert!(matches!(err, ComponentError::Failed { transport: 0, .. }));
    assert!(err.to_string().contains("unknown serializer 'cbor'"));
    assert_eq!(log.len(), 0);
}
