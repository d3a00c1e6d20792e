//! Navigator and acquisition service tests over a scripted browser
//!
//! No Chromium needed: every session step is recorded so the tests can check
//! ordering and that the session is closed on every exit path.

mod common;

use common::{png, Script, ScriptedBackend};
use linkshot_web::acquisition::{Acquirer, AcquisitionConfig, AcquisitionService};
use linkshot_web::browser::{CaptureRequest, DocumentResponse, Navigator, NavigatorConfig, Viewport};
use linkshot_web::error::{CaptureError, Error, ErrorKind, NavigationError};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn service(backend: &ScriptedBackend) -> AcquisitionService {
    AcquisitionService::new(backend.navigator(), AcquisitionConfig::default())
}

fn closed_once(backend: &ScriptedBackend) -> bool {
    backend.steps().iter().filter(|s| *s == "close").count() == 1
}

#[tokio::test]
async fn test_capture_runs_steps_in_order() {
    let backend = ScriptedBackend::new(Script::default());
    let bytes = backend
        .navigator()
        .capture(&CaptureRequest::new("https://example.com/"))
        .await
        .unwrap();

    assert_eq!(bytes, png(1));
    assert_eq!(
        backend.steps(),
        vec![
            "launch",
            "configure 1280x800",
            "navigate https://example.com/",
            "evaluate",
            "idle",
            "screenshot",
            "close",
        ]
    );
}

#[tokio::test]
async fn test_request_viewport_is_applied() {
    let backend = ScriptedBackend::new(Script::default());
    let req = CaptureRequest::new("https://example.com/").viewport(Viewport {
        width: 800,
        height: 600,
    });
    backend.navigator().capture(&req).await.unwrap();

    assert!(backend.steps().contains(&"configure 800x600".to_string()));
}

#[tokio::test]
async fn test_http_404_fails_and_closes() {
    let backend = ScriptedBackend::new(Script {
        document: DocumentResponse::with_status(404, "Not Found"),
        ..Script::default()
    });

    let err = service(&backend).acquire("https://example.com/missing").await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::HttpError { status: 404 });
    assert_eq!(err.message, "HTTP 404 - Not Found");
    assert!(closed_once(&backend));
    assert!(!backend.steps().contains(&"screenshot".to_string()));
}

#[tokio::test]
async fn test_http2_404_without_status_text() {
    let backend = ScriptedBackend::new(Script {
        document: DocumentResponse::with_status(404, ""),
        ..Script::default()
    });

    let err = service(&backend).acquire("https://h2.test/missing").await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::HttpError { status: 404 });
    assert_eq!(err.message, "HTTP 404 - Not Found");
}

#[tokio::test]
async fn test_redirect_status_is_not_an_error() {
    let backend = ScriptedBackend::new(Script {
        document: DocumentResponse::with_status(304, "Not Modified"),
        ..Script::default()
    });

    assert!(service(&backend).acquire("https://example.com/").await.is_ok());
}

#[tokio::test]
async fn test_missing_status_is_accepted() {
    let backend = ScriptedBackend::new(Script {
        document: DocumentResponse::default(),
        ..Script::default()
    });

    assert!(service(&backend).acquire("file:///tmp/page.html").await.is_ok());
}

#[tokio::test]
async fn test_dns_failure_classified() {
    let backend = ScriptedBackend::new(Script {
        navigate_error: Some("net::ERR_NAME_NOT_RESOLVED at https://nope.invalid/".into()),
        ..Script::default()
    });

    let err = service(&backend).acquire("https://nope.invalid/").await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::DnsResolutionFailed);
    assert_eq!(err.message, "Could not resolve website address");
    assert!(closed_once(&backend));
}

#[tokio::test]
async fn test_connection_refused_classified() {
    let backend = ScriptedBackend::new(Script {
        navigate_error: Some("net::ERR_CONNECTION_REFUSED".into()),
        ..Script::default()
    });

    let err = service(&backend).acquire("http://localhost:1/").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ConnectionRefused);
    assert_eq!(err.message, "Connection refused by website");
}

#[tokio::test]
async fn test_other_navigation_failure_keeps_message() {
    let backend = ScriptedBackend::new(Script {
        navigate_error: Some("net::ERR_CERT_AUTHORITY_INVALID".into()),
        ..Script::default()
    });

    let err = service(&backend).acquire("https://self-signed.test/").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NavigationFailed);
    assert!(err.message.contains("ERR_CERT_AUTHORITY_INVALID"));
}

#[tokio::test]
async fn test_hanging_navigation_times_out() {
    let backend = ScriptedBackend::new(Script {
        navigate_hangs: true,
        ..Script::default()
    });
    let req = CaptureRequest::new("https://slow.test/").timeout_ms(50);

    let err = backend.navigator().capture(&req).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Navigation(NavigationError::Timeout(50))
    ));
    assert_eq!(
        linkshot_web::AcquisitionError::from(err).message,
        "Page load timed out"
    );
    assert!(closed_once(&backend));
}

#[tokio::test]
async fn test_cdp_request_timeout_is_navigation_timeout() {
    let backend = ScriptedBackend::new(Script {
        navigate_error: Some("Request timed out.".into()),
        ..Script::default()
    });

    let err = service(&backend).acquire("https://slow.test/").await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::NavigationTimeout);
    assert_eq!(err.message, "Page load timed out");
    assert!(closed_once(&backend));
}

#[tokio::test]
async fn test_consent_failure_is_ignored() {
    let backend = ScriptedBackend::new(Script {
        evaluate_fails: true,
        ..Script::default()
    });

    let bytes = service(&backend).acquire("https://example.com/").await.unwrap();
    assert_eq!(bytes, png(1));
}

#[tokio::test]
async fn test_consent_can_be_disabled() {
    let backend = ScriptedBackend::new(Script::default());
    let navigator = Navigator::new(
        Arc::new(backend.clone()),
        NavigatorConfig {
            settle_ms: 0,
            dismiss_consent: false,
            ..NavigatorConfig::default()
        },
    );

    navigator
        .capture(&CaptureRequest::new("https://example.com/"))
        .await
        .unwrap();
    assert!(!backend.steps().contains(&"evaluate".to_string()));
}

#[tokio::test]
async fn test_idle_timeout_is_not_fatal() {
    let backend = ScriptedBackend::new(Script {
        idle_times_out: true,
        ..Script::default()
    });

    assert!(service(&backend).acquire("https://busy.test/").await.is_ok());
}

#[tokio::test]
async fn test_screenshot_failure_closes_session() {
    let backend = ScriptedBackend::new(Script {
        screenshot: None,
        ..Script::default()
    });

    let err = service(&backend).acquire("https://example.com/").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::CaptureFailed);
    assert!(closed_once(&backend));
}

#[tokio::test]
async fn test_empty_image_rejected() {
    let backend = ScriptedBackend::new(Script {
        screenshot: Some(Vec::new()),
        ..Script::default()
    });

    let err = backend
        .navigator()
        .capture(&CaptureRequest::new("https://example.com/"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Capture(CaptureError::EmptyImage)));
}

#[tokio::test]
async fn test_non_png_rejected() {
    let backend = ScriptedBackend::new(Script {
        screenshot: Some(b"<html>".to_vec()),
        ..Script::default()
    });

    let err = service(&backend).acquire("https://example.com/").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::CaptureFailed);
}

#[tokio::test]
async fn test_close_error_does_not_override_result() {
    let backend = ScriptedBackend::new(Script {
        close_fails: true,
        ..Script::default()
    });

    let bytes = service(&backend).acquire("https://example.com/").await.unwrap();
    assert_eq!(bytes, png(1));
}

#[tokio::test]
async fn test_launch_failure_is_service_unavailable() {
    let backend = ScriptedBackend::new(Script {
        launch_error: Some("no chrome binary".into()),
        ..Script::default()
    });
    let svc = service(&backend);

    let err = svc.acquire("https://example.com/").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ServiceUnavailable);

    let err = svc.health().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ServiceUnavailable);
    assert!(err.message.contains("no chrome binary"));
    assert!(!backend.steps().contains(&"close".to_string()));
}

#[tokio::test]
async fn test_health_launches_and_closes() {
    let backend = ScriptedBackend::new(Script::default());
    let message = service(&backend).health().await.unwrap();

    assert_eq!(message, "Service is running and the browser backend is working");
    assert_eq!(backend.steps(), vec!["launch", "close"]);
}

#[tokio::test]
async fn test_invalid_url_never_launches() {
    let backend = ScriptedBackend::new(Script::default());
    let svc = service(&backend);

    for url in ["", "not a url", "ftp://example.com/", "javascript:alert(1)"] {
        let err = svc.acquire(url).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidUrl, "{url}");
    }
    let long = format!("https://example.com/{}", "a".repeat(2100));
    assert_eq!(svc.acquire(&long).await.unwrap_err().kind, ErrorKind::InvalidUrl);

    assert_eq!(backend.launches(), 0);
}

#[tokio::test]
async fn test_each_capture_gets_a_fresh_session() {
    let backend = ScriptedBackend::new(Script::default());
    let svc = service(&backend);

    svc.acquire("https://a.test/").await.unwrap();
    svc.acquire("https://b.test/").await.unwrap();

    assert_eq!(backend.launches(), 2);
    assert_eq!(backend.steps().iter().filter(|s| *s == "close").count(), 2);
}
