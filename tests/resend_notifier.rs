//! Integration tests for ResendNotifier using wiremock

use chrono::{TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use umami_digest::error::{AppError, DeliveryError};
use umami_digest::model::{Report, SummaryStats, TimeWindow, TopCity};
use umami_digest::notifier::{Notifier, ResendNotifier};

fn report() -> Report {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    Report {
        window: TimeWindow::new(start, end).unwrap(),
        stats: SummaryStats {
            pageviews: 100,
            visitors: 40,
            visits: 50,
            bounces: 10,
            total_time_seconds: 3600,
        },
        previous_stats: None,
        bounce_rate: 20.0,
        top_pages: vec![],
        browsers: vec![],
        devices: vec![],
        cities: vec![],
        top_cities: vec![TopCity {
            city: "Lisbon".to_string(),
            visits: 12,
        }],
        top_events: vec![],
        event_count: 0,
    }
}

fn notifier(server: &MockServer) -> ResendNotifier {
    ResendNotifier::with_base_url(
        &server.uri(),
        "re_test_key",
        "digest@example.com",
        "owner@example.com",
    )
}

#[tokio::test]
async fn test_send_posts_email() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(header("authorization", "Bearer re_test_key"))
        .and(body_partial_json(json!({
            "from": "digest@example.com",
            "to": ["owner@example.com"],
            "subject": "Daily Analytics Report: 1/1/2024"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "49a3999c-0ce1"})))
        .expect(1)
        .mount(&server)
        .await;

    let report = report();
    let result = notifier(&server)
        .send(&report, report.window.start())
        .await
        .unwrap();

    assert_eq!(result.id, "49a3999c-0ce1");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let html = body["html"].as_str().unwrap();
    assert!(html.contains("Lisbon"));
    assert!(html.contains("1h 0m"));
    assert!(html.contains("20.0%"));
}

#[tokio::test]
async fn test_send_surfaces_provider_rejection() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "statusCode": 422,
            "name": "validation_error",
            "message": "Invalid `from` field."
        })))
        .mount(&server)
        .await;

    let report = report();
    let err = notifier(&server)
        .send(&report, report.window.start())
        .await
        .unwrap_err();

    match err {
        AppError::Delivery(DeliveryError::Rejected { status, message }) => {
            assert_eq!(status, 422);
            assert_eq!(message, "Invalid `from` field.");
        }
        other => panic!("expected a rejected delivery, got {other:?}"),
    }
}

#[tokio::test]
async fn test_send_rejection_without_json_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let report = report();
    let err = notifier(&server)
        .send(&report, report.window.start())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "delivery");
    assert!(err.to_string().contains("upstream unavailable"));
}
