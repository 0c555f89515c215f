//! HTTP API handlers for Umami Digest.
//!
//! - **GET /api/email**: builds the report for the rolling 24-hour window and
//!   emails it. This is the endpoint the external scheduler calls.
//! - **GET /api/cron/analytics**: builds the same report without sending it,
//!   for dashboard previews.
//! - **GET /health**: liveness check.
//!
//! Failures are logged in full server-side. Callers only get a generic
//! message, plus the error detail when running in development.
//!
//! Overlapping calls to `/api/email` are not coordinated: two triggers for the
//! same window send two emails. This is accepted; nothing here deduplicates.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};

use crate::config::MAX_TOP_CITIES;
use crate::error::AppError;
use crate::model::{DigestResponse, Period, PreviewQuery, PreviewResponse, TimeWindow};
use crate::notifier::Notifier;
use crate::report::ReportBuilder;

const SEND_FAILED: &str = "Failed to send analytics email";
const PREVIEW_FAILED: &str = "Failed to build analytics report";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub builder: ReportBuilder,
    pub notifier: Arc<dyn Notifier>,
    /// Include error detail in responses.
    pub development: bool,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/email", get(send_digest))
        .route("/api/cron/analytics", get(preview_report))
        .route("/health", get(health_check))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// GET /api/email - Build the digest for the last 24 hours and send it.
///
/// # Response
///
/// ```json
/// {
///     "success": true,
///     "message": "Analytics email sent successfully",
///     "period": { "start": "2024-01-01T09:00:00Z", "end": "2024-01-02T09:00:00Z" }
/// }
/// ```
///
/// Returns `500` with `{ "success": false, "error": "..." }` on any failure.
#[instrument(skip(state))]
pub async fn send_digest(State(state): State<AppState>) -> impl IntoResponse {
    let window = TimeWindow::rolling_day(Utc::now());

    let report = match state.builder.build_report(window).await {
        Ok(report) => report,
        Err(e) => return failure(&e, SEND_FAILED, state.development),
    };

    match state.notifier.send(&report, window.start()).await {
        Ok(delivery) => {
            info!(
                id = %delivery.id,
                start = %window.start(),
                end = %window.end(),
                "Digest delivered"
            );
            (
                StatusCode::OK,
                Json(DigestResponse {
                    success: true,
                    message: Some("Analytics email sent successfully".to_string()),
                    period: Some(Period::from(window)),
                    error: None,
                    detail: None,
                }),
            )
        }
        Err(e) => failure(&e, SEND_FAILED, state.development),
    }
}

/// GET /api/cron/analytics - Build the report without sending it.
///
/// # Query Parameters
///
/// - `city_limit` (optional): Number of top cities, 1 to 10 (default: configured limit)
/// - `start_at`, `end_at` (optional, together): Window bounds in epoch milliseconds
///   (default: the last 24 hours)
#[instrument(skip(state))]
pub async fn preview_report(
    State(state): State<AppState>,
    Query(query): Query<PreviewQuery>,
) -> Result<Json<PreviewResponse>, (StatusCode, Json<DigestResponse>)> {
    let window = match (query.start_at, query.end_at) {
        (None, None) => TimeWindow::rolling_day(Utc::now()),
        (Some(start), Some(end)) => match TimeWindow::from_millis(start, end) {
            Some(Ok(window)) => window,
            Some(Err(e)) => return Err(bad_request(e.to_string())),
            None => return Err(bad_request("timestamp out of range".to_string())),
        },
        _ => {
            return Err(bad_request(
                "start_at and end_at must be given together".to_string(),
            ));
        }
    };

    // The comparison window must stay inside the representable range
    if state.builder.options().compare_previous && window.previous().is_none() {
        return Err(bad_request(
            "window is too long to compare against the previous period".to_string(),
        ));
    }

    let city_limit = query
        .city_limit
        .unwrap_or(state.builder.options().top_cities);
    if !(1..=MAX_TOP_CITIES).contains(&city_limit) {
        return Err(bad_request(format!(
            "city_limit must be between 1 and {MAX_TOP_CITIES}"
        )));
    }

    match state
        .builder
        .build_report_with_city_limit(window, city_limit)
        .await
    {
        Ok(report) => {
            info!(
                start = %window.start(),
                end = %window.end(),
                pageviews = report.stats.pageviews,
                "Report previewed"
            );
            Ok(Json(PreviewResponse {
                success: true,
                overview: report.overview(),
                report,
            }))
        }
        Err(e) => Err(failure(&e, PREVIEW_FAILED, state.development)),
    }
}

/// GET /health - Simple health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Log `e` in full and build the generic 500 envelope.
fn failure(
    e: &AppError,
    message: &str,
    development: bool,
) -> (StatusCode, Json<DigestResponse>) {
    error!(
        kind = e.kind(),
        error = %e,
        debug = ?e,
        upstream_body = e.upstream_body(),
        "{message}"
    );

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(DigestResponse {
            success: false,
            message: None,
            period: None,
            error: Some(message.to_string()),
            detail: development.then(|| e.to_string()),
        }),
    )
}

fn bad_request(reason: String) -> (StatusCode, Json<DigestResponse>) {
    warn!(reason = %reason, "Rejected preview request");
    (
        StatusCode::BAD_REQUEST,
        Json(DigestResponse {
            success: false,
            message: None,
            period: None,
            error: Some(reason),
            detail: None,
        }),
    )
}
