//! Data models for Umami Digest.
//!
//! Every type here is a transient, request-scoped value. Nothing is cached or
//! persisted between invocations.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregation::{format_time, percent_change};

/// Length of the rolling window used for scheduled digests.
pub const ROLLING_WINDOW_HOURS: i64 = 24;

/// Label used when the provider omits a breakdown label.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Error returned when a window would end before it starts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("window start {start} is after end {end}")]
pub struct InvalidWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a window, rejecting `start > end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, InvalidWindow> {
        if start > end {
            return Err(InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Create a window from epoch milliseconds.
    pub fn from_millis(start_ms: i64, end_ms: i64) -> Option<Result<Self, InvalidWindow>> {
        let start = DateTime::from_timestamp_millis(start_ms)?;
        let end = DateTime::from_timestamp_millis(end_ms)?;
        Some(Self::new(start, end))
    }

    /// The rolling 24-hour window ending at `now`.
    ///
    /// This is the single window policy used by every trigger.
    pub fn rolling_day(now: DateTime<Utc>) -> Self {
        Self {
            start: now - Duration::hours(ROLLING_WINDOW_HOURS),
            end: now,
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// The comparison window: same duration, ending where this one starts.
    ///
    /// `None` when its start falls outside the representable range.
    pub fn previous(&self) -> Option<Self> {
        let start = self.start.checked_sub_signed(self.duration())?;
        Some(Self {
            start,
            end: self.start,
        })
    }

    pub fn start_millis(&self) -> i64 {
        self.start.timestamp_millis()
    }

    pub fn end_millis(&self) -> i64 {
        self.end.timestamp_millis()
    }
}

/// One row of a breakdown (page path, browser, device, city).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub label: String,
    pub count: u64,
}

/// Headline traffic numbers for one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub pageviews: u64,
    pub visitors: u64,
    pub visits: u64,
    /// Never greater than `visits`.
    pub bounces: u64,
    pub total_time_seconds: u64,
}

/// An event name and how often it fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopEvent {
    pub event: String,
    pub count: u64,
}

/// A city and its summed visits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopCity {
    pub city: String,
    pub visits: u64,
}

/// Period-over-period change in percent; `None` when the previous value was zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatDeltas {
    pub pageviews: Option<f64>,
    pub visitors: Option<f64>,
    pub visits: Option<f64>,
    pub bounces: Option<f64>,
    pub total_time: Option<f64>,
}

/// The fully aggregated summary for one window.
///
/// This is the only value handed to a [`Notifier`](crate::notifier::Notifier).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub window: TimeWindow,
    pub stats: SummaryStats,
    /// Stats for the preceding window of equal length, when fetched.
    pub previous_stats: Option<SummaryStats>,
    /// Percentage with one decimal.
    pub bounce_rate: f64,
    pub top_pages: Vec<MetricPoint>,
    pub browsers: Vec<MetricPoint>,
    pub devices: Vec<MetricPoint>,
    /// City breakdown as reported by the provider.
    pub cities: Vec<MetricPoint>,
    /// Cities ranked by summed session visits.
    pub top_cities: Vec<TopCity>,
    pub top_events: Vec<TopEvent>,
    /// Count of the configured custom event (or of all events).
    pub event_count: u64,
}

impl Report {
    /// Bounce rate as shown to humans, e.g. `"20.0%"`.
    pub fn bounce_rate_label(&self) -> String {
        format!("{:.1}%", self.bounce_rate)
    }

    /// Total time on site, e.g. `"1h 0m"`.
    pub fn time_on_site(&self) -> String {
        format_time(self.stats.total_time_seconds)
    }

    /// Change against the previous window, if it was fetched.
    pub fn deltas(&self) -> Option<StatDeltas> {
        let prev = self.previous_stats?;
        let cur = &self.stats;
        Some(StatDeltas {
            pageviews: percent_change(cur.pageviews, prev.pageviews),
            visitors: percent_change(cur.visitors, prev.visitors),
            visits: percent_change(cur.visits, prev.visits),
            bounces: percent_change(cur.bounces, prev.bounces),
            total_time: percent_change(cur.total_time_seconds, prev.total_time_seconds),
        })
    }

    /// Flat, display-ready view of the report.
    pub fn overview(&self) -> ReportOverview {
        ReportOverview {
            page_views: self.stats.pageviews,
            unique_visitors: self.stats.visitors,
            total_visits: self.stats.visits,
            bounce_rate: self.bounce_rate_label(),
            time_on_site: self.time_on_site(),
            event_count: self.event_count,
            deltas: self.deltas(),
            period: Period::from(self.window),
        }
    }
}

/// Display-ready headline numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportOverview {
    pub page_views: u64,
    pub unique_visitors: u64,
    pub total_visits: u64,
    pub bounce_rate: String,
    pub time_on_site: String,
    pub event_count: u64,
    pub deltas: Option<StatDeltas>,
    pub period: Period,
}

/// Window bounds as returned to HTTP callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl From<TimeWindow> for Period {
    fn from(window: TimeWindow) -> Self {
        Self {
            start: window.start(),
            end: window.end(),
        }
    }
}

/// Result of a successful hand-off to the delivery provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResult {
    /// Provider-assigned message id.
    pub id: String,
}

/// JSON envelope returned by the send endpoint and by every failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Full error text; only populated in development.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Response for the preview endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewResponse {
    pub success: bool,
    pub overview: ReportOverview,
    pub report: Report,
}

/// Query parameters for the preview endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct PreviewQuery {
    /// Number of top cities (defaults to the configured limit).
    pub city_limit: Option<usize>,
    /// Window start in epoch milliseconds; requires `end_at`.
    pub start_at: Option<i64>,
    /// Window end in epoch milliseconds; requires `start_at`.
    pub end_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn sample_report() -> Report {
        Report {
            window: TimeWindow::new(ts(2024, 1, 1, 0), ts(2024, 1, 2, 0)).unwrap(),
            stats: SummaryStats {
                pageviews: 150,
                visitors: 40,
                visits: 50,
                bounces: 10,
                total_time_seconds: 3600,
            },
            previous_stats: Some(SummaryStats {
                pageviews: 100,
                visitors: 40,
                visits: 0,
                bounces: 20,
                total_time_seconds: 1800,
            }),
            bounce_rate: 20.0,
            top_pages: vec![],
            browsers: vec![],
            devices: vec![],
            cities: vec![],
            top_cities: vec![],
            top_events: vec![],
            event_count: 4,
        }
    }

    #[test]
    fn test_window_rejects_inverted_bounds() {
        let err = TimeWindow::new(ts(2024, 1, 2, 0), ts(2024, 1, 1, 0)).unwrap_err();
        assert_eq!(err.start, ts(2024, 1, 2, 0));

        // Empty windows are allowed
        assert!(TimeWindow::new(ts(2024, 1, 1, 0), ts(2024, 1, 1, 0)).is_ok());
    }

    #[test]
    fn test_rolling_day_and_previous() {
        let now = ts(2024, 3, 10, 9);
        let window = TimeWindow::rolling_day(now);

        assert_eq!(window.end(), now);
        assert_eq!(window.start(), ts(2024, 3, 9, 9));
        assert_eq!(window.duration(), Duration::hours(24));

        let previous = window.previous().unwrap();
        assert_eq!(previous.start(), ts(2024, 3, 8, 9));
        assert_eq!(previous.end(), window.start());
    }

    #[test]
    fn test_previous_out_of_range() {
        let window = TimeWindow::from_millis(-8_000_000_000_000_000, 8_000_000_000_000_000)
            .unwrap()
            .unwrap();
        assert!(window.previous().is_none());
    }

    #[test]
    fn test_window_millis() {
        let window = TimeWindow::new(ts(2024, 1, 1, 0), ts(2024, 1, 2, 0)).unwrap();
        assert_eq!(window.start_millis(), 1_704_067_200_000);
        assert_eq!(window.end_millis(), 1_704_153_600_000);

        let parsed = TimeWindow::from_millis(1_704_067_200_000, 1_704_153_600_000)
            .unwrap()
            .unwrap();
        assert_eq!(parsed, window);
        assert!(TimeWindow::from_millis(2, 1).unwrap().is_err());
    }

    #[test]
    fn test_report_labels() {
        let report = sample_report();
        assert_eq!(report.bounce_rate_label(), "20.0%");
        assert_eq!(report.time_on_site(), "1h 0m");
    }

    #[test]
    fn test_report_deltas() {
        let deltas = sample_report().deltas().unwrap();
        assert_eq!(deltas.pageviews, Some(50.0));
        assert_eq!(deltas.visitors, Some(0.0));
        assert_eq!(deltas.visits, None);
        assert_eq!(deltas.bounces, Some(-50.0));
        assert_eq!(deltas.total_time, Some(100.0));

        let mut report = sample_report();
        report.previous_stats = None;
        assert!(report.deltas().is_none());
    }

    #[test]
    fn test_overview_serialization() {
        let overview = sample_report().overview();
        let json = serde_json::to_value(&overview).unwrap();

        assert_eq!(json["bounce_rate"], "20.0%");
        assert_eq!(json["time_on_site"], "1h 0m");
        assert_eq!(json["event_count"], 4);
        assert_eq!(json["period"]["start"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_digest_response_skips_empty_fields() {
        let response = DigestResponse {
            success: true,
            message: Some("sent".to_string()),
            period: None,
            error: None,
            detail: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "message": "sent"}));
    }
}
