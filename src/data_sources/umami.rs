//! Umami analytics API client.
//!
//! Umami exposes per-website statistics over a small REST API. This client
//! covers the endpoints the digest needs:
//!
//! - `/stats`: headline numbers for a window
//! - `/metrics`: ranked breakdowns (`url`, `browser`, `device`, `city`)
//! - `/sessions`: session records with their city and visit count
//! - `/events`: custom event records
//!
//! # API Reference
//!
//! See: <https://umami.is/docs/api>
//!
//! # Validation
//!
//! Every response must carry a JSON content type and a 2xx status, and its
//! body must decode into the typed shapes below. Anything else is a
//! [`FetchError`]; there is no lenient fallback.

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{FetchError, excerpt};
use crate::model::{MetricPoint, SummaryStats, TimeWindow, UNKNOWN_LABEL};

/// Header carrying the Umami API key.
const API_KEY_HEADER: &str = "x-umami-api-key";

/// Page size requested from the list endpoints.
pub const LIST_PAGE_SIZE: u32 = 100;

/// Dimensions supported by the `/metrics` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Url,
    Browser,
    Device,
    City,
}

impl MetricType {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricType::Url => "url",
            MetricType::Browser => "browser",
            MetricType::Device => "device",
            MetricType::City => "city",
        }
    }
}

/// Client for one Umami website.
#[derive(Clone)]
pub struct UmamiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl UmamiClient {
    /// Create a client from the application configuration.
    ///
    /// The per-request timeout comes from `config.fetch_timeout`.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.website_base_url(),
            api_key: config.umami_api_key.clone(),
        })
    }

    /// Create a client with a custom website base URL (for testing).
    pub fn with_base_url(base_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Get the headline stats for a window.
    pub async fn get_stats(&self, window: &TimeWindow) -> Result<SummaryStats, FetchError> {
        let url = format!("{}/stats?{}", self.base_url, window_params(window));
        let stats: UmamiStats = self.fetch_json(&url).await?;
        Ok(stats.into_summary())
    }

    /// Get a ranked breakdown for one dimension.
    ///
    /// # Arguments
    ///
    /// * `metric` - Dimension to break down by
    /// * `window` - Time window
    /// * `limit` - Maximum number of rows
    pub async fn get_metrics(
        &self,
        metric: MetricType,
        window: &TimeWindow,
        limit: u32,
    ) -> Result<Vec<MetricPoint>, FetchError> {
        let url = format!(
            "{}/metrics?type={}&{}&limit={}",
            self.base_url,
            metric.as_str(),
            window_params(window),
            limit
        );
        let rows: Vec<UmamiMetric> = self.fetch_json(&url).await?;
        Ok(rows.into_iter().map(MetricPoint::from).collect())
    }

    /// Get the first page of session records.
    pub async fn get_sessions(&self, window: &TimeWindow) -> Result<UmamiSessions, FetchError> {
        let url = format!(
            "{}/sessions?{}&pageSize={}",
            self.base_url,
            window_params(window),
            LIST_PAGE_SIZE
        );
        self.fetch_json(&url).await
    }

    /// Get the first page of event records.
    ///
    /// # Arguments
    ///
    /// * `window` - Time window
    /// * `query` - Optional event-name search; all events when `None`
    pub async fn get_events(
        &self,
        window: &TimeWindow,
        query: Option<&str>,
    ) -> Result<UmamiEvents, FetchError> {
        let mut url = format!(
            "{}/events?{}&pageSize={}",
            self.base_url,
            window_params(window),
            LIST_PAGE_SIZE
        );

        if let Some(query) = query {
            url.push_str(&format!("&query={}", urlencoding::encode(query)));
        }

        self.fetch_json(&url).await
    }

    /// GET `url`, validate the response and decode the body as `T`.
    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        debug!(url = %url, "Fetching Umami endpoint");

        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .text()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        if !content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/json"))
        {
            warn!(
                url = %url,
                content_type = ?content_type,
                status = status.as_u16(),
                "Unexpected response type from Umami"
            );
            return Err(FetchError::ContentType {
                url: url.to_string(),
                content_type,
                body: excerpt(&body),
            });
        }

        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "Umami returned an error status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: excerpt(&body),
            });
        }

        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

fn window_params(window: &TimeWindow) -> String {
    format!(
        "startAt={}&endAt={}",
        window.start_millis(),
        window.end_millis()
    )
}

// ============================================================================
// Response types
// ============================================================================

/// A single `{ "value": n }` stat.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UmamiValue {
    pub value: u64,
}

/// Response from the stats endpoint.
///
/// Extra fields (such as `prev` or `comparison`) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct UmamiStats {
    pub pageviews: UmamiValue,
    pub visitors: UmamiValue,
    pub visits: UmamiValue,
    pub bounces: UmamiValue,
    pub totaltime: UmamiValue,
}

impl UmamiStats {
    /// Convert to [`SummaryStats`], clamping bounces to visits.
    pub fn into_summary(self) -> SummaryStats {
        let visits = self.visits.value;
        let mut bounces = self.bounces.value;
        if bounces > visits {
            warn!(bounces, visits, "Umami reported more bounces than visits; clamping");
            bounces = visits;
        }

        SummaryStats {
            pageviews: self.pageviews.value,
            visitors: self.visitors.value,
            visits,
            bounces,
            total_time_seconds: self.totaltime.value,
        }
    }
}

/// One row of a metrics breakdown.
#[derive(Debug, Clone, Deserialize)]
pub struct UmamiMetric {
    /// Label; `null` for unknown values.
    pub x: Option<String>,
    /// Count.
    pub y: u64,
}

impl From<UmamiMetric> for MetricPoint {
    fn from(metric: UmamiMetric) -> Self {
        MetricPoint {
            label: metric
                .x
                .filter(|x| !x.is_empty())
                .unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
            count: metric.y,
        }
    }
}

/// Response from the sessions endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UmamiSessions {
    pub data: Vec<UmamiSession>,
    #[serde(default)]
    pub count: Option<u64>,
}

/// A single session record.
#[derive(Debug, Clone, Deserialize)]
pub struct UmamiSession {
    #[serde(default)]
    pub city: Option<String>,
    pub visits: u64,
}

/// Response from the events endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UmamiEvents {
    pub data: Vec<UmamiEvent>,
    /// Total matching events across all pages.
    #[serde(default)]
    pub count: Option<u64>,
}

impl UmamiEvents {
    /// Total number of matching events.
    ///
    /// Falls back to the number of records on this page when the provider
    /// omits `count`.
    pub fn total(&self) -> u64 {
        self.count.unwrap_or(self.data.len() as u64)
    }
}

/// A single event record.
#[derive(Debug, Clone, Deserialize)]
pub struct UmamiEvent {
    #[serde(default, rename = "eventName")]
    pub event_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stats_decoding_ignores_extra_fields() {
        let stats: UmamiStats = serde_json::from_value(json!({
            "pageviews": {"value": 100, "prev": 80},
            "visitors": {"value": 40, "prev": 30},
            "visits": {"value": 50, "prev": 45},
            "bounces": {"value": 10, "prev": 12},
            "totaltime": {"value": 3600, "prev": 3000}
        }))
        .unwrap();

        let summary = stats.into_summary();
        assert_eq!(summary.pageviews, 100);
        assert_eq!(summary.visits, 50);
        assert_eq!(summary.total_time_seconds, 3600);
    }

    #[test]
    fn test_stats_decoding_rejects_missing_field() {
        let result = serde_json::from_value::<UmamiStats>(json!({
            "pageviews": {"value": 100},
            "visitors": {"value": 40},
            "visits": {"value": 50},
            "bounces": {"value": 10}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_stats_decoding_rejects_negative_values() {
        let result = serde_json::from_value::<UmamiStats>(json!({
            "pageviews": {"value": -1},
            "visitors": {"value": 40},
            "visits": {"value": 50},
            "bounces": {"value": 10},
            "totaltime": {"value": 0}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_bounces_clamped_to_visits() {
        let stats = UmamiStats {
            pageviews: UmamiValue { value: 10 },
            visitors: UmamiValue { value: 5 },
            visits: UmamiValue { value: 4 },
            bounces: UmamiValue { value: 9 },
            totaltime: UmamiValue { value: 0 },
        };

        assert_eq!(stats.into_summary().bounces, 4);
    }

    #[test]
    fn test_metric_unknown_label() {
        let rows: Vec<UmamiMetric> = serde_json::from_value(json!([
            {"x": "/", "y": 12},
            {"x": null, "y": 3},
            {"x": "", "y": 1}
        ]))
        .unwrap();

        let points: Vec<MetricPoint> = rows.into_iter().map(MetricPoint::from).collect();
        assert_eq!(points[0].label, "/");
        assert_eq!(points[1].label, UNKNOWN_LABEL);
        assert_eq!(points[2].label, UNKNOWN_LABEL);
    }

    #[test]
    fn test_events_total_falls_back_to_page_length() {
        let events: UmamiEvents = serde_json::from_value(json!({
            "data": [{"eventName": "due-date-added"}, {"eventName": null}]
        }))
        .unwrap();
        assert_eq!(events.total(), 2);

        let events: UmamiEvents = serde_json::from_value(json!({
            "data": [{"eventName": "due-date-added"}],
            "count": 57
        }))
        .unwrap();
        assert_eq!(events.total(), 57);
    }

    #[test]
    fn test_sessions_require_data() {
        assert!(serde_json::from_value::<UmamiSessions>(json!({"count": 3})).is_err());

        let sessions: UmamiSessions = serde_json::from_value(json!({
            "data": [{"city": "NYC", "visits": 5, "browser": "chrome"}, {"visits": 1}]
        }))
        .unwrap();
        assert_eq!(sessions.data.len(), 2);
        assert_eq!(sessions.data[1].city, None);
    }

    #[test]
    fn test_metric_type_names() {
        assert_eq!(MetricType::Url.as_str(), "url");
        assert_eq!(MetricType::City.as_str(), "city");
    }
}
