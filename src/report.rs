//! Report builder: fetches every metric for a window and assembles a [`Report`].
//!
//! # Usage
//!
//! ```ignore
//! let builder = ReportBuilder::new(&config)?;
//! let report = builder.build_report(TimeWindow::rolling_day(Utc::now())).await?;
//! ```

use tracing::{info, instrument, warn};

use crate::aggregation::{RawReport, assemble_report};
use crate::config::Config;
use crate::data_sources::{MetricType, UmamiClient};
use crate::error::{FetchError, Result};
use crate::model::{Report, SummaryStats, TimeWindow};

/// Rows requested for the top-pages breakdown.
pub const TOP_PAGES_LIMIT: u32 = 10;

/// Rows requested for browser, device and city breakdowns.
pub const BREAKDOWN_LIMIT: u32 = 5;

/// Report builder settings, taken from [`Config`].
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Custom event counted into `event_count`.
    pub event_query: Option<String>,
    /// Default number of top cities.
    pub top_cities: usize,
    /// Fetch the preceding window for deltas.
    pub compare_previous: bool,
}

impl From<&Config> for ReportOptions {
    fn from(config: &Config) -> Self {
        Self {
            event_query: config.event_query.clone(),
            top_cities: config.top_cities,
            compare_previous: config.compare_previous,
        }
    }
}

/// Builds reports from the Umami API.
#[derive(Clone)]
pub struct ReportBuilder {
    client: UmamiClient,
    options: ReportOptions,
}

impl ReportBuilder {
    /// Create a builder from the application configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let client = UmamiClient::new(config).map_err(|source| FetchError::Transport {
            url: config.website_base_url(),
            source,
        })?;
        Ok(Self::with_client(client, ReportOptions::from(config)))
    }

    /// Create a builder around an existing client.
    pub fn with_client(client: UmamiClient, options: ReportOptions) -> Self {
        Self { client, options }
    }

    pub fn options(&self) -> &ReportOptions {
        &self.options
    }

    /// Build a report for `window` with the configured top-city limit.
    pub async fn build_report(&self, window: TimeWindow) -> Result<Report> {
        self.build_report_with_city_limit(window, self.options.top_cities)
            .await
    }

    /// Build a report for `window`, keeping `city_limit` top cities.
    ///
    /// All fetches run concurrently. The first failure aborts the build and
    /// drops the remaining requests; no partial report is ever returned.
    #[instrument(skip(self), fields(start = %window.start(), end = %window.end()))]
    pub async fn build_report_with_city_limit(
        &self,
        window: TimeWindow,
        city_limit: usize,
    ) -> Result<Report> {
        let client = &self.client;
        let event_query = self.options.event_query.as_deref();

        // Fetch everything concurrently
        let (stats, previous_stats, top_pages, browsers, devices, cities, sessions, events) = tokio::try_join!(
            client.get_stats(&window),
            self.fetch_previous_stats(&window),
            client.get_metrics(MetricType::Url, &window, TOP_PAGES_LIMIT),
            client.get_metrics(MetricType::Browser, &window, BREAKDOWN_LIMIT),
            client.get_metrics(MetricType::Device, &window, BREAKDOWN_LIMIT),
            client.get_metrics(MetricType::City, &window, BREAKDOWN_LIMIT),
            client.get_sessions(&window),
            client.get_events(&window, event_query),
        )?;

        let raw = RawReport {
            stats,
            previous_stats,
            top_pages,
            browsers,
            devices,
            cities,
            event_count: events.total(),
            session_cities: sessions
                .data
                .into_iter()
                .map(|s| (s.city, s.visits))
                .collect(),
            event_names: events.data.into_iter().map(|e| e.event_name).collect(),
        };

        let report = assemble_report(window, raw, city_limit);

        info!(
            pageviews = report.stats.pageviews,
            visitors = report.stats.visitors,
            bounce_rate = report.bounce_rate,
            event_count = report.event_count,
            top_cities = report.top_cities.len(),
            compared = report.previous_stats.is_some(),
            "Report built"
        );

        Ok(report)
    }

    /// Stats for the comparison window.
    ///
    /// `None` when comparison is disabled or the preceding window cannot be
    /// represented.
    async fn fetch_previous_stats(
        &self,
        window: &TimeWindow,
    ) -> std::result::Result<Option<SummaryStats>, FetchError> {
        if !self.options.compare_previous {
            return Ok(None);
        }
        let Some(previous) = window.previous() else {
            warn!(start = %window.start(), "Comparison window out of range; skipping");
            return Ok(None);
        };
        self.client.get_stats(&previous).await.map(Some)
    }
}
