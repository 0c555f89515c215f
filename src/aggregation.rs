//! Aggregation logic for turning raw provider data into a [`Report`].
//!
//! Everything here is pure: no I/O, no clocks. The report builder fetches the
//! raw pieces and hands them to [`assemble_report`].

use std::collections::HashMap;

use crate::model::{MetricPoint, Report, SummaryStats, TimeWindow, TopCity, TopEvent};

/// Number of events kept in a report.
pub const TOP_EVENTS: usize = 3;

/// Everything fetched for one window, before derivation.
#[derive(Debug, Clone, Default)]
pub struct RawReport {
    pub stats: SummaryStats,
    pub previous_stats: Option<SummaryStats>,
    pub top_pages: Vec<MetricPoint>,
    pub browsers: Vec<MetricPoint>,
    pub devices: Vec<MetricPoint>,
    pub cities: Vec<MetricPoint>,
    /// `(city, visits)` for every session record.
    pub session_cities: Vec<(Option<String>, u64)>,
    /// Event name of every event record.
    pub event_names: Vec<Option<String>>,
    pub event_count: u64,
}

/// Derive the final report for `window`.
///
/// # Arguments
///
/// * `window` - The window the raw data covers
/// * `raw` - Fetched provider data
/// * `city_limit` - How many top cities to keep
pub fn assemble_report(window: TimeWindow, raw: RawReport, city_limit: usize) -> Report {
    let bounce_rate = bounce_rate(raw.stats.bounces, raw.stats.visits);

    let top_events = top_events(raw.event_names.iter().filter_map(|n| n.as_deref()));
    let top_cities = top_cities(
        raw.session_cities
            .iter()
            .filter_map(|(city, visits)| city.as_deref().map(|c| (c, *visits))),
        city_limit,
    );

    Report {
        window,
        stats: raw.stats,
        previous_stats: raw.previous_stats,
        bounce_rate,
        top_pages: raw.top_pages,
        browsers: raw.browsers,
        devices: raw.devices,
        cities: raw.cities,
        top_cities,
        top_events,
        event_count: raw.event_count,
    }
}

/// Bounce rate in percent, rounded to one decimal; `0` when there were no visits.
pub fn bounce_rate(bounces: u64, visits: u64) -> f64 {
    if visits == 0 {
        return 0.0;
    }
    round1(bounces as f64 / visits as f64 * 100.0)
}

/// Format seconds as `"{hours}h {minutes}m"`.
pub fn format_time(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    format!("{hours}h {minutes}m")
}

/// Percentage change from `previous` to `current`, one decimal.
///
/// Returns `None` when there is no baseline.
pub fn percent_change(current: u64, previous: u64) -> Option<f64> {
    if previous == 0 {
        return None;
    }
    Some(round1(
        (current as f64 - previous as f64) / previous as f64 * 100.0,
    ))
}

/// Count events by name and keep the [`TOP_EVENTS`] most frequent.
pub fn top_events<'a, I>(names: I) -> Vec<TopEvent>
where
    I: IntoIterator<Item = &'a str>,
{
    rank(names.into_iter().map(|name| (name, 1)), TOP_EVENTS)
        .into_iter()
        .map(|(event, count)| TopEvent { event, count })
        .collect()
}

/// Sum visits per city and keep the `limit` busiest.
pub fn top_cities<'a, I>(sessions: I, limit: usize) -> Vec<TopCity>
where
    I: IntoIterator<Item = (&'a str, u64)>,
{
    rank(sessions, limit)
        .into_iter()
        .map(|(city, visits)| TopCity { city, visits })
        .collect()
}

/// Group by label, sum the weights, sort descending and take `limit`.
///
/// Sums saturate at `u64::MAX`.
///
/// Ties keep the order in which labels were first seen.
fn rank<'a, I>(items: I, limit: usize) -> Vec<(String, u64)>
where
    I: IntoIterator<Item = (&'a str, u64)>,
{
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    let mut totals: Vec<(String, u64)> = Vec::new();

    for (label, weight) in items {
        if label.is_empty() {
            continue;
        }
        match index.get(label) {
            Some(&i) => totals[i].1 = totals[i].1.saturating_add(weight),
            None => {
                index.insert(label, totals.len());
                totals.push((label.to_string(), weight));
            }
        }
    }

    // sort_by is stable
    totals.sort_by(|a, b| b.1.cmp(&a.1));
    totals.truncate(limit);
    totals
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
