//! HTML rendering of the daily digest email.
//!
//! Rust prepares display-ready values (formatted numbers, deltas, colours);
//! the template only lays them out. Output is auto-escaped because the
//! template name ends in `.html`.

use chrono::{DateTime, Utc};
use minijinja::Environment;
use serde::Serialize;

use crate::config::EmailTheme;
use crate::model::{Report, StatDeltas, TopEvent};

use super::format_date;

/// Maximum rows in the top-locations table.
pub const MAX_LOCATION_ROWS: usize = 5;

const TEMPLATE_NAME: &str = "daily.html";

const DAILY_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{{ title }}</title></head>
<body style="background-color:{{ palette.body_bg }};margin:0;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif">
<div style="width:100%;max-width:600px;margin:0 auto;background-color:{{ palette.container_bg }};padding:20px 0">
  <p style="font-size:24px;font-weight:bold;text-align:center;margin:0;padding:20px 0 8px;color:{{ palette.text }}">{{ title }}</p>
  <p style="font-size:14px;text-align:center;color:{{ palette.muted }};margin:0;padding-bottom:24px">{{ date }}</p>
  <table style="width:100%;border-spacing:8px;border-collapse:separate;padding:0 8px;margin-bottom:16px">
    <tbody>
    {% for row in cards | batch(2) %}
      <tr>
      {% for card in row %}
        <td style="background-color:{{ palette.card_bg }};border-radius:8px;padding:12px;text-align:center;width:50%">
          <p style="font-size:12px;color:{{ palette.muted }};margin:0 0 4px 0;font-weight:500;text-transform:uppercase">{{ card.title }}</p>
          <p style="font-size:18px;font-weight:bold;color:{{ palette.text }};margin:0">{{ card.value }}</p>
          {% if card.delta %}<p style="font-size:12px;color:{{ palette.muted }};margin:4px 0 0 0">{{ card.delta }} vs previous period</p>{% endif %}
        </td>
      {% endfor %}
      </tr>
    {% endfor %}
    </tbody>
  </table>
  <p style="font-size:16px;font-weight:bold;color:{{ palette.text }};padding:24px 16px 12px;margin:0">Top Locations</p>
  {% if locations %}
  <table style="width:calc(100% - 32px);margin:0 16px 16px;background-color:{{ palette.card_bg }};border-radius:8px;border-spacing:0;border-collapse:separate">
    <tbody>
    {% for location in locations %}
      <tr{% if not loop.last %} style="border-bottom:1px solid {{ palette.border }}"{% endif %}>
        <td style="font-size:13px;color:{{ palette.text }};padding:12px 16px">{{ location.name }}</td>
        <td style="font-size:13px;padding:8px 16px;text-align:right"><span style="background-color:{{ palette.badge_bg }};color:#000000;border-radius:6px;padding:4px 8px;display:inline-block">{{ location.visits }}</span></td>
      </tr>
    {% endfor %}
    </tbody>
  </table>
  {% else %}
  <p style="font-size:13px;color:{{ palette.muted }};padding:0 16px;margin:0">No location data for this period.</p>
  {% endif %}
  {% if events %}
  <p style="font-size:16px;font-weight:bold;color:{{ palette.text }};padding:24px 16px 12px;margin:0">Popular Events</p>
  <table style="width:calc(100% - 32px);margin:0 16px 16px;background-color:{{ palette.card_bg }};border-radius:8px;border-spacing:0;border-collapse:separate">
    <tbody>
    {% for event in events %}
      <tr>
        <td style="font-size:13px;color:{{ palette.text }};padding:12px 16px">{{ event.event }}</td>
        <td style="font-size:13px;color:{{ palette.text }};padding:8px 16px;text-align:right">{{ event.count }}</td>
      </tr>
    {% endfor %}
    </tbody>
  </table>
  {% endif %}
</div>
</body>
</html>
"#;

#[derive(Debug, Serialize)]
struct Palette {
    body_bg: &'static str,
    container_bg: &'static str,
    text: &'static str,
    muted: &'static str,
    card_bg: &'static str,
    border: &'static str,
    badge_bg: &'static str,
}

impl Palette {
    fn for_theme(theme: EmailTheme) -> Self {
        if theme.is_dark() {
            Self {
                body_bg: "#0f172a",
                container_bg: "#1e293b",
                text: "#ffffff",
                muted: "#94a3b8",
                card_bg: "rgba(255, 255, 255, 0.1)",
                border: "rgba(255, 255, 255, 0.1)",
                badge_bg: "#ffffff",
            }
        } else {
            Self {
                body_bg: "#ffffff",
                container_bg: "#f4f4f4",
                text: "#000000",
                muted: "#666666",
                card_bg: "rgba(0, 0, 0, 0.05)",
                border: "rgba(0, 0, 0, 0.1)",
                badge_bg: "#e0e0e0",
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct StatCard {
    title: &'static str,
    value: String,
    delta: Option<String>,
}

#[derive(Debug, Serialize)]
struct LocationRow {
    name: String,
    visits: String,
}

#[derive(Debug, Serialize)]
struct EmailContext<'a> {
    title: &'static str,
    date: String,
    palette: Palette,
    cards: Vec<StatCard>,
    locations: Vec<LocationRow>,
    events: &'a [TopEvent],
}

/// Render the digest email body.
pub fn render_daily(
    report: &Report,
    period_start: DateTime<Utc>,
    theme: EmailTheme,
) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template(TEMPLATE_NAME, DAILY_TEMPLATE)?;

    let ctx = EmailContext {
        title: "Umami Digest",
        date: format_date(period_start),
        palette: Palette::for_theme(theme),
        cards: stat_cards(report),
        locations: location_rows(report),
        events: &report.top_events,
    };

    env.get_template(TEMPLATE_NAME)?.render(ctx)
}

fn stat_cards(report: &Report) -> Vec<StatCard> {
    let deltas = report.deltas();
    let delta = |pick: fn(&StatDeltas) -> Option<f64>| {
        deltas.as_ref().and_then(pick).map(format_delta)
    };

    vec![
        StatCard {
            title: "Views",
            value: group_thousands(report.stats.pageviews),
            delta: delta(|d| d.pageviews),
        },
        StatCard {
            title: "Visitors",
            value: group_thousands(report.stats.visitors),
            delta: delta(|d| d.visitors),
        },
        StatCard {
            title: "Time",
            value: report.time_on_site(),
            delta: delta(|d| d.total_time),
        },
        StatCard {
            title: "Events",
            value: group_thousands(report.event_count),
            delta: None,
        },
        StatCard {
            title: "Visits",
            value: group_thousands(report.stats.visits),
            delta: delta(|d| d.visits),
        },
        StatCard {
            title: "Bounce Rate",
            value: report.bounce_rate_label(),
            delta: None,
        },
    ]
}

/// Session-ranked cities, falling back to the provider's city breakdown.
fn location_rows(report: &Report) -> Vec<LocationRow> {
    if report.top_cities.is_empty() {
        report
            .cities
            .iter()
            .take(MAX_LOCATION_ROWS)
            .map(|c| LocationRow {
                name: c.label.clone(),
                visits: group_thousands(c.count),
            })
            .collect()
    } else {
        report
            .top_cities
            .iter()
            .take(MAX_LOCATION_ROWS)
            .map(|c| LocationRow {
                name: c.city.clone(),
                visits: group_thousands(c.visits),
            })
            .collect()
    }
}

fn format_delta(change: f64) -> String {
    if change > 0.0 {
        format!("+{change:.1}%")
    } else {
        format!("{change:.1}%")
    }
}

/// `1234567` -> `"1,234,567"`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
