//! Delivery of finished reports.
//!
//! A [`Notifier`] renders a [`Report`] and hands it to a message provider.
//! [`ResendNotifier`] is the production implementation.

pub mod resend;
pub mod template;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{DeliveryResult, Report};

pub use resend::ResendNotifier;

/// Formats and transmits a report.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Render `report` and send it.
    ///
    /// `period_start` is the date shown in the subject line and header.
    /// Errors are returned to the caller; nothing is retried.
    async fn send(&self, report: &Report, period_start: DateTime<Utc>) -> Result<DeliveryResult>;
}

/// Subject line for the digest of the period starting at `period_start`.
pub fn subject_for(period_start: DateTime<Utc>) -> String {
    format!("Daily Analytics Report: {}", format_date(period_start))
}

/// `M/D/YYYY`, the date format used in the subject and email header.
pub fn format_date(date: DateTime<Utc>) -> String {
    date.format("%-m/%-d/%Y").to_string()
}
