//! External data sources for the digest.
//!
//! # Data Sources
//!
//! - [`umami`]: Umami website analytics (stats, breakdowns, sessions, events)

pub mod umami;

pub use umami::{MetricType, UmamiClient};
