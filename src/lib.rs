//! Umami Digest - a daily website-analytics summary delivered by email.
//!
//! # Overview
//!
//! Once per trigger, Umami Digest pulls the last 24 hours of metrics for one
//! website from the Umami API, derives a few statistics (bounce rate, top
//! cities, top events, change against the previous 24 hours) and emails the
//! result to a single operator.
//!
//! Nothing is stored between invocations. Each trigger builds a fresh report
//! and discards it after the send completes or fails.
//!
//! # Modules
//!
//! - [`config`]: Environment configuration, validated at startup
//! - [`error`]: Error taxonomy
//! - [`model`]: Time windows, stats, reports and HTTP envelopes
//! - [`aggregation`]: Pure derivations (rates, top-N lists, deltas)
//! - [`data_sources`]: Umami API client
//! - [`report`]: Concurrent fetch and report assembly
//! - [`notifier`]: Email rendering and delivery
//! - [`api`]: HTTP API handlers

pub mod aggregation;
pub mod api;
pub mod config;
pub mod data_sources;
pub mod error;
pub mod model;
pub mod notifier;
pub mod report;
