//! Error types for Umami Digest.
//!
//! Every failure in a single build-and-send cycle ends up as an [`AppError`].
//! Handlers log the full error server-side and return a generic envelope to
//! the caller.

use thiserror::Error;

/// Maximum number of upstream body characters kept on a fetch error.
pub const BODY_EXCERPT_CHARS: usize = 200;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, AppError>;

/// Missing or invalid process configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is absent or empty.
    #[error("missing required environment variable: {name}")]
    Missing {
        /// Variable name
        name: &'static str,
    },

    /// A variable is present but does not parse or validate.
    #[error("invalid value for {name}: {reason}")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

/// Failure fetching or decoding a response from the analytics provider.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or timed out.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The provider answered with something other than JSON.
    #[error("unexpected response type {content_type:?} from {url}")]
    ContentType {
        url: String,
        content_type: Option<String>,
        body: String,
    },

    /// The provider answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16, body: String },

    /// The body was JSON but not of the expected shape.
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    /// The upstream response body excerpt, when one was captured.
    pub fn body(&self) -> Option<&str> {
        match self {
            FetchError::ContentType { body, .. } | FetchError::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Failure rendering or handing a message to the delivery provider.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The provider could not be reached.
    #[error("message provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider refused the message.
    #[error("message provider rejected the request with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The email body could not be rendered.
    #[error("failed to render email: {0}")]
    Render(#[from] minijinja::Error),
}

/// Top-level error for one report-build-and-send cycle.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("upstream fetch error: {0}")]
    UpstreamFetch(#[from] FetchError),

    #[error("delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("unknown error: {0}")]
    Unknown(#[from] anyhow::Error),
}

impl AppError {
    /// Short machine-friendly name of the error class, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Configuration(_) => "configuration",
            AppError::UpstreamFetch(_) => "upstream_fetch",
            AppError::Delivery(_) => "delivery",
            AppError::Unknown(_) => "unknown",
        }
    }

    /// Upstream response body, when the error came from the analytics provider.
    pub fn upstream_body(&self) -> Option<&str> {
        match self {
            AppError::UpstreamFetch(e) => e.body(),
            _ => None,
        }
    }
}

/// Keep at most [`BODY_EXCERPT_CHARS`] characters of an upstream body.
pub fn excerpt(body: &str) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(BODY_EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
