//! Process configuration.
//!
//! All settings come from environment variables and are validated once at
//! startup. The resulting [`Config`] is immutable and handed to the client,
//! report builder and notifier explicitly.

use std::env;
use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigError;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default per-request timeout for outbound calls, in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Default number of top cities in a report.
pub const DEFAULT_TOP_CITIES: usize = 5;

/// Upper bound for the top-city limit; matches the session page size budget.
pub const MAX_TOP_CITIES: usize = 10;

/// Default schedule handed to the external scheduler.
pub const DEFAULT_CRON_SCHEDULE: &str = "0 9 * * *";

/// Default Resend API base URL.
pub const DEFAULT_RESEND_API_URL: &str = "https://api.resend.com";

/// Colour scheme of the rendered email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmailTheme {
    #[default]
    Light,
    Dark,
}

impl EmailTheme {
    pub fn is_dark(self) -> bool {
        matches!(self, EmailTheme::Dark)
    }
}

/// Validated application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Umami API base URL, without the `/v1/websites/...` suffix.
    pub umami_api_url: String,
    pub umami_api_key: String,
    pub website_id: String,
    /// Custom event counted into `event_count`; all events when `None`.
    pub event_query: Option<String>,

    pub resend_api_url: String,
    pub resend_api_key: String,
    pub recipient_email: String,
    pub from_email: String,
    pub email_theme: EmailTheme,

    /// Informational only; consumed by the external scheduler.
    pub cron_schedule: String,

    pub port: u16,
    pub fetch_timeout: Duration,
    pub top_cities: usize,
    pub compare_previous: bool,
    /// Expose error detail in HTTP responses.
    pub development: bool,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &'static str| -> Option<String> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing { name });

        let umami_api_url = parse_base_url("UMAMI_API_URL", &require("UMAMI_API_URL")?)?;
        let umami_api_key = require("UMAMI_API_KEY")?;
        let website_id = require("WEBSITE_ID")?;
        let resend_api_key = require("RESEND_API_KEY")?;
        let recipient_email = parse_email("RECIPIENT_EMAIL", require("RECIPIENT_EMAIL")?)?;
        let from_email = parse_email("FROM_EMAIL", require("FROM_EMAIL")?)?;

        let resend_api_url = match get("RESEND_API_URL") {
            Some(url) => parse_base_url("RESEND_API_URL", &url)?,
            None => DEFAULT_RESEND_API_URL.to_string(),
        };

        let port = parse_or("DIGEST_PORT", get("DIGEST_PORT"), DEFAULT_PORT)?;

        let timeout_secs = parse_or(
            "DIGEST_FETCH_TIMEOUT_SECS",
            get("DIGEST_FETCH_TIMEOUT_SECS"),
            DEFAULT_FETCH_TIMEOUT_SECS,
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "DIGEST_FETCH_TIMEOUT_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }

        let top_cities = parse_or("DIGEST_TOP_CITIES", get("DIGEST_TOP_CITIES"), DEFAULT_TOP_CITIES)?;
        if !(1..=MAX_TOP_CITIES).contains(&top_cities) {
            return Err(ConfigError::Invalid {
                name: "DIGEST_TOP_CITIES",
                reason: format!("must be between 1 and {MAX_TOP_CITIES}"),
            });
        }

        let compare_previous = match get("DIGEST_COMPARE_PREVIOUS") {
            Some(raw) => parse_bool("DIGEST_COMPARE_PREVIOUS", &raw)?,
            None => true,
        };

        let email_theme = match get("EMAIL_THEME").as_deref() {
            None | Some("light") => EmailTheme::Light,
            Some("dark") => EmailTheme::Dark,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "EMAIL_THEME",
                    reason: format!("expected 'light' or 'dark', got '{other}'"),
                });
            }
        };

        let development = get("APP_ENV").is_some_and(|v| v.eq_ignore_ascii_case("development"));

        Ok(Self {
            umami_api_url,
            umami_api_key,
            website_id,
            event_query: get("UMAMI_EVENT_QUERY"),
            resend_api_url,
            resend_api_key,
            recipient_email,
            from_email,
            email_theme,
            cron_schedule: get("CRON_SCHEDULE").unwrap_or_else(|| DEFAULT_CRON_SCHEDULE.to_string()),
            port,
            fetch_timeout: Duration::from_secs(timeout_secs),
            top_cities,
            compare_previous,
            development,
        })
    }

    /// Base URL of all website-scoped Umami endpoints.
    pub fn website_base_url(&self) -> String {
        format!(
            "{}/v1/websites/{}",
            self.umami_api_url,
            urlencoding::encode(&self.website_id)
        )
    }
}

fn parse_base_url(name: &'static str, raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            name,
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn parse_email(name: &'static str, raw: String) -> Result<String, ConfigError> {
    let valid = match raw.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !raw.chars().any(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    };
    if valid {
        Ok(raw)
    } else {
        Err(ConfigError::Invalid {
            name,
            reason: format!("'{raw}' is not an email address"),
        })
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_bool(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            reason: format!("expected a boolean, got '{raw}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_vars() -> HashMap<&'static str, String> {
        HashMap::from([
            ("UMAMI_API_URL", "https://api.umami.is/".to_string()),
            ("UMAMI_API_KEY", "umami-key".to_string()),
            ("WEBSITE_ID", "site-123".to_string()),
            ("RESEND_API_KEY", "re_key".to_string()),
            ("RECIPIENT_EMAIL", "owner@example.com".to_string()),
            ("FROM_EMAIL", "digest@example.com".to_string()),
        ])
    }

    fn load(vars: &HashMap<&'static str, String>) -> Result<Config, ConfigError> {
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_applied() {
        let config = load(&base_vars()).unwrap();

        assert_eq!(config.umami_api_url, "https://api.umami.is");
        assert_eq!(config.website_base_url(), "https://api.umami.is/v1/websites/site-123");
        assert_eq!(config.resend_api_url, DEFAULT_RESEND_API_URL);
        assert_eq!(config.cron_schedule, DEFAULT_CRON_SCHEDULE);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.top_cities, DEFAULT_TOP_CITIES);
        assert_eq!(config.email_theme, EmailTheme::Light);
        assert!(config.compare_previous);
        assert!(!config.development);
        assert!(config.event_query.is_none());
    }

    #[test]
    fn test_missing_recipient_fails() {
        let mut vars = base_vars();
        vars.remove("RECIPIENT_EMAIL");

        let err = load(&vars).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Missing {
                name: "RECIPIENT_EMAIL"
            }
        ));
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let mut vars = base_vars();
        vars.insert("UMAMI_API_KEY", "   ".to_string());

        let err = load(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { name: "UMAMI_API_KEY" }));
    }

    #[test]
    fn test_invalid_email_rejected() {
        let mut vars = base_vars();
        vars.insert("FROM_EMAIL", "not-an-email".to_string());

        let err = load(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "FROM_EMAIL", .. }));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let mut vars = base_vars();
        vars.insert("UMAMI_API_URL", "ftp://umami.local".to_string());

        let err = load(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "UMAMI_API_URL", .. }));
    }

    #[test]
    fn test_optional_overrides() {
        let mut vars = base_vars();
        vars.insert("DIGEST_PORT", "8080".to_string());
        vars.insert("DIGEST_FETCH_TIMEOUT_SECS", "3".to_string());
        vars.insert("DIGEST_TOP_CITIES", "3".to_string());
        vars.insert("DIGEST_COMPARE_PREVIOUS", "false".to_string());
        vars.insert("EMAIL_THEME", "dark".to_string());
        vars.insert("APP_ENV", "Development".to_string());
        vars.insert("UMAMI_EVENT_QUERY", "due-date-added".to_string());

        let config = load(&vars).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.fetch_timeout, Duration::from_secs(3));
        assert_eq!(config.top_cities, 3);
        assert!(!config.compare_previous);
        assert!(config.email_theme.is_dark());
        assert!(config.development);
        assert_eq!(config.event_query.as_deref(), Some("due-date-added"));
    }

    #[test]
    fn test_top_cities_out_of_range() {
        let mut vars = base_vars();
        vars.insert("DIGEST_TOP_CITIES", "0".to_string());
        assert!(load(&vars).is_err());

        vars.insert("DIGEST_TOP_CITIES", "11".to_string());
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut vars = base_vars();
        vars.insert("DIGEST_FETCH_TIMEOUT_SECS", "0".to_string());

        let err = load(&vars).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "DIGEST_FETCH_TIMEOUT_SECS",
                ..
            }
        ));
    }
}
