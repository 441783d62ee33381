use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{MailError, Result};
use crate::limiter::Limit;

pub const DEFAULT_CHARSET: &str = "UTF-8";

/// 20 per hour, 100 per day
pub fn default_limits() -> Vec<Limit> {
    vec![Limit::new(3600, 20), Limit::new(86400, 100)]
}

/// Mail dispatch configuration, read from the environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub redis_url: String,
    pub ses_region: String,
    pub ses_sender: String,
    pub templates_dir: PathBuf,
    pub charset: String,
    pub limits: Vec<Limit>,
}

impl MailConfig {
    /// Read configuration from the environment.
    ///
    /// `SES_SENDER` and `SES_REGION` are required. `REDIS_URL`,
    /// `TEMPLATES_DIR`, `MAIL_CHARSET` and `MAIL_LIMITS` fall back to
    /// defaults. `MAIL_LIMITS` is a comma-separated list of
    /// `window_seconds:max_count` pairs, e.g. `3600:20,86400:100`.
    pub fn from_env() -> Result<Self> {
        let ses_sender = std::env::var("SES_SENDER").map_err(|_| {
            MailError::Config("SES_SENDER must be set in the environment".to_string())
        })?;
        let ses_region = std::env::var("SES_REGION").map_err(|_| {
            MailError::Config("SES_REGION must be set in the environment".to_string())
        })?;

        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let templates_dir = std::env::var("TEMPLATES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("templates"));
        let charset =
            std::env::var("MAIL_CHARSET").unwrap_or_else(|_| DEFAULT_CHARSET.to_string());

        let limits = match std::env::var("MAIL_LIMITS") {
            Ok(spec) => parse_limits(&spec)?,
            Err(_) => default_limits(),
        };

        Ok(Self {
            redis_url,
            ses_region,
            ses_sender,
            templates_dir,
            charset,
            limits,
        })
    }
}

/// Parse a `window_seconds:max_count` pair list
pub fn parse_limits(spec: &str) -> Result<Vec<Limit>> {
    let mut limits = Vec::new();
    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (window, max) = part.split_once(':').ok_or_else(|| {
            MailError::Config(format!("Malformed limit entry '{}', expected secs:count", part))
        })?;
        let window_seconds: u64 = window.trim().parse().map_err(|_| {
            MailError::Config(format!("Invalid window seconds in limit entry '{}'", part))
        })?;
        let max_count: u64 = max.trim().parse().map_err(|_| {
            MailError::Config(format!("Invalid max count in limit entry '{}'", part))
        })?;
        limits.push(Limit::new(window_seconds, max_count));
    }

    if limits.is_empty() {
        return Err(MailError::Config(
            "Limit list must contain at least one entry".to_string(),
        ));
    }
    Ok(limits)
}
