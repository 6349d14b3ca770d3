// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the directory intake service.
//!
//! Defaults match the limits the public directory has always enforced:
//! 10 admissions per client per hour, 10 second upstream timeout.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

/// Configuration for the intake service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// CAPTCHA verification configuration
    #[serde(default)]
    pub captcha: CaptchaConfig,

    /// External store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Contact mail relay configuration
    #[serde(default)]
    pub mailer: MailerConfig,

    /// Bound applied to every external call, in milliseconds (default: 10000)
    #[serde(default = "default_upstream_timeout_ms")]
    pub upstream_timeout_ms: u64,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Fixed-window rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Admissions per key per window (default: 10)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds (default: 3600)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Probability that an admission also sweeps expired entries (default: 0.01)
    #[serde(default = "default_sweep_probability")]
    pub sweep_probability: f64,
}

/// CAPTCHA verifier configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct CaptchaConfig {
    /// Siteverify endpoint (default: https://hcaptcha.com/siteverify)
    #[serde(default = "default_captcha_verify_url")]
    pub verify_url: String,

    /// Server-held secret. Requests needing CAPTCHA fail with a 500 when unset.
    #[serde(default)]
    pub secret: Option<String>,
}

/// External store configuration. Without a URL the in-memory store is used.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub service_key: Option<String>,
}

/// Mail relay configuration. Without an API key the in-memory outbox is used.
#[derive(Clone, Serialize, Deserialize)]
pub struct MailerConfig {
    #[serde(default = "default_mailer_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_mailer_from")]
    pub from: String,

    #[serde(default = "default_mailer_to")]
    pub to: Vec<String>,

    /// Prefix used in contact mail subjects
    #[serde(default = "default_mailer_brand")]
    pub brand: String,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_requests() -> u32 {
    10
}

fn default_window_secs() -> u64 {
    3600
}

fn default_sweep_probability() -> f64 {
    0.01
}

fn default_captcha_verify_url() -> String {
    "https://hcaptcha.com/siteverify".to_string()
}

fn default_mailer_api_url() -> String {
    "https://api.resend.com/emails".to_string()
}

fn default_mailer_from() -> String {
    "Product Directory <noreply@localhost>".to_string()
}

fn default_mailer_to() -> Vec<String> {
    vec!["admin@localhost".to_string()]
}

fn default_mailer_brand() -> String {
    "Directory".to_string()
}

fn default_upstream_timeout_ms() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            rate_limit: RateLimitConfig::default(),
            captcha: CaptchaConfig::default(),
            store: StoreConfig::default(),
            mailer: MailerConfig::default(),
            upstream_timeout_ms: default_upstream_timeout_ms(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            sweep_probability: default_sweep_probability(),
        }
    }
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            verify_url: default_captcha_verify_url(),
            secret: None,
        }
    }
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            api_url: default_mailer_api_url(),
            api_key: None,
            from: default_mailer_from(),
            to: default_mailer_to(),
            brand: default_mailer_brand(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

// Debug output redacts secrets.
impl std::fmt::Debug for CaptchaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptchaConfig")
            .field("verify_url", &self.verify_url)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url)
            .field("service_key", &self.service_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl std::fmt::Debug for MailerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailerConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("from", &self.from)
            .field("to", &self.to)
            .field("brand", &self.brand)
            .finish()
    }
}

impl RateLimitConfig {
    /// Get the rate window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Config {
    /// Get the bound applied to external calls
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    /// Load configuration from a `.env` file (if present) and the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        let non_empty = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(addr) = non_empty("BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(max) = parse_positive(&lookup, "RATE_LIMIT_MAX")? {
            config.rate_limit.max_requests = max;
        }
        if let Some(secs) = parse_positive(&lookup, "RATE_LIMIT_WINDOW_SECS")? {
            config.rate_limit.window_secs = secs;
        }
        if let Some(ms) = parse_var(&lookup, "UPSTREAM_TIMEOUT_MS")? {
            config.upstream_timeout_ms = ms;
        }
        if let Some(enabled) = parse_var(&lookup, "METRICS_ENABLED")? {
            config.metrics.enabled = enabled;
        }

        config.captcha.secret = non_empty("HCAPTCHA_SECRET");
        if let Some(url) = non_empty("HCAPTCHA_VERIFY_URL") {
            config.captcha.verify_url = url;
        }

        config.store.url = non_empty("SUPABASE_URL");
        config.store.service_key = non_empty("SUPABASE_SERVICE_ROLE_KEY");

        config.mailer.api_key = non_empty("RESEND_API_KEY");
        if let Some(from) = non_empty("CONTACT_FROM") {
            config.mailer.from = from;
        }
        if let Some(to) = non_empty("CONTACT_TO") {
            config.mailer.to = to
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        _ => Ok(None),
    }
}

/// Like [`parse_var`], but zero is rejected.
fn parse_positive<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Default + PartialEq + ToString,
{
    match parse_var::<F, T>(lookup, var)? {
        Some(value) if value == T::default() => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
        }),
        other => Ok(other),
    }
}
