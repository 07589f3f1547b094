//! Commerce server configuration

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

use crate::gateway::stripe::DEFAULT_API_BASE;
use crate::payments::PaymentSettings;

/// Commerce server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment: development | staging | production
    pub environment: String,
    /// HTTP API port
    pub http_port: u16,
    /// Directory holding the redb database file
    pub data_dir: PathBuf,
    /// Default log level when RUST_LOG is unset
    pub log_level: String,
    /// JSON console logs
    pub log_json: bool,
    /// Rolling file log directory (file logging disabled when unset)
    pub log_dir: Option<String>,
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// Stripe REST base URL
    pub stripe_api_base: String,
    /// Payment method name that selects the gateway flow
    pub gateway_method: String,
    /// Default payment currency
    pub payment_currency: String,
    /// Deadline for each gateway call
    pub gateway_timeout: Duration,
    /// Max age of a signed webhook timestamp, seconds
    pub webhook_tolerance_secs: i64,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(v) if !v.is_empty() => v
            .parse()
            .map_err(|e| anyhow::anyhow!("{name} is invalid ({v}): {e}")),
        _ => Ok(default),
    }
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> anyhow::Result<String> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    bail!("{name} must be set in {environment} environment");
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            bail!("{name} must not be empty in {environment} environment");
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = env_or("ENVIRONMENT", "development");

        let gateway_timeout_ms: u64 = parse_env("GATEWAY_TIMEOUT_MS", 10_000)?;
        if gateway_timeout_ms == 0 {
            bail!("GATEWAY_TIMEOUT_MS must be greater than zero");
        }

        Ok(Self {
            http_port: parse_env("HTTP_PORT", 3000)?,
            data_dir: PathBuf::from(env_or("DATA_DIR", "./data")),
            log_level: env_or("LOG_LEVEL", "info"),
            log_json: parse_env("LOG_JSON", false)?,
            log_dir: std::env::var("LOG_DIR").ok().filter(|s| !s.is_empty()),
            stripe_secret_key: Self::require_secret("STRIPE_SECRET_KEY", &environment)
                .context("loading gateway credentials")?,
            stripe_webhook_secret: Self::require_secret("STRIPE_WEBHOOK_SECRET", &environment)
                .context("loading gateway credentials")?,
            stripe_api_base: env_or("STRIPE_API_BASE", DEFAULT_API_BASE),
            gateway_method: env_or("GATEWAY_METHOD", "stripe"),
            payment_currency: env_or("PAYMENT_CURRENCY", "usd").to_lowercase(),
            gateway_timeout: Duration::from_millis(gateway_timeout_ms),
            webhook_tolerance_secs: parse_env("WEBHOOK_TOLERANCE_SECS", 300)?,
            environment,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Path of the redb database file
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("commerce.redb")
    }

    pub fn payment_settings(&self) -> PaymentSettings {
        PaymentSettings {
            gateway_method: self.gateway_method.clone(),
            currency: self.payment_currency.clone(),
            gateway_timeout: self.gateway_timeout,
        }
    }
}
