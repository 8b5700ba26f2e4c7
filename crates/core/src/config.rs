//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services, so that
//! request handling never reads process-wide environment variables. Binaries call
//! [`CoreConfig::from_lookup`] with `std::env::var`; tests pass a closure over fixed values.

use crate::constants::{
    DEFAULT_APP_ORIGIN, DEFAULT_MAX_CLOCK_SKEW_MS, DEFAULT_SCAN_INTERVAL_MS, EXPIRATION_MS,
};
use crate::{CoreError, CoreResult};
use std::time::Duration;
use url::Url;

pub const ENV_APP_ORIGIN: &str = "MEDLINK_APP_ORIGIN";
pub const ENV_ENFORCE_ORIGIN: &str = "MEDLINK_ENFORCE_ORIGIN";
pub const ENV_MAX_CLOCK_SKEW_MS: &str = "MEDLINK_MAX_CLOCK_SKEW_MS";
pub const ENV_SINGLE_USE_TOKENS: &str = "MEDLINK_SINGLE_USE_TOKENS";
pub const ENV_SCAN_INTERVAL_MS: &str = "MEDLINK_SCAN_INTERVAL_MS";

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    app_origin: Url,
    enforce_origin: bool,
    max_clock_skew_ms: i64,
    single_use_tokens: bool,
    scan_interval: Duration,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if `app_origin` is not a bare http(s) origin, if the
    /// clock skew is negative or not shorter than the freshness window, or if the scan interval
    /// is zero.
    pub fn new(
        app_origin: &str,
        enforce_origin: bool,
        max_clock_skew_ms: i64,
        single_use_tokens: bool,
        scan_interval: Duration,
    ) -> CoreResult<Self> {
        let app_origin = parse_app_origin(app_origin)?;

        if !(0..EXPIRATION_MS).contains(&max_clock_skew_ms) {
            return Err(CoreError::InvalidConfig(format!(
                "max clock skew must be between 0 and {} ms, got {}",
                EXPIRATION_MS - 1,
                max_clock_skew_ms
            )));
        }

        if scan_interval.is_zero() {
            return Err(CoreError::InvalidConfig(
                "scan interval must be greater than zero".into(),
            ));
        }

        Ok(Self {
            app_origin,
            enforce_origin,
            max_clock_skew_ms,
            single_use_tokens,
            scan_interval,
        })
    }

    /// Build a configuration from a key lookup, falling back to defaults for missing keys.
    ///
    /// Empty or whitespace-only values count as missing.
    pub fn from_lookup<F>(lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let app_origin = get(ENV_APP_ORIGIN).unwrap_or_else(|| DEFAULT_APP_ORIGIN.into());
        let enforce_origin = parse_flag(ENV_ENFORCE_ORIGIN, get(ENV_ENFORCE_ORIGIN), true)?;
        let max_clock_skew_ms = get(ENV_MAX_CLOCK_SKEW_MS)
            .map(|v| parse_number::<i64>(ENV_MAX_CLOCK_SKEW_MS, &v))
            .transpose()?
            .unwrap_or(DEFAULT_MAX_CLOCK_SKEW_MS);
        let single_use_tokens =
            parse_flag(ENV_SINGLE_USE_TOKENS, get(ENV_SINGLE_USE_TOKENS), false)?;
        let scan_interval_ms = get(ENV_SCAN_INTERVAL_MS)
            .map(|v| parse_number::<u64>(ENV_SCAN_INTERVAL_MS, &v))
            .transpose()?
            .unwrap_or(DEFAULT_SCAN_INTERVAL_MS);

        Self::new(
            &app_origin,
            enforce_origin,
            max_clock_skew_ms,
            single_use_tokens,
            Duration::from_millis(scan_interval_ms),
        )
    }

    /// Origin share links are issued under, e.g. `https://care.example.org`.
    pub fn app_origin(&self) -> &Url {
        &self.app_origin
    }

    pub fn enforce_origin(&self) -> bool {
        self.enforce_origin
    }

    pub fn max_clock_skew_ms(&self) -> i64 {
        self.max_clock_skew_ms
    }

    pub fn single_use_tokens(&self) -> bool {
        self.single_use_tokens
    }

    pub fn scan_interval(&self) -> Duration {
        self.scan_interval
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            app_origin: Url::parse(DEFAULT_APP_ORIGIN).expect("default origin is a valid URL"),
            enforce_origin: true,
            max_clock_skew_ms: DEFAULT_MAX_CLOCK_SKEW_MS,
            single_use_tokens: false,
            scan_interval: Duration::from_millis(DEFAULT_SCAN_INTERVAL_MS),
        }
    }
}

/// Parse and check an application origin.
///
/// The origin must be `http` or `https`, carry a host, and have no credentials, path, query or
/// fragment. A single trailing `/` is accepted.
pub fn parse_app_origin(value: &str) -> CoreResult<Url> {
    let url = Url::parse(value.trim())
        .map_err(|e| CoreError::InvalidConfig(format!("app origin '{}': {}", value, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(CoreError::InvalidConfig(format!(
            "app origin must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(CoreError::InvalidConfig("app origin must have a host".into()));
    }

    if !url.username().is_empty() || url.password().is_some() {
        return Err(CoreError::InvalidConfig(
            "app origin must not contain credentials".into(),
        ));
    }

    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err(CoreError::InvalidConfig(format!(
            "app origin must not have a path, query or fragment: '{}'",
            value
        )));
    }

    Ok(url)
}

fn parse_flag(key: &str, value: Option<String>, default: bool) -> CoreResult<bool> {
    let Some(value) = value else {
        return Ok(default);
    };

    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(CoreError::InvalidConfig(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> CoreResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| CoreError::InvalidConfig(format!("{} '{}': {}", key, value, e)))
}
