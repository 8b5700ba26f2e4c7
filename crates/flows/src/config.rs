//! Model-serving API configuration, resolved once at startup.

use crate::{FlowError, FlowResult};
use std::time::Duration;
use url::Url;

pub const ENV_MODEL_API_URL: &str = "MEDLINK_MODEL_API_URL";
pub const ENV_MODEL_API_KEY: &str = "MEDLINK_MODEL_API_KEY";
pub const ENV_MODEL_TIMEOUT_SECS: &str = "MEDLINK_MODEL_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone)]
pub struct ModelApiConfig {
    base_url: Url,
    api_key: Option<String>,
    timeout: Duration,
}

impl ModelApiConfig {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> FlowResult<Self> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|e| FlowError::InvalidConfig(format!("model API URL '{base_url}': {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(FlowError::InvalidConfig(format!(
                "model API URL must use http or https, got '{}'",
                base_url.scheme()
            )));
        }
        if timeout.is_zero() {
            return Err(FlowError::InvalidConfig(
                "model API timeout must be greater than zero".into(),
            ));
        }
        Ok(Self {
            base_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            timeout,
        })
    }

    /// Build from a key lookup. Returns `Ok(None)` when no model API URL is configured, in
    /// which case AI flows are disabled.
    pub fn from_lookup<F>(lookup: F) -> FlowResult<Option<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(base_url) = lookup(ENV_MODEL_API_URL).filter(|v| !v.trim().is_empty()) else {
            return Ok(None);
        };
        let timeout_secs = match lookup(ENV_MODEL_TIMEOUT_SECS).filter(|v| !v.trim().is_empty()) {
            Some(v) => v.trim().parse::<u64>().map_err(|e| {
                FlowError::InvalidConfig(format!("{ENV_MODEL_TIMEOUT_SECS} '{v}': {e}"))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        Self::new(
            &base_url,
            lookup(ENV_MODEL_API_KEY),
            Duration::from_secs(timeout_secs),
        )
        .map(Some)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Endpoint for one flow: `{base_url}/flows/{flow}`.
    pub fn flow_url(&self, flow: crate::FlowName) -> String {
        format!(
            "{}/flows/{}",
            self.base_url.as_str().trim_end_matches('/'),
            flow
        )
    }
}

impl std::fmt::Debug for ModelApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}
