//! HTTP transport to the model-serving API.
//!
//! Request: `POST {base_url}/flows/{flow}` with body `{"input": …}` and, when configured, a
//! bearer API key. Response: `{"output": …}` on 2xx. Any other status is surfaced as
//! [`FlowError::Upstream`] with the response body.

use crate::client::ModelTransport;
use crate::config::ModelApiConfig;
use crate::{FlowError, FlowName, FlowResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Longest upstream error body kept in [`FlowError::Upstream`].
const MAX_ERROR_BODY: usize = 2_048;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    input: &'a Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    output: Value,
}

#[derive(Clone, Debug)]
pub struct HttpModelTransport {
    client: reqwest::Client,
    cfg: ModelApiConfig,
}

impl HttpModelTransport {
    pub fn new(cfg: ModelApiConfig) -> FlowResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout())
            .build()
            .map_err(|e| FlowError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, cfg })
    }
}

impl ModelTransport for HttpModelTransport {
    async fn generate(&self, flow: FlowName, input: Value) -> FlowResult<Value> {
        let url = self.cfg.flow_url(flow);
        let mut request = self
            .client
            .post(&url)
            .json(&GenerateRequest { input: &input });
        if let Some(key) = self.cfg.api_key() {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(%flow, "model request failed: {}", e);
            FlowError::Transport(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let mut body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!(%flow, "could not read model error body: {}", e);
                    String::new()
                }
            };
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            tracing::error!(%flow, status = status.as_u16(), "model service error");
            return Err(FlowError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| FlowError::SchemaMismatch {
                flow,
                path: "<root>".into(),
                reason: format!("response is not a {{\"output\": …}} envelope: {e}"),
            })?;
        Ok(parsed.output)
    }
}
