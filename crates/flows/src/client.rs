//! Flow invocation.

use crate::flows::{
    HealthTrends, PrescriptionSuggestion, ResearchSummary, SymptomTriage, ValidatedOutput,
};
use crate::schema::{parse_input, parse_output};
use crate::{Flow, FlowError, FlowName, FlowResult};
use serde_json::Value;
use std::future::Future;

/// Carries a flow request to the model service and brings back its raw JSON output.
pub trait ModelTransport: Send + Sync {
    fn generate(
        &self,
        flow: FlowName,
        input: Value,
    ) -> impl Future<Output = FlowResult<Value>> + Send;
}

/// Schema-checked access to the model service.
#[derive(Clone, Debug)]
pub struct FlowClient<T> {
    transport: T,
}

impl<T: ModelTransport> FlowClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run flow `F` with a typed input.
    ///
    /// # Errors
    ///
    /// - [`FlowError::InvalidInput`] before anything is sent if the input fails validation
    /// - [`FlowError::Transport`] / [`FlowError::Upstream`] from the transport
    /// - [`FlowError::SchemaMismatch`] if the output does not match `F::Output`
    /// - [`FlowError::InvalidOutput`] if the output parses but fails the flow's checks
    pub async fn invoke<F: Flow>(&self, input: F::Input) -> FlowResult<F::Output> {
        F::validate_input(&input)?;
        let payload =
            serde_json::to_value(&input).map_err(|e| FlowError::InvalidInput(e.to_string()))?;

        tracing::info!(flow = %F::NAME, "invoking flow");
        let raw = self.transport.generate(F::NAME, payload).await?;

        let output: F::Output = parse_output(F::NAME, raw)?;
        F::validate_output(&input, &output)?;
        tracing::debug!(flow = %F::NAME, "flow output accepted");
        Ok(output)
    }

    /// Run a flow chosen at runtime with a JSON input.
    pub async fn invoke_named(&self, flow: &str, input: Value) -> FlowResult<ValidatedOutput> {
        match flow.parse::<FlowName>()? {
            FlowName::SymptomTriage => {
                let input = parse_input(FlowName::SymptomTriage, input)?;
                self.invoke::<SymptomTriage>(input)
                    .await
                    .map(ValidatedOutput::SymptomTriage)
            }
            FlowName::PrescriptionSuggestion => {
                let input = parse_input(FlowName::PrescriptionSuggestion, input)?;
                self.invoke::<PrescriptionSuggestion>(input)
                    .await
                    .map(ValidatedOutput::PrescriptionSuggestion)
            }
            FlowName::ResearchSummary => {
                let input = parse_input(FlowName::ResearchSummary, input)?;
                self.invoke::<ResearchSummary>(input)
                    .await
                    .map(ValidatedOutput::ResearchSummary)
            }
            FlowName::HealthTrends => {
                let input = parse_input(FlowName::HealthTrends, input)?;
                self.invoke::<HealthTrends>(input)
                    .await
                    .map(ValidatedOutput::HealthTrends)
            }
        }
    }
}
