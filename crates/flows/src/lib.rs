//! # MedLink Flows
//!
//! Client side of the generative-AI features (symptom triage, prescription suggestion, research
//! and health-trend summaries).
//!
//! The model itself is an external service. This crate only owns the contract:
//! `invoke(flow, input) -> Result<ValidatedOutput, FlowError>`, where inputs are checked before
//! they leave the process and outputs are parsed against a strict per-flow schema and checked
//! for plausibility before anyone sees them.
//!
//! - [`flows`]: the flow catalogue with input/output schemas
//! - [`client`]: typed and by-name invocation over a [`ModelTransport`]
//! - [`http`]: the HTTP transport to the model-serving API

pub mod client;
pub mod config;
pub mod flows;
pub mod http;
mod schema;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub use client::{FlowClient, ModelTransport};
pub use config::ModelApiConfig;
pub use flows::{
    HealthTrends, PrescriptionSuggestion, ResearchSummary, SymptomTriage, ValidatedOutput,
};
pub use http::HttpModelTransport;

/// Errors returned by the `flows` crate.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("unknown flow: {0}")]
    UnknownFlow(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{flow} output schema mismatch at {path}: {reason}")]
    SchemaMismatch {
        flow: FlowName,
        path: String,
        reason: String,
    },

    #[error("{flow} output rejected: {reason}")]
    InvalidOutput { flow: FlowName, reason: String },

    #[error("model transport error: {0}")]
    Transport(String),

    #[error("model service returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Type alias for Results that can fail with a [`FlowError`].
pub type FlowResult<T> = Result<T, FlowError>;

/// Every flow the model service offers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowName {
    SymptomTriage,
    PrescriptionSuggestion,
    ResearchSummary,
    HealthTrends,
}

impl FlowName {
    pub fn all() -> &'static [FlowName] {
        &[
            FlowName::SymptomTriage,
            FlowName::PrescriptionSuggestion,
            FlowName::ResearchSummary,
            FlowName::HealthTrends,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FlowName::SymptomTriage => "symptom_triage",
            FlowName::PrescriptionSuggestion => "prescription_suggestion",
            FlowName::ResearchSummary => "research_summary",
            FlowName::HealthTrends => "health_trends",
        }
    }
}

impl fmt::Display for FlowName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlowName {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FlowName::all()
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| FlowError::UnknownFlow(s.to_string()))
    }
}

/// A prompt flow with a fixed input and output schema.
pub trait Flow {
    const NAME: FlowName;

    type Input: Serialize + DeserializeOwned + Send + Sync;
    type Output: Serialize + DeserializeOwned + Send;

    /// Reject input the model should never see.
    fn validate_input(input: &Self::Input) -> FlowResult<()>;

    /// Reject schema-valid output that is still unusable.
    fn validate_output(input: &Self::Input, output: &Self::Output) -> FlowResult<()>;
}
