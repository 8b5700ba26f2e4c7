//! Flow catalogue.
//!
//! Wire structs use `deny_unknown_fields` so anything the model invents beyond the schema is a
//! [`crate::FlowError::SchemaMismatch`] rather than silently dropped.

mod prescription;
mod research;
mod trends;
mod triage;

pub use prescription::{
    MedicationSuggestion, PrescriptionInput, PrescriptionOutput, PrescriptionSuggestion,
};
pub use research::{ResearchInput, ResearchOutput, ResearchSummary};
pub use trends::{HealthTrends, Trend, TrendDirection, TrendsInput, TrendsOutput};
pub use triage::{SymptomTriage, TriageInput, TriageOutput, Urgency};

use serde::Serialize;

/// Output of any flow, tagged with the flow that produced it.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "flow", content = "output", rename_all = "snake_case")]
pub enum ValidatedOutput {
    SymptomTriage(TriageOutput),
    PrescriptionSuggestion(PrescriptionOutput),
    ResearchSummary(ResearchOutput),
    HealthTrends(TrendsOutput),
}
