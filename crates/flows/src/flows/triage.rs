//! Symptom triage: free-text symptoms in, urgency and next step out.

use crate::schema::{require_input_text, require_output_list, require_output_text};
use crate::{Flow, FlowError, FlowName, FlowResult};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriageInput {
    pub symptoms: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_years: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_history: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Moderate,
    High,
    Emergency,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriageOutput {
    pub urgency: Urgency,
    pub possible_conditions: Vec<String>,
    pub recommended_action: String,
    #[serde(default)]
    pub red_flags: Vec<String>,
}

pub struct SymptomTriage;

impl Flow for SymptomTriage {
    const NAME: FlowName = FlowName::SymptomTriage;

    type Input = TriageInput;
    type Output = TriageOutput;

    fn validate_input(input: &TriageInput) -> FlowResult<()> {
        require_input_text("symptoms", &input.symptoms, 4_000)?;
        if let Some(history) = &input.medical_history {
            require_input_text("medical_history", history, 8_000)?;
        }
        if matches!(input.age_years, Some(age) if age > 130) {
            return Err(FlowError::InvalidInput("age_years must be at most 130".into()));
        }
        Ok(())
    }

    fn validate_output(_input: &TriageInput, output: &TriageOutput) -> FlowResult<()> {
        require_output_list(
            Self::NAME,
            "possible_conditions",
            &output.possible_conditions,
            1,
            10,
        )?;
        require_output_text(Self::NAME, "recommended_action", &output.recommended_action)?;
        require_output_list(Self::NAME, "red_flags", &output.red_flags, 0, 10)?;

        // An emergency without a single red flag means the model contradicted itself.
        if output.urgency == Urgency::Emergency && output.red_flags.is_empty() {
            return Err(FlowError::InvalidOutput {
                flow: Self::NAME,
                reason: "emergency urgency without red flags".into(),
            });
        }
        Ok(())
    }
}
