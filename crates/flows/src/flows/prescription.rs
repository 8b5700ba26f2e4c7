//! Prescription suggestion for a confirmed diagnosis.
//!
//! Suggestions are advisory and always reviewed by the prescribing doctor. A suggestion that
//! names one of the patient's recorded allergies is rejected outright.

use crate::schema::{require_input_text, require_output_list, require_output_text};
use crate::{Flow, FlowError, FlowName, FlowResult};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrescriptionInput {
    pub diagnosis: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_history: Option<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub current_medications: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MedicationSuggestion {
    pub medication: String,
    pub dosage: String,
    pub frequency: String,
    pub rationale: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrescriptionOutput {
    pub suggestions: Vec<MedicationSuggestion>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

pub struct PrescriptionSuggestion;

impl Flow for PrescriptionSuggestion {
    const NAME: FlowName = FlowName::PrescriptionSuggestion;

    type Input = PrescriptionInput;
    type Output = PrescriptionOutput;

    fn validate_input(input: &PrescriptionInput) -> FlowResult<()> {
        require_input_text("diagnosis", &input.diagnosis, 2_000)?;
        if let Some(history) = &input.patient_history {
            require_input_text("patient_history", history, 8_000)?;
        }
        for allergy in &input.allergies {
            require_input_text("allergies[]", allergy, 200)?;
        }
        Ok(())
    }

    fn validate_output(input: &PrescriptionInput, output: &PrescriptionOutput) -> FlowResult<()> {
        if output.suggestions.is_empty() || output.suggestions.len() > 10 {
            return Err(FlowError::InvalidOutput {
                flow: Self::NAME,
                reason: format!(
                    "suggestions has {} entries, expected 1 to 10",
                    output.suggestions.len()
                ),
            });
        }

        for (i, s) in output.suggestions.iter().enumerate() {
            require_output_text(Self::NAME, &format!("suggestions[{i}].medication"), &s.medication)?;
            require_output_text(Self::NAME, &format!("suggestions[{i}].dosage"), &s.dosage)?;
            require_output_text(Self::NAME, &format!("suggestions[{i}].frequency"), &s.frequency)?;
            require_output_text(Self::NAME, &format!("suggestions[{i}].rationale"), &s.rationale)?;

            let medication = s.medication.to_lowercase();
            if let Some(allergy) = input
                .allergies
                .iter()
                .find(|a| medication.contains(&a.trim().to_lowercase()))
            {
                tracing::warn!(flow = %Self::NAME, "suggestion conflicts with recorded allergy");
                return Err(FlowError::InvalidOutput {
                    flow: Self::NAME,
                    reason: format!(
                        "suggestion '{}' conflicts with allergy '{}'",
                        s.medication, allergy
                    ),
                });
            }
        }

        require_output_list(Self::NAME, "warnings", &output.warnings, 0, 20)
    }
}
