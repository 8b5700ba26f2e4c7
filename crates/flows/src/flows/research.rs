//! Research summary for a clinical topic.

use crate::schema::{require_input_text, require_output_list, require_output_text};
use crate::{Flow, FlowError, FlowName, FlowResult};
use serde::{Deserialize, Serialize};

const DEFAULT_MAX_FINDINGS: u8 = 10;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResearchInput {
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_findings: Option<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResearchOutput {
    pub summary: String,
    pub key_findings: Vec<String>,
    #[serde(default)]
    pub references: Vec<String>,
}

pub struct ResearchSummary;

impl Flow for ResearchSummary {
    const NAME: FlowName = FlowName::ResearchSummary;

    type Input = ResearchInput;
    type Output = ResearchOutput;

    fn validate_input(input: &ResearchInput) -> FlowResult<()> {
        require_input_text("topic", &input.topic, 500)?;
        if input.max_findings == Some(0) {
            return Err(FlowError::InvalidInput(
                "max_findings must be at least 1".into(),
            ));
        }
        Ok(())
    }

    fn validate_output(input: &ResearchInput, output: &ResearchOutput) -> FlowResult<()> {
        let max = input.max_findings.unwrap_or(DEFAULT_MAX_FINDINGS) as usize;
        require_output_text(Self::NAME, "summary", &output.summary)?;
        require_output_list(Self::NAME, "key_findings", &output.key_findings, 1, max)?;
        require_output_list(Self::NAME, "references", &output.references, 0, 50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn findings_capped_by_request() {
        let input = ResearchInput {
            topic: "GLP-1 agonists and cardiovascular outcomes".into(),
            max_findings: Some(2),
        };
        let mut output = ResearchOutput {
            summary: "Consistent reduction in major adverse events.".into(),
            key_findings: vec!["a".into(), "b".into()],
            references: vec![],
        };
        assert!(ResearchSummary::validate_output(&input, &output).is_ok());

        output.key_findings.push("c".into());
        assert!(ResearchSummary::validate_output(&input, &output).is_err());
    }

    #[test]
    fn zero_findings_requested_is_invalid() {
        let input = ResearchInput {
            topic: "statins".into(),
            max_findings: Some(0),
        };
        assert!(ResearchSummary::validate_input(&input).is_err());
    }
}
