//! Health trend summary for a topic, optionally narrowed to a region and period.

use crate::schema::{require_input_text, require_output_text};
use crate::{Flow, FlowError, FlowName, FlowResult};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrendsInput {
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Falling,
    Stable,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Trend {
    pub title: String,
    pub description: String,
    pub direction: TrendDirection,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrendsOutput {
    pub summary: String,
    pub trends: Vec<Trend>,
}

pub struct HealthTrends;

impl Flow for HealthTrends {
    const NAME: FlowName = FlowName::HealthTrends;

    type Input = TrendsInput;
    type Output = TrendsOutput;

    fn validate_input(input: &TrendsInput) -> FlowResult<()> {
        require_input_text("topic", &input.topic, 500)?;
        if let Some(region) = &input.region {
            require_input_text("region", region, 200)?;
        }
        if let Some(period) = &input.period {
            require_input_text("period", period, 100)?;
        }
        Ok(())
    }

    fn validate_output(_input: &TrendsInput, output: &TrendsOutput) -> FlowResult<()> {
        require_output_text(Self::NAME, "summary", &output.summary)?;
        if output.trends.len() > 20 {
            return Err(FlowError::InvalidOutput {
                flow: Self::NAME,
                reason: format!("trends has {} entries, expected at most 20", output.trends.len()),
            });
        }
        for (i, trend) in output.trends.iter().enumerate() {
            require_output_text(Self::NAME, &format!("trends[{i}].title"), &trend.title)?;
            require_output_text(Self::NAME, &format!("trends[{i}].description"), &trend.description)?;
        }
        Ok(())
    }
}
