//! Strict JSON parsing and plausibility checks shared by all flows.

use crate::{FlowError, FlowName, FlowResult};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Upper bound on any single text field coming back from the model.
pub(crate) const MAX_TEXT_LEN: usize = 8_000;

/// Deserialize `value`, reporting the JSON path of the first mismatch.
fn parse_with_path<T: DeserializeOwned>(value: Value) -> Result<T, (String, String)> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(|err| {
        let path = err.path().to_string();
        let reason = err.into_inner().to_string();
        let path = if path.is_empty() || path == "." {
            "<root>".to_string()
        } else {
            path
        };
        (path, reason)
    })
}

pub(crate) fn parse_input<T: DeserializeOwned>(flow: FlowName, value: Value) -> FlowResult<T> {
    parse_with_path(value).map_err(|(path, reason)| {
        FlowError::InvalidInput(format!("{flow} input mismatch at {path}: {reason}"))
    })
}

pub(crate) fn parse_output<T: DeserializeOwned>(flow: FlowName, value: Value) -> FlowResult<T> {
    parse_with_path(value).map_err(|(path, reason)| {
        tracing::warn!(%flow, %path, "model output does not match schema");
        FlowError::SchemaMismatch { flow, path, reason }
    })
}

/// Input text must be present and bounded.
pub(crate) fn require_input_text(field: &str, value: &str, max_len: usize) -> FlowResult<()> {
    if value.trim().is_empty() {
        return Err(FlowError::InvalidInput(format!("{field} cannot be empty")));
    }
    if value.len() > max_len {
        return Err(FlowError::InvalidInput(format!(
            "{field} exceeds maximum length of {max_len} characters"
        )));
    }
    Ok(())
}

/// Output text must be present and bounded.
pub(crate) fn require_output_text(flow: FlowName, field: &str, value: &str) -> FlowResult<()> {
    if value.trim().is_empty() {
        return Err(FlowError::InvalidOutput {
            flow,
            reason: format!("{field} is empty"),
        });
    }
    if value.len() > MAX_TEXT_LEN {
        return Err(FlowError::InvalidOutput {
            flow,
            reason: format!("{field} exceeds {MAX_TEXT_LEN} characters"),
        });
    }
    Ok(())
}

/// Output list length must be within `min..=max` and every entry non-empty.
pub(crate) fn require_output_list(
    flow: FlowName,
    field: &str,
    items: &[String],
    min: usize,
    max: usize,
) -> FlowResult<()> {
    if items.len() < min || items.len() > max {
        return Err(FlowError::InvalidOutput {
            flow,
            reason: format!(
                "{field} has {} entries, expected {min} to {max}",
                items.len()
            ),
        });
    }
    for (index, item) in items.iter().enumerate() {
        require_output_text(flow, &format!("{field}[{index}]"), item)?;
    }
    Ok(())
}
