//! Decoding and validation of render API responses.

use gracli_core::error::{GracliError, Result};
use gracli_core::model::series::Series;
use serde_json::Value;

pub fn render_params(selector: &str, from_secs: u64) -> Vec<(&'static str, String)> {
    vec![
        ("target", selector.to_string()),
        ("format", "json".to_string()),
        ("from", format!("-{from_secs}s")),
    ]
}

/// Decode every series in a render response.
pub fn parse_series_list(data: Value) -> Result<Vec<Series>> {
    serde_json::from_value(data)
        .map_err(|e| GracliError::Parse(format!("unexpected render response shape: {e}")))
}

/// Decode a response that must hold exactly one series.
pub fn parse_single_series(data: Value) -> Result<Series> {
    let mut entries = match data {
        Value::Array(entries) => entries,
        other => {
            return Err(GracliError::InvalidDataFormat(format!(
                "expected a list, got {}",
                kind(&other)
            )));
        }
    };
    match entries.len() {
        0 => Err(GracliError::InvalidDataFormat(
            "empty data returned".to_string(),
        )),
        1 => {
            let entry = entries.remove(0);
            serde_json::from_value(entry).map_err(|e| {
                GracliError::InvalidDataFormat(format!("malformed series entry: {e}"))
            })
        }
        n => Err(GracliError::InvalidDataFormat(format!(
            "multiple metrics returned ({n})"
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
