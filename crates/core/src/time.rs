use std::time::Duration;

use crate::error::{GracliError, Result};

pub fn parse_duration_str(input: &str) -> Result<Duration> {
    humantime::parse_duration(input)
        .map_err(|e| GracliError::Parse(format!("invalid duration {input}: {e}")))
}

/// Accepts a humantime duration (`10m`, `2s 500ms`) or plain seconds,
/// possibly fractional (`600`, `2.5`).
pub fn parse_seconds_or_duration(input: &str) -> Result<Duration> {
    let trimmed = input.trim();
    if let Ok(secs) = trimmed.parse::<f64>() {
        return Duration::try_from_secs_f64(secs)
            .map_err(|e| GracliError::Parse(format!("invalid duration {input}: {e}")));
    }
    parse_duration_str(trimmed)
}

/// Lookback windows are whole seconds; sub-second parts are dropped.
pub fn parse_lookback(input: &str) -> Result<u64> {
    Ok(parse_seconds_or_duration(input)?.as_secs())
}
