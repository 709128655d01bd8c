use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GracliError, Result};

/// Reduces a non-empty list of values to a single number.
///
/// Implemented for [`Aggregator`] and for any `Fn(&[f64]) -> f64`, so
/// callers can plug in their own reducer.
pub trait Aggregate {
    fn aggregate(&self, values: &[f64]) -> f64;
}

impl<F> Aggregate for F
where
    F: Fn(&[f64]) -> f64,
{
    fn aggregate(&self, values: &[f64]) -> f64 {
        self(values)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Aggregator {
    #[default]
    Mean,
    Sum,
    Min,
    Max,
    Median,
    First,
    Last,
}

impl Aggregate for Aggregator {
    fn aggregate(&self, values: &[f64]) -> f64 {
        match self {
            Self::Mean => mean(values),
            Self::Sum => values.iter().sum(),
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Median => median(values),
            Self::First => values.first().copied().unwrap_or(f64::NAN),
            Self::Last => values.last().copied().unwrap_or(f64::NAN),
        }
    }
}

impl FromStr for Aggregator {
    type Err = GracliError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mean" | "avg" | "average" => Ok(Self::Mean),
            "sum" => Ok(Self::Sum),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "median" => Ok(Self::Median),
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            _ => Err(GracliError::Parse(format!("unknown aggregator: {s}"))),
        }
    }
}

impl fmt::Display for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mean => "mean",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Median => "median",
            Self::First => "first",
            Self::Last => "last",
        };
        f.write_str(name)
    }
}

pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    match sorted.len() {
        0 => f64::NAN,
        n if n % 2 == 0 => (sorted[mid - 1] + sorted[mid]) / 2.0,
        _ => sorted[mid],
    }
}
