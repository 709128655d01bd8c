use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::datapoint::DataPoint;

/// A named sequence of points, ascending by timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Series {
    pub target: String,
    pub datapoints: Vec<DataPoint>,
}

impl Series {
    pub fn new(target: impl Into<String>, datapoints: Vec<DataPoint>) -> Self {
        Self {
            target: target.into(),
            datapoints,
        }
    }
}

/// Trimmed points per target, in backend response order.
pub type QueryResult = IndexMap<String, Vec<DataPoint>>;

/// One aggregate per target; `None` when the target had no usable value.
pub type AggregateResult = IndexMap<String, Option<f64>>;
