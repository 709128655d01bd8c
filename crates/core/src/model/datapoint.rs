use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One `[value, timestamp]` sample as returned by the render API.
///
/// `value` is `None` when the backend holds no sample for the slot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(from = "(Option<f64>, i64)", into = "(Option<f64>, i64)")]
pub struct DataPoint {
    pub value: Option<f64>,
    pub timestamp: i64,
}

impl DataPoint {
    pub fn new(value: Option<f64>, timestamp: i64) -> Self {
        Self { value, timestamp }
    }

    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

impl From<(Option<f64>, i64)> for DataPoint {
    fn from((value, timestamp): (Option<f64>, i64)) -> Self {
        Self { value, timestamp }
    }
}

impl From<DataPoint> for (Option<f64>, i64) {
    fn from(point: DataPoint) -> Self {
        (point.value, point.timestamp)
    }
}
