//! Client-side trimming of render results.
//!
//! The backend is asked for a wider window than the caller wants, then each
//! series is cut back to `max_age` seconds measured from its own last
//! sample. Nothing here touches the network.

use crate::model::datapoint::DataPoint;

/// Keep the points no older than `max_age` seconds relative to the last point.
///
/// The boundary is inclusive and order is preserved. Null values are kept;
/// the last point anchors the window whether or not it carries a value.
pub fn trim_datapoints(datapoints: &[DataPoint], max_age: u64) -> Vec<DataPoint> {
    let Some(last) = datapoints.last() else {
        return Vec::new();
    };
    datapoints
        .iter()
        .filter(|p| within(last.timestamp, p.timestamp, max_age))
        .copied()
        .collect()
}

/// Drop null points, then trim relative to the last remaining point and
/// return the bare values.
pub fn filter_values(datapoints: &[DataPoint], max_age: u64) -> Vec<f64> {
    let present: Vec<(f64, i64)> = datapoints
        .iter()
        .filter_map(|p| p.value.map(|v| (v, p.timestamp)))
        .collect();
    let Some(&(_, last_ts)) = present.last() else {
        return Vec::new();
    };
    present
        .into_iter()
        .filter(|(_, ts)| within(last_ts, *ts, max_age))
        .map(|(v, _)| v)
        .collect()
}

pub fn non_null_values(datapoints: &[DataPoint]) -> Vec<f64> {
    datapoints.iter().filter_map(|p| p.value).collect()
}

fn within(last_ts: i64, ts: i64, max_age: u64) -> bool {
    let age = i128::from(last_ts) - i128::from(ts);
    age <= i128::from(max_age)
}
