pub mod aggregate;
pub mod config;
pub mod error;
pub mod model;
pub mod time;
pub mod trim;

pub use aggregate::{Aggregate, Aggregator};
pub use config::ClientConfig;
pub use error::{GracliError, Result};
pub use model::datapoint::DataPoint;
pub use model::series::{AggregateResult, QueryResult, Series};
pub use trim::{filter_values, non_null_values, trim_datapoints};
