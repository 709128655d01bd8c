pub mod datapoint;
pub mod series;
