pub mod graphite;
pub mod http;
pub mod response;

pub use graphite::{DEFAULT_LOOKBACK, GraphiteClient};
pub use http::{HttpClient, HttpConfig, HttpResponse};
