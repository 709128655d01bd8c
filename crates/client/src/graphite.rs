use gracli_core::aggregate::Aggregate;
use gracli_core::config::ClientConfig;
use gracli_core::error::{GracliError, Result};
use gracli_core::model::series::{AggregateResult, QueryResult};
use gracli_core::trim::{filter_values, non_null_values, trim_datapoints};
use reqwest::Url;
use serde_json::Value;

use crate::http::{HttpClient, HttpConfig};
use crate::response::{parse_series_list, parse_single_series, render_params};

/// Lookback used when the caller has no better idea, in seconds.
pub const DEFAULT_LOOKBACK: u64 = 60;

/// Client for a Graphite-style `/render` endpoint.
///
/// Every query asks the backend for at least `minimum_query_range` seconds
/// of data and trims each series client-side to the requested lookback,
/// measured from the series' own last sample. Busy backends occasionally
/// answer narrow windows with no data at all.
#[derive(Debug, Clone)]
pub struct GraphiteClient {
    http: HttpClient,
    render_url: Url,
    minimum_query_range: u64,
    metric_prefix: Option<String>,
    post_render: bool,
}

impl GraphiteClient {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let http = HttpClient::new(&HttpConfig::from(cfg))?;
        Self::with_http(cfg, http)
    }

    pub fn with_http(cfg: &ClientConfig, http: HttpClient) -> Result<Self> {
        let endpoint = Url::parse(&cfg.endpoint).map_err(|e| {
            GracliError::InvalidArgument(format!("invalid endpoint {}: {e}", cfg.endpoint))
        })?;
        let render_url = endpoint.join("/render").map_err(|e| {
            GracliError::InvalidArgument(format!("invalid endpoint {}: {e}", cfg.endpoint))
        })?;
        Ok(Self {
            http,
            render_url,
            minimum_query_range: cfg.minimum_query_range_secs(),
            metric_prefix: cfg.metric_prefix.clone().filter(|p| !p.is_empty()),
            post_render: cfg.post_render,
        })
    }

    pub fn render_url(&self) -> &Url {
        &self.render_url
    }

    pub fn metric_prefix(&self) -> Option<&str> {
        self.metric_prefix.as_deref()
    }

    /// Points for every series matching `selector` over the last
    /// `lookback` seconds, keyed by target in response order.
    pub async fn query(&self, selector: &str, lookback: u64) -> Result<QueryResult> {
        let data = self.render(selector, lookback).await?;
        let mut out = QueryResult::new();
        for series in parse_series_list(data)? {
            let trimmed = trim_datapoints(&series.datapoints, lookback);
            tracing::debug!(
                target_name = %series.target,
                received = series.datapoints.len(),
                kept = trimmed.len(),
                "trimmed series"
            );
            out.insert(series.target, trimmed);
        }
        Ok(out)
    }

    /// One aggregated value per target. Targets with no non-null point in
    /// the window map to `None` rather than failing the whole call.
    pub async fn aggregate<A>(
        &self,
        selector: &str,
        lookback: u64,
        aggregator: &A,
    ) -> Result<AggregateResult>
    where
        A: Aggregate + ?Sized,
    {
        let data = self.query(selector, lookback).await?;
        Ok(data
            .into_iter()
            .map(|(target, points)| {
                let values = non_null_values(&points);
                let value = (!values.is_empty()).then(|| aggregator.aggregate(&values));
                (target, value)
            })
            .collect())
    }

    /// Aggregate a single, exactly-identified metric.
    ///
    /// The configured metric prefix is prepended to `target`. Fails with
    /// `InvalidDataFormat` unless the backend returns exactly one series and
    /// with `EmptyData` when that series has no non-null value in the window.
    pub async fn get_metric_value<A>(
        &self,
        target: &str,
        lookback: u64,
        aggregator: &A,
    ) -> Result<f64>
    where
        A: Aggregate + ?Sized,
    {
        let full_target = self.prefixed(target);
        let data = self.render(&full_target, lookback).await?;
        let series = parse_single_series(data)?;
        let values = filter_values(&series.datapoints, lookback);
        if values.is_empty() {
            return Err(GracliError::EmptyData(format!(
                "no values for {} in the last {lookback}s",
                series.target
            )));
        }
        Ok(aggregator.aggregate(&values))
    }

    fn prefixed(&self, target: &str) -> String {
        match &self.metric_prefix {
            Some(prefix) => format!("{prefix}{target}"),
            None => target.to_string(),
        }
    }

    async fn render(&self, selector: &str, lookback: u64) -> Result<Value> {
        if selector.trim().is_empty() {
            return Err(GracliError::InvalidArgument(
                "selector cannot be empty".to_string(),
            ));
        }
        let query_from = self.minimum_query_range.max(lookback);
        tracing::debug!(
            selector = %selector,
            lookback,
            query_from,
            url = %self.render_url,
            post = self.post_render,
            "render query"
        );
        let params = render_params(selector, query_from);
        let resp = if self.post_render {
            self.http.post(self.render_url.as_str(), &[], &params).await?
        } else {
            self.http.get(self.render_url.as_str(), &params).await?
        };
        resp.json()
    }
}
