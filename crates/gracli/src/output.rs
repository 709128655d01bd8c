use std::io::IsTerminal;

use chrono::SecondsFormat;
use gracli_core::config::ClientConfig;
use gracli_core::model::datapoint::DataPoint;
use gracli_core::model::series::{AggregateResult, QueryResult};
use owo_colors::OwoColorize;

pub fn print_query_human(v: &QueryResult) {
    for (target, points) in v {
        println!("{} ({} points)", target_label(target), points.len());
        for point in points {
            println!("  {} {}", timestamp_label(point), value_label(point.value));
        }
    }
    println!("-- {} series --", v.len());
}

pub fn print_aggregate_human(v: &AggregateResult) {
    for (target, value) in v {
        println!("{}={}", target_label(target), value_label(*value));
    }
}

pub fn print_value_human(target: &str, value: f64) {
    println!("{}={value}", target_label(target));
}

pub fn print_config_human(cfg: &ClientConfig) {
    println!("endpoint={}", cfg.endpoint);
    println!(
        "minimum_query_range={}s",
        cfg.minimum_query_range.as_secs()
    );
    println!(
        "metric_prefix={}",
        cfg.metric_prefix.as_deref().unwrap_or("-")
    );
    println!(
        "connect_timeout={:.3}s read_timeout={:.3}s",
        cfg.connect_timeout.as_secs_f64(),
        cfg.read_timeout.as_secs_f64()
    );
    println!(
        "max_retries={} backoff_factor={}",
        cfg.max_retries, cfg.backoff_factor
    );
    println!("post_render={}", cfg.post_render);
    let header_names: Vec<&str> = cfg.headers.iter().map(|(k, _)| k.as_str()).collect();
    println!("headers={}", header_names.join(","));
}

fn timestamp_label(point: &DataPoint) -> String {
    point
        .time()
        .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| point.timestamp.to_string())
}

fn value_label(value: Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None if colored() => "none".yellow().to_string(),
        None => "none".to_string(),
    }
}

fn target_label(target: &str) -> String {
    if colored() {
        target.cyan().to_string()
    } else {
        target.to_string()
    }
}

fn colored() -> bool {
    std::io::stdout().is_terminal()
}
