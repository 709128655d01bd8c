mod output;
mod telemetry;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gracli_client::{DEFAULT_LOOKBACK, GraphiteClient};
use gracli_core::aggregate::Aggregator;
use gracli_core::config::ClientConfig;
use gracli_core::time::{parse_lookback, parse_seconds_or_duration};
use serde::Serialize;

use crate::output::{
    print_aggregate_human, print_config_human, print_query_human, print_value_human,
};
use crate::telemetry::{LogFormat, init_cli_tracing};

#[derive(Parser, Debug)]
#[command(name = "gracli")]
#[command(about = "Query a Graphite render API with short-window workarounds")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true, help = "Render API base URL")]
    endpoint: Option<String>,

    #[arg(long, global = true, help = "Prefix prepended to `value` targets")]
    prefix: Option<String>,

    #[arg(long, global = true, help = "Minimum range queried from the backend (e.g. 10m)")]
    min_range: Option<String>,

    #[arg(long, global = true, help = "Send render parameters as a POST form body")]
    post: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Print datapoints of every matching series")]
    Query {
        selector: String,
        #[arg(long, default_value_t = DEFAULT_LOOKBACK.to_string())]
        lookback: String,
    },
    #[command(about = "Aggregate each matching series to one value")]
    Aggregate {
        selector: String,
        #[arg(long, default_value_t = DEFAULT_LOOKBACK.to_string())]
        lookback: String,
        #[arg(long, default_value = "mean")]
        agg: String,
    },
    #[command(about = "Aggregate a single metric, failing unless exactly one series matches")]
    Value {
        target: String,
        #[arg(long, default_value_t = DEFAULT_LOOKBACK.to_string())]
        lookback: String,
        #[arg(long, default_value = "mean")]
        agg: String,
    },
    #[command(about = "Show the resolved client configuration")]
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_cli_tracing(LogFormat::from_env());
    let cfg = resolve_config(&cli)?;

    match cli.command {
        Commands::Query { selector, lookback } => {
            let client = build_client(&cfg)?;
            let lookback = parse_lookback(&lookback)?;
            let data = client
                .query(&selector, lookback)
                .await
                .with_context(|| format!("query {selector}"))?;
            if cli.json {
                print_json(&data)?;
            } else {
                print_query_human(&data);
            }
            Ok(())
        }
        Commands::Aggregate {
            selector,
            lookback,
            agg,
        } => {
            let client = build_client(&cfg)?;
            let lookback = parse_lookback(&lookback)?;
            let aggregator: Aggregator = agg.parse()?;
            let data = client
                .aggregate(&selector, lookback, &aggregator)
                .await
                .with_context(|| format!("aggregate {selector}"))?;
            if cli.json {
                print_json(&data)?;
            } else {
                print_aggregate_human(&data);
            }
            Ok(())
        }
        Commands::Value {
            target,
            lookback,
            agg,
        } => {
            let client = build_client(&cfg)?;
            let lookback = parse_lookback(&lookback)?;
            let aggregator: Aggregator = agg.parse()?;
            let value = client
                .get_metric_value(&target, lookback, &aggregator)
                .await
                .with_context(|| format!("value of {target}"))?;
            if cli.json {
                print_json(&serde_json::json!({ "target": target, "value": value }))?;
            } else {
                print_value_human(&target, value);
            }
            Ok(())
        }
        Commands::Config => {
            if cli.json {
                print_json(&redacted(&cfg))?;
            } else {
                print_config_human(&cfg);
            }
            Ok(())
        }
    }
}

fn resolve_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let mut cfg = ClientConfig::load().context("load configuration")?;
    if let Some(endpoint) = &cli.endpoint {
        cfg.endpoint = endpoint.clone();
    }
    if let Some(prefix) = &cli.prefix {
        cfg.metric_prefix = Some(prefix.clone());
    }
    if let Some(range) = &cli.min_range {
        cfg.minimum_query_range = parse_seconds_or_duration(range)?;
    }
    if cli.post {
        cfg.post_render = true;
    }
    Ok(cfg)
}

fn build_client(cfg: &ClientConfig) -> anyhow::Result<GraphiteClient> {
    tracing::debug!(endpoint = %cfg.endpoint, "building render client");
    Ok(GraphiteClient::new(cfg)?)
}

fn redacted(cfg: &ClientConfig) -> ClientConfig {
    let mut out = cfg.clone();
    for (_, value) in &mut out.headers {
        *value = "***".to_string();
    }
    out
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
