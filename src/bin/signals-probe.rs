//! Signals Probe
//!
//! Fetches one window of one signal set through the batching engine and
//! prints the prev/main/next result as JSON. Handy for checking what a
//! dashboard would receive for a given interval.
//!
//! Request parameters come from the environment:
//! - `PROBE_SIGNAL_SET` (required)
//! - `PROBE_SIGNALS`: `sig=agg|agg,sig2=agg` (default `value=avg`)
//! - `PROBE_TIMESTAMP_FIELD` (default `ts`)
//! - `PROBE_FROM` / `PROBE_TO`: RFC 3339 (default: the last hour)
//! - `PROBE_STEP_SECS`: bucket width, 0 for raw documents (default 0)

use chrono::{DateTime, Duration, Utc};
use dotenvy::dotenv;
use signal_access::config::{get_environment, DataAccessConfig};
use signal_access::logging;
use signal_access::metrics::Metrics;
use signal_access::services::HttpTransport;
use signal_access::{
    AbsoluteInterval, FetchScheduler, Session, SignalSetRequest, SignalSetsRequest, SignalSpec,
};
use std::env;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env if present
    dotenv().ok();

    logging::init_logging();

    let config = DataAccessConfig::from_env()?;
    let environment = get_environment();
    info!(environment = %environment, "Starting signals probe");
    info!(endpoint = %config.query_url()?, "Signals query endpoint");

    let signal_set = env::var("PROBE_SIGNAL_SET")
        .map_err(|_| "PROBE_SIGNAL_SET must be set to the signal set to query")?;
    let timestamp_field = env::var("PROBE_TIMESTAMP_FIELD").unwrap_or_else(|_| "ts".to_string());
    let signals = parse_signals(&env::var("PROBE_SIGNALS").unwrap_or_else(|_| "value=avg".to_string()))?;

    let to = parse_time("PROBE_TO")?.unwrap_or_else(Utc::now);
    let from = parse_time("PROBE_FROM")?.unwrap_or(to - Duration::hours(1));
    let step_secs: i64 = env::var("PROBE_STEP_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    if to <= from {
        return Err(format!("PROBE_TO ({}) must be after PROBE_FROM ({})", to, from).into());
    }

    let mut set_request = SignalSetRequest::new().with_timestamp_field(timestamp_field);
    for (id, aggs) in signals {
        set_request = set_request.with_signal(id, SignalSpec::raw(aggs));
    }
    let request = SignalSetsRequest::new().with_signal_set(signal_set.clone(), set_request);
    let interval = AbsoluteInterval::new(from, to, Duration::seconds(step_secs));

    let metrics = Arc::new(Metrics::new()?);
    let transport = Arc::new(HttpTransport::new(&config)?);
    let scheduler = FetchScheduler::new(transport)
        .with_flush_delay(config.flush_delay)
        .with_metrics(metrics.clone());
    let session = Session::new(scheduler).with_metrics(metrics.clone());

    info!(
        signal_set = %signal_set,
        from = %from,
        to = %to,
        step_secs = step_secs,
        "Fetching window"
    );

    match session.fetch(&request, &interval).await? {
        Some(data) => {
            for (id, set) in &data {
                info!(
                    signal_set = %id,
                    main = set.main.len(),
                    has_prev = set.prev.is_some(),
                    has_next = set.next.is_some(),
                    "Window fetched"
                );
            }
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        None => warn!("Fetch was superseded, nothing to print"),
    }

    if let Ok(exported) = metrics.export() {
        tracing::debug!(metrics = %exported, "Probe metrics");
    }

    Ok(())
}

fn parse_time(var: &str) -> Result<Option<DateTime<Utc>>, Box<dyn std::error::Error>> {
    match env::var(var) {
        Ok(value) => {
            let parsed = DateTime::parse_from_rfc3339(&value)
                .map_err(|e| format!("{} is not an RFC 3339 timestamp: {}", var, e))?;
            Ok(Some(parsed.with_timezone(&Utc)))
        }
        Err(_) => Ok(None),
    }
}

fn parse_signals(value: &str) -> Result<Vec<(String, Vec<String>)>, Box<dyn std::error::Error>> {
    let mut signals = Vec::new();
    for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (id, aggs) = entry
            .split_once('=')
            .ok_or_else(|| format!("invalid PROBE_SIGNALS entry '{}', expected sig=agg|agg", entry))?;
        let aggs: Vec<String> = aggs
            .split('|')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect();
        if aggs.is_empty() {
            return Err(format!("signal '{}' lists no aggregations", id).into());
        }
        signals.push((id.trim().to_string(), aggs));
    }
    if signals.is_empty() {
        return Err("PROBE_SIGNALS lists no signals".into());
    }
    Ok(signals)
}
