//! In-process transport that answers signals queries from stored documents.
//!
//! Mirrors the server's query semantics closely enough for local
//! development and tests: range filters, timestamp sort with limit, and a
//! date histogram with step, offset, minDocCount, order and limit.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error::FetchError;
use crate::query::duration::parse_iso8601;
use crate::query::{
    parse_timestamp, AggsQuery, Bucket, DocsQuery, Document, QueryMode, QueryResponse,
    SignalSetQuery, SortOrder, TimeRange,
};
use crate::services::transport::SignalsTransport;

#[derive(Default)]
pub struct InMemoryTransport {
    documents: RwLock<HashMap<String, Vec<Document>>>,
    requests: Mutex<Vec<Vec<SignalSetQuery>>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(mut self, signal_set: impl Into<String>, documents: Vec<Document>) -> Self {
        self.documents
            .get_mut()
            .entry(signal_set.into())
            .or_default()
            .extend(documents);
        self
    }

    pub async fn insert_documents(&self, signal_set: &str, documents: Vec<Document>) {
        let mut store = self.documents.write().await;
        store
            .entry(signal_set.to_string())
            .or_default()
            .extend(documents);
    }

    /// Every batch received so far, in arrival order
    pub async fn requests(&self) -> Vec<Vec<SignalSetQuery>> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait::async_trait]
impl SignalsTransport for InMemoryTransport {
    async fn query(&self, queries: &[SignalSetQuery]) -> Result<Vec<QueryResponse>, FetchError> {
        self.requests.lock().await.push(queries.to_vec());

        let store = self.documents.read().await;
        let results = queries
            .iter()
            .map(|query| answer(&store, query))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(queries = queries.len(), "In-memory signals query answered");
        Ok(results)
    }
}

fn answer(
    store: &HashMap<String, Vec<Document>>,
    query: &SignalSetQuery,
) -> Result<QueryResponse, FetchError> {
    let documents: Vec<&Document> = store
        .get(&query.signal_set)
        .into_iter()
        .flatten()
        .filter(|doc| query.ranges.iter().all(|range| in_range(doc, range)))
        .collect();

    match &query.mode {
        QueryMode::Docs(docs) => Ok(QueryResponse::Docs(select_docs(documents, docs))),
        QueryMode::Aggs(aggs) => aggs
            .iter()
            .map(|agg| histogram(&documents, agg))
            .collect::<Result<Vec<_>, _>>()
            .map(QueryResponse::Aggs),
    }
}

fn field_timestamp(doc: &Document, field: &str) -> Option<DateTime<Utc>> {
    doc.get(field).and_then(parse_timestamp)
}

fn bound(value: &Option<String>) -> Option<DateTime<Utc>> {
    value
        .as_ref()
        .and_then(|s| parse_timestamp(&Value::String(s.clone())))
}

fn in_range(doc: &Document, range: &TimeRange) -> bool {
    let Some(ts) = field_timestamp(doc, &range.signal) else {
        return false;
    };
    let above = bound(&range.gte).map_or(true, |gte| ts >= gte);
    let below = bound(&range.lt).map_or(true, |lt| ts < lt);
    above && below
}

fn select_docs(mut documents: Vec<&Document>, query: &DocsQuery) -> Vec<Document> {
    let ts_field = query.signals.first().cloned().unwrap_or_default();
    let sort = query.sort.first();
    let field = sort.map(|s| s.signal.as_str()).unwrap_or(ts_field.as_str());
    let descending = matches!(sort.map(|s| s.order), Some(SortOrder::Desc));

    documents.sort_by(|a, b| {
        let ordering = field_timestamp(a, field).cmp(&field_timestamp(b, field));
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });

    documents
        .into_iter()
        .take(query.limit.unwrap_or(usize::MAX))
        .map(|doc| {
            query
                .signals
                .iter()
                .map(|field| (field.clone(), doc.get(field).cloned().unwrap_or(Value::Null)))
                .collect::<Map<String, Value>>()
        })
        .collect()
}

fn histogram(documents: &[&Document], query: &AggsQuery) -> Result<Vec<Bucket>, FetchError> {
    let step_ms = parse_iso8601(&query.step)
        .map(|d| d.num_milliseconds())
        .filter(|ms| *ms > 0)
        .ok_or_else(|| FetchError::Status {
            status: 400,
            body: format!("invalid histogram step '{}'", query.step),
        })?;
    let offset_ms = parse_iso8601(&query.offset)
        .map(|d| d.num_milliseconds())
        .ok_or_else(|| FetchError::Status {
            status: 400,
            body: format!("invalid histogram offset '{}'", query.offset),
        })?;

    let mut grouped: BTreeMap<i64, Vec<&Document>> = BTreeMap::new();
    for &doc in documents {
        if let Some(ts) = field_timestamp(doc, &query.signal) {
            let shifted = ts.timestamp_millis() - offset_ms;
            let key = shifted - shifted.rem_euclid(step_ms) + offset_ms;
            grouped.entry(key).or_default().push(doc);
        }
    }

    let mut buckets: Vec<Bucket> = grouped
        .into_iter()
        .filter(|(_, docs)| docs.len() as u64 >= query.min_doc_count)
        .filter_map(|(key, docs)| {
            let key = DateTime::from_timestamp_millis(key)?;
            let values = query
                .signals
                .iter()
                .map(|(signal, aggs)| {
                    let samples: Vec<f64> = docs
                        .iter()
                        .filter_map(|doc| doc.get(signal).and_then(Value::as_f64))
                        .collect();
                    let computed = aggs
                        .iter()
                        .map(|agg| (agg.clone(), aggregate(agg, &samples)))
                        .collect();
                    (signal.clone(), computed)
                })
                .collect();
            Some(Bucket { key, values })
        })
        .collect();

    if query.order == Some(SortOrder::Desc) {
        buckets.reverse();
    }
    if let Some(limit) = query.limit {
        buckets.truncate(limit);
    }
    Ok(buckets)
}

fn aggregate(name: &str, samples: &[f64]) -> Value {
    if name == "count" {
        return Value::from(samples.len() as u64);
    }
    if samples.is_empty() {
        return Value::Null;
    }
    let result = match name {
        "avg" => samples.iter().sum::<f64>() / samples.len() as f64,
        "sum" => samples.iter().sum(),
        "min" => samples.iter().copied().fold(f64::INFINITY, f64::min),
        "max" => samples.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        _ => return Value::Null,
    };
    serde_json::Number::from_f64(result)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
