//! Wire format of a single signals query result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::descriptor::QueryKind;

/// Stored document: timestamp field plus requested signal fields
pub type Document = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    #[serde(
        serialize_with = "serialize_timestamp",
        deserialize_with = "deserialize_timestamp"
    )]
    pub key: DateTime<Utc>,
    /// `signal id -> aggregation -> value`
    #[serde(default)]
    pub values: BTreeMap<String, BTreeMap<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryResponse {
    Docs(Vec<Document>),
    /// One bucket list per histogram in the query; only the first is used
    Aggs(Vec<Vec<Bucket>>),
}

impl QueryResponse {
    pub fn kind(&self) -> QueryKind {
        match self {
            QueryResponse::Docs(_) => QueryKind::Docs,
            QueryResponse::Aggs(_) => QueryKind::Aggs,
        }
    }

    pub fn buckets(&self) -> &[Bucket] {
        match self {
            QueryResponse::Aggs(aggs) => aggs.first().map(Vec::as_slice).unwrap_or(&[]),
            QueryResponse::Docs(_) => &[],
        }
    }
}

/// Format used for range bounds and bucket keys on the wire
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Accepts RFC 3339 strings and epoch milliseconds
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|ts| ts.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn serialize_timestamp<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(ts))
}

fn deserialize_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    parse_timestamp(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid bucket key: {}", value)))
}
