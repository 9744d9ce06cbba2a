//! Wire format of a single signals query.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Range filter on one signal; bounds are RFC 3339 timestamps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(rename = "sigCid")]
    pub signal: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub gte: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub lt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    #[serde(rename = "sigCid")]
    pub signal: String,
    pub order: SortOrder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocsQuery {
    /// Fields to return for every document
    pub signals: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub sort: Vec<SortSpec>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub limit: Option<usize>,
}

/// Date histogram over the timestamp signal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggsQuery {
    #[serde(rename = "sigCid")]
    pub signal: String,
    /// Bucket width as an ISO 8601 duration
    pub step: String,
    /// Bucket phase as an ISO 8601 duration
    pub offset: String,
    pub min_doc_count: u64,
    /// `signal id -> aggregations` computed per bucket
    pub signals: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub order: Option<SortOrder>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Docs,
    Aggs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    Docs(DocsQuery),
    Aggs(Vec<AggsQuery>),
}

impl QueryMode {
    pub fn kind(&self) -> QueryKind {
        match self {
            QueryMode::Docs(_) => QueryKind::Docs,
            QueryMode::Aggs(_) => QueryKind::Aggs,
        }
    }
}

/// One entry of the batched request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalSetQuery {
    #[serde(rename = "sigSetCid")]
    pub signal_set: String,
    pub ranges: Vec<TimeRange>,
    #[serde(flatten)]
    pub mode: QueryMode,
}

impl SignalSetQuery {
    pub fn kind(&self) -> QueryKind {
        self.mode.kind()
    }

    pub fn docs(&self) -> Option<&DocsQuery> {
        match &self.mode {
            QueryMode::Docs(docs) => Some(docs),
            QueryMode::Aggs(_) => None,
        }
    }

    pub fn aggs(&self) -> Option<&[AggsQuery]> {
        match &self.mode {
            QueryMode::Aggs(aggs) => Some(aggs),
            QueryMode::Docs(_) => None,
        }
    }
}
