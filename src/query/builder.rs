//! Turns a consumer request and a window into query descriptors.
//!
//! Each signal set produces three descriptors, always in this order:
//!
//! 1. prev - the newest record strictly before the window
//! 2. main - everything inside `[from, to)`, oldest first
//! 3. next - the oldest record at or after `to`

use std::collections::BTreeMap;

use crate::models::{AbsoluteInterval, SignalSetRequest, SignalSetsRequest};

use super::descriptor::{
    AggsQuery, DocsQuery, QueryMode, SignalSetQuery, SortOrder, SortSpec, TimeRange,
};
use super::duration::format_iso8601;
use super::response::format_timestamp;

pub const QUERIES_PER_SIGNAL_SET: usize = 3;

/// Which of the three per-set queries a descriptor is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPart {
    Prev,
    Main,
    Next,
}

impl WindowPart {
    pub const ALL: [WindowPart; QUERIES_PER_SIGNAL_SET] =
        [WindowPart::Prev, WindowPart::Main, WindowPart::Next];

    fn range(self, timestamp_field: &str, interval: &AbsoluteInterval) -> TimeRange {
        let from = format_timestamp(&interval.from);
        let to = format_timestamp(&interval.to);
        let (gte, lt) = match self {
            WindowPart::Prev => (None, Some(from)),
            WindowPart::Main => (Some(from), Some(to)),
            WindowPart::Next => (Some(to), None),
        };
        TimeRange {
            signal: timestamp_field.to_string(),
            gte,
            lt,
        }
    }

    /// Ordering and limit for the single-record neighbours
    fn edge(self) -> Option<(SortOrder, usize)> {
        match self {
            WindowPart::Prev => Some((SortOrder::Desc, 1)),
            WindowPart::Main => None,
            WindowPart::Next => Some((SortOrder::Asc, 1)),
        }
    }
}

pub struct QueryBuilder;

impl QueryBuilder {
    /// Build `3 * request.len()` descriptors, grouped per signal set in request order
    pub fn build(request: &SignalSetsRequest, interval: &AbsoluteInterval) -> Vec<SignalSetQuery> {
        let mut queries = Vec::with_capacity(request.len() * QUERIES_PER_SIGNAL_SET);
        for (signal_set, set_request) in request.iter() {
            queries.extend(Self::build_signal_set(signal_set, set_request, interval));
        }
        queries
    }

    /// The prev/main/next descriptors for one signal set
    pub fn build_signal_set(
        signal_set: &str,
        request: &SignalSetRequest,
        interval: &AbsoluteInterval,
    ) -> [SignalSetQuery; QUERIES_PER_SIGNAL_SET] {
        WindowPart::ALL.map(|part| SignalSetQuery {
            signal_set: signal_set.to_string(),
            ranges: vec![part.range(&request.timestamp_field, interval)],
            mode: if interval.is_docs_mode() {
                QueryMode::Docs(Self::docs_query(part, request))
            } else {
                QueryMode::Aggs(vec![Self::aggs_query(part, request, interval)])
            },
        })
    }

    fn docs_query(part: WindowPart, request: &SignalSetRequest) -> DocsQuery {
        let ts = &request.timestamp_field;
        let mut signals = vec![ts.clone()];
        signals.extend(
            request
                .signals
                .iter()
                .filter(|(_, spec)| spec.fetched_aggs().is_some())
                .map(|(id, _)| id.clone()),
        );

        let (sort, limit) = match part.edge() {
            Some((order, limit)) => (
                vec![SortSpec {
                    signal: ts.clone(),
                    order,
                }],
                Some(limit),
            ),
            None => (Vec::new(), None),
        };

        DocsQuery {
            signals,
            sort,
            limit,
        }
    }

    fn aggs_query(
        part: WindowPart,
        request: &SignalSetRequest,
        interval: &AbsoluteInterval,
    ) -> AggsQuery {
        let signals: BTreeMap<String, Vec<String>> = request
            .signals
            .iter()
            .filter_map(|(id, spec)| spec.fetched_aggs().map(|aggs| (id.clone(), aggs.to_vec())))
            .collect();

        let (order, limit) = match part.edge() {
            Some((order, limit)) => (Some(order), Some(limit)),
            None => (None, None),
        };

        AggsQuery {
            signal: request.timestamp_field.clone(),
            step: format_iso8601(interval.aggregation_step),
            offset: format_iso8601(interval.phase_offset()),
            min_doc_count: 1,
            signals,
            order,
            limit,
        }
    }
}
