//! Unit tests for the in-memory signals transport

use chrono::Duration;
use serde_json::{json, Value};
use signal_access::query::{format_timestamp, QueryBuilder, QueryMode, QueryResponse};
use signal_access::services::{InMemoryTransport, SignalsTransport};
use signal_access::AbsoluteInterval;

use crate::support::{at_minute, doc, raw_window, temps_request};

/// One document per minute in `[0, minutes)`; `value` is the minute
fn minutely(minutes: i64) -> InMemoryTransport {
    let docs = (0..minutes)
        .map(|m| doc(json!({ "ts": format_timestamp(&at_minute(m)), "value": m, "note": "x" })))
        .collect();
    InMemoryTransport::new().with_documents("temps", docs)
}

fn doc_values(response: &QueryResponse) -> Vec<i64> {
    match response {
        QueryResponse::Docs(docs) => docs.iter().filter_map(|d| d["value"].as_i64()).collect(),
        QueryResponse::Aggs(_) => panic!("expected docs"),
    }
}

fn bucket_avgs(response: &QueryResponse) -> Vec<(i64, Value)> {
    response
        .buckets()
        .iter()
        .map(|b| {
            let minute = (b.key - at_minute(0)).num_minutes();
            (minute, b.values["value"]["avg"].clone())
        })
        .collect()
}

#[tokio::test]
async fn docs_queries_filter_sort_and_limit() {
    let transport = minutely(10);
    let queries = QueryBuilder::build(&temps_request(), &raw_window(3, 6));

    let responses = transport.query(&queries).await.unwrap();

    assert_eq!(responses.len(), 3);
    assert_eq!(doc_values(&responses[0]), [2]);
    assert_eq!(doc_values(&responses[1]), [3, 4, 5]);
    assert_eq!(doc_values(&responses[2]), [6]);
}

#[tokio::test]
async fn docs_are_projected_to_requested_fields() {
    let transport = minutely(3);
    let queries = QueryBuilder::build(&temps_request(), &raw_window(0, 3));

    let responses = transport.query(&queries).await.unwrap();
    let QueryResponse::Docs(main) = &responses[1] else {
        panic!("expected docs");
    };

    for row in main {
        let mut fields: Vec<&str> = row.keys().map(String::as_str).collect();
        fields.sort_unstable();
        assert_eq!(fields, ["ts", "value"]);
    }
}

#[tokio::test]
async fn histogram_honours_phase_offset_and_neighbours() {
    let transport = minutely(20);
    let interval = AbsoluteInterval::new(at_minute(2), at_minute(12), Duration::minutes(5));
    let queries = QueryBuilder::build(&temps_request(), &interval);

    let responses = transport.query(&queries).await.unwrap();

    // Buckets start at minute 2 + 5k
    assert_eq!(bucket_avgs(&responses[0]), [(-3, json!(0.5))]);
    assert_eq!(bucket_avgs(&responses[1]), [(2, json!(4.0)), (7, json!(9.0))]);
    assert_eq!(bucket_avgs(&responses[2]), [(12, json!(14.0))]);
}

#[tokio::test]
async fn histogram_min_doc_count_drops_sparse_buckets() {
    let transport = minutely(8);
    let interval = AbsoluteInterval::new(at_minute(0), at_minute(8), Duration::minutes(5));
    let mut query = QueryBuilder::build(&temps_request(), &interval).remove(1);
    if let QueryMode::Aggs(aggs) = &mut query.mode {
        aggs[0].min_doc_count = 4;
    }

    let responses = transport.query(&[query]).await.unwrap();

    // [0, 5) has five documents, [5, 8) only three
    assert_eq!(bucket_avgs(&responses[0]), [(0, json!(2.0))]);
}

#[tokio::test]
async fn histogram_computes_each_aggregation() {
    let transport = minutely(5);
    let mut query = QueryBuilder::build(
        &temps_request(),
        &AbsoluteInterval::new(at_minute(0), at_minute(5), Duration::minutes(5)),
    )
    .remove(1);
    if let QueryMode::Aggs(aggs) = &mut query.mode {
        aggs[0].signals.insert(
            "value".to_string(),
            ["min", "max", "sum", "count", "median"].map(String::from).to_vec(),
        );
    }

    let responses = transport.query(&[query]).await.unwrap();
    let values = &responses[0].buckets()[0].values["value"];

    assert_eq!(values["min"], json!(0.0));
    assert_eq!(values["max"], json!(4.0));
    assert_eq!(values["sum"], json!(10.0));
    assert_eq!(values["count"], json!(5));
    assert_eq!(values["median"], Value::Null);
}

#[tokio::test]
async fn invalid_step_is_rejected() {
    let transport = minutely(5);
    let mut query = QueryBuilder::build(
        &temps_request(),
        &AbsoluteInterval::new(at_minute(0), at_minute(5), Duration::minutes(1)),
    )
    .remove(1);
    if let QueryMode::Aggs(aggs) = &mut query.mode {
        aggs[0].step = "soon".to_string();
    }

    let err = transport.query(&[query]).await.unwrap_err();
    assert!(matches!(
        err,
        signal_access::FetchError::Status { status: 400, .. }
    ));
}

#[tokio::test]
async fn unknown_signal_set_yields_empty_results() {
    let transport = InMemoryTransport::new();
    let queries = QueryBuilder::build(&temps_request(), &raw_window(0, 10));

    let responses = transport.query(&queries).await.unwrap();

    assert!(responses.iter().all(|r| doc_values(r).is_empty()));
    assert_eq!(transport.call_count().await, 1);
    assert_eq!(transport.requests().await[0], queries);
}

#[tokio::test]
async fn inserted_documents_are_visible_to_later_queries() {
    let transport = InMemoryTransport::new();
    let queries = QueryBuilder::build(&temps_request(), &raw_window(0, 10));
    assert!(doc_values(&transport.query(&queries).await.unwrap()[1]).is_empty());

    transport
        .insert_documents(
            "temps",
            vec![doc(json!({ "ts": format_timestamp(&at_minute(4)), "value": 42 }))],
        )
        .await;

    assert_eq!(doc_values(&transport.query(&queries).await.unwrap()[1]), [42]);
}
