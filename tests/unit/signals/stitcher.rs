//! Unit tests for result reconstruction

use serde_json::{json, Value};
use signal_access::query::{format_timestamp, Bucket, QueryKind, QueryResponse};
use signal_access::signals::{for_aggs_numeric, ResultStitcher};
use signal_access::{FetchError, SignalSetRequest, SignalSetsRequest, SignalSpec, SignalValues};
use std::collections::BTreeMap;

use crate::support::{at_minute, doc, temps_request};

fn row(minute: i64, value: Value) -> serde_json::Map<String, Value> {
    doc(json!({ "ts": format_timestamp(&at_minute(minute)), "value": value }))
}

fn bucket(minute: i64, values: Value) -> Bucket {
    serde_json::from_value(json!({ "key": format_timestamp(&at_minute(minute)), "values": values }))
        .unwrap()
}

fn aggs(buckets: Vec<Bucket>) -> QueryResponse {
    QueryResponse::Aggs(vec![buckets])
}

#[test]
fn docs_window_maps_each_document_to_a_record() {
    let responses = vec![
        QueryResponse::Docs(vec![]),
        QueryResponse::Docs(vec![row(1, json!(20.5)), row(2, json!(21.0))]),
        QueryResponse::Docs(vec![]),
    ];

    let result =
        ResultStitcher::stitch(&responses, 0, &temps_request(), QueryKind::Docs).unwrap();
    let temps = &result["temps"];

    assert!(temps.prev.is_none());
    assert!(temps.next.is_none());
    assert_eq!(temps.main.len(), 2);
    assert_eq!(temps.main[0].timestamp, at_minute(1));
    assert_eq!(temps.main[0].value("value", "avg"), Some(&json!(20.5)));
    assert_eq!(temps.main[1].value("value", "avg"), Some(&json!(21.0)));
}

#[test]
fn raw_value_is_filed_under_every_requested_aggregation() {
    let request = SignalSetsRequest::new().with_signal_set(
        "temps",
        SignalSetRequest::new().with_signal("value", SignalSpec::raw(["min", "max", "avg"])),
    );
    let responses = vec![
        QueryResponse::Docs(vec![row(-3, json!(4))]),
        QueryResponse::Docs(vec![row(1, json!(7))]),
        QueryResponse::Docs(vec![row(12, json!(9))]),
    ];

    let result = ResultStitcher::stitch(&responses, 0, &request, QueryKind::Docs).unwrap();
    let temps = &result["temps"];

    let prev = temps.prev.as_ref().unwrap();
    assert_eq!(prev.timestamp, at_minute(-3));
    for agg in ["min", "max", "avg"] {
        assert_eq!(prev.value("value", agg), Some(&json!(4)));
        assert_eq!(temps.main[0].value("value", agg), Some(&json!(7)));
    }
    assert_eq!(temps.next.as_ref().unwrap().value("value", "max"), Some(&json!(9)));
}

#[test]
fn each_signal_set_reads_only_its_own_slots() {
    let set = || SignalSetRequest::new().with_signal("value", SignalSpec::raw(["avg"]));
    let request = SignalSetsRequest::new()
        .with_signal_set("first", set())
        .with_signal_set("second", set());

    // Slots 0..3 belong to another consumer in the same batch
    let responses: Vec<QueryResponse> = (0..9)
        .map(|i| QueryResponse::Docs(vec![row(i, json!(i))]))
        .collect();

    let result = ResultStitcher::stitch(&responses, 3, &request, QueryKind::Docs).unwrap();

    let first = &result["first"];
    assert_eq!(first.prev.as_ref().unwrap().value("value", "avg"), Some(&json!(3)));
    assert_eq!(first.main[0].value("value", "avg"), Some(&json!(4)));
    assert_eq!(first.next.as_ref().unwrap().value("value", "avg"), Some(&json!(5)));

    let second = &result["second"];
    assert_eq!(second.prev.as_ref().unwrap().value("value", "avg"), Some(&json!(6)));
    assert_eq!(second.main[0].value("value", "avg"), Some(&json!(7)));
    assert_eq!(second.next.as_ref().unwrap().value("value", "avg"), Some(&json!(8)));
}

#[test]
fn bucketed_next_fills_next_not_prev() {
    let responses = vec![
        aggs(vec![bucket(-5, json!({ "value": { "avg": 1.0 } }))]),
        aggs(vec![
            bucket(0, json!({ "value": { "avg": 2.0 } })),
            bucket(5, json!({ "value": { "avg": 3.0 } })),
        ]),
        aggs(vec![bucket(10, json!({ "value": { "avg": 4.0 } }))]),
    ];

    let result =
        ResultStitcher::stitch(&responses, 0, &temps_request(), QueryKind::Aggs).unwrap();
    let temps = &result["temps"];

    let prev = temps.prev.as_ref().expect("prev bucket");
    let next = temps.next.as_ref().expect("next bucket");
    assert_eq!(prev.timestamp, at_minute(-5));
    assert_eq!(prev.value("value", "avg"), Some(&json!(1.0)));
    assert_eq!(next.timestamp, at_minute(10));
    assert_eq!(next.value("value", "avg"), Some(&json!(4.0)));
    assert_eq!(temps.main.len(), 2);
    assert_eq!(temps.main[1].timestamp, at_minute(5));
}

#[test]
fn bucketed_window_without_neighbours() {
    let responses = vec![
        aggs(vec![]),
        aggs(vec![bucket(0, json!({ "value": { "avg": 2.0 } }))]),
        aggs(vec![]),
    ];

    let result =
        ResultStitcher::stitch(&responses, 0, &temps_request(), QueryKind::Aggs).unwrap();
    assert!(result["temps"].prev.is_none());
    assert!(result["temps"].next.is_none());
    assert_eq!(result["temps"].main.len(), 1);
}

#[test]
fn mutate_sees_raw_value_and_generate_sees_siblings() {
    let request = SignalSetsRequest::new().with_signal_set(
        "env",
        SignalSetRequest::new()
            .with_signal(
                "celsius",
                SignalSpec::mutate(["avg"], |raw, _, _| {
                    raw.iter()
                        .map(|(agg, v)| {
                            let f = v.as_f64().map(|c| c * 9.0 / 5.0 + 32.0);
                            (agg.clone(), f.map(Value::from).unwrap_or(Value::Null))
                        })
                        .collect()
                }),
            )
            .with_signal("offset", SignalSpec::raw(["avg"]))
            .with_signal(
                "adjusted",
                SignalSpec::generate(|_, record| {
                    let empty = SignalValues::new();
                    let celsius = record.signal("celsius").unwrap_or(&empty);
                    let offset = record.signal("offset").unwrap_or(&empty);
                    for_aggs_numeric(&[celsius, offset], |v| v[0] + v[1])
                }),
            )
            .with_signal(
                "minute",
                SignalSpec::generate(|ts, _| {
                    let mut values = BTreeMap::new();
                    values.insert("avg".to_string(), json!(ts.format("%M").to_string()));
                    values
                }),
            ),
    );

    let env_row = |minute: i64, c: f64, o: f64| {
        doc(json!({ "ts": format_timestamp(&at_minute(minute)), "celsius": c, "offset": o }))
    };
    let responses = vec![
        QueryResponse::Docs(vec![env_row(-1, 0.0, 1.0)]),
        QueryResponse::Docs(vec![env_row(3, 100.0, 2.0)]),
        QueryResponse::Docs(vec![]),
    ];

    let result = ResultStitcher::stitch(&responses, 0, &request, QueryKind::Docs).unwrap();
    let env = &result["env"];

    let prev = env.prev.as_ref().unwrap();
    assert_eq!(prev.value("celsius", "avg"), Some(&json!(32.0)));
    assert_eq!(prev.value("adjusted", "avg"), Some(&json!(33.0)));

    let main = &env.main[0];
    assert_eq!(main.value("celsius", "avg"), Some(&json!(212.0)));
    assert_eq!(main.value("adjusted", "avg"), Some(&json!(214.0)));
    assert_eq!(main.value("minute", "avg"), Some(&json!("03")));
    assert!(env.next.is_none());
}

#[test]
fn generated_signal_runs_on_bucketed_records() {
    let request = SignalSetsRequest::new().with_signal_set(
        "temps",
        SignalSetRequest::new()
            .with_signal("value", SignalSpec::raw(["avg"]))
            .with_signal(
                "doubled",
                SignalSpec::generate(|_, record| {
                    let empty = SignalValues::new();
                    for_aggs_numeric(&[record.signal("value").unwrap_or(&empty)], |v| v[0] * 2.0)
                }),
            ),
    );
    let responses = vec![
        aggs(vec![]),
        aggs(vec![bucket(0, json!({ "value": { "avg": 2.5 } }))]),
        aggs(vec![bucket(5, json!({ "value": { "avg": 4.0 } }))]),
    ];

    let result = ResultStitcher::stitch(&responses, 0, &request, QueryKind::Aggs).unwrap();
    let temps = &result["temps"];
    assert_eq!(temps.main[0].value("doubled", "avg"), Some(&json!(5.0)));
    assert_eq!(temps.next.as_ref().unwrap().value("doubled", "avg"), Some(&json!(8.0)));
}

#[test]
fn epoch_millisecond_timestamps_are_accepted() {
    let millis = at_minute(4).timestamp_millis();
    let responses = vec![
        QueryResponse::Docs(vec![]),
        QueryResponse::Docs(vec![doc(json!({ "ts": millis, "value": 1 }))]),
        QueryResponse::Docs(vec![]),
    ];

    let result =
        ResultStitcher::stitch(&responses, 0, &temps_request(), QueryKind::Docs).unwrap();
    assert_eq!(result["temps"].main[0].timestamp, at_minute(4));
}

#[test]
fn missing_field_becomes_null() {
    let responses = vec![
        QueryResponse::Docs(vec![]),
        QueryResponse::Docs(vec![doc(json!({ "ts": format_timestamp(&at_minute(1)) }))]),
        QueryResponse::Docs(vec![]),
    ];

    let result =
        ResultStitcher::stitch(&responses, 0, &temps_request(), QueryKind::Docs).unwrap();
    assert_eq!(result["temps"].main[0].value("value", "avg"), Some(&Value::Null));
}

#[test]
fn document_without_timestamp_is_a_decode_error() {
    let responses = vec![
        QueryResponse::Docs(vec![]),
        QueryResponse::Docs(vec![doc(json!({ "value": 1 }))]),
        QueryResponse::Docs(vec![]),
    ];

    let err = ResultStitcher::stitch(&responses, 0, &temps_request(), QueryKind::Docs).unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)));
}

#[test]
fn wrong_mode_is_rejected() {
    let responses = vec![
        QueryResponse::Docs(vec![]),
        aggs(vec![]),
        QueryResponse::Docs(vec![]),
    ];

    let err = ResultStitcher::stitch(&responses, 0, &temps_request(), QueryKind::Docs).unwrap_err();
    assert_eq!(err, FetchError::ModeMismatch { index: 1 });
}

#[test]
fn short_response_is_rejected() {
    let responses = vec![QueryResponse::Docs(vec![]), QueryResponse::Docs(vec![])];

    let err = ResultStitcher::stitch(&responses, 0, &temps_request(), QueryKind::Docs).unwrap_err();
    assert_eq!(
        err,
        FetchError::ResponseLength {
            expected: 3,
            actual: 2
        }
    );
}
