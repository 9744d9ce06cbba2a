//! Rebuilds per-consumer results from the flat batch response.

use serde_json::Value;

use crate::error::FetchError;
use crate::models::{
    SignalSetData, SignalSetRequest, SignalSetsData, SignalSetsRequest, SignalSpec, SignalValues,
    TimedRecord,
};
use crate::query::{
    parse_timestamp, Bucket, Document, QueryKind, QueryResponse, QUERIES_PER_SIGNAL_SET,
};

pub struct ResultStitcher;

impl ResultStitcher {
    /// Reconstruct the data of every signal set in `request`.
    ///
    /// `offset` is where this request's descriptors start in the batch. Signal
    /// set `i` reads exactly the entries `offset + 3i .. offset + 3i + 3`.
    pub fn stitch(
        responses: &[QueryResponse],
        offset: usize,
        request: &SignalSetsRequest,
        kind: QueryKind,
    ) -> Result<SignalSetsData, FetchError> {
        let mut result = SignalSetsData::new();

        for (i, (signal_set, set_request)) in request.iter().enumerate() {
            let base = offset + i * QUERIES_PER_SIGNAL_SET;
            let slots = responses
                .get(base..base + QUERIES_PER_SIGNAL_SET)
                .ok_or(FetchError::ResponseLength {
                    expected: base + QUERIES_PER_SIGNAL_SET,
                    actual: responses.len(),
                })?;

            let mut data = SignalSetData {
                prev: Self::records(&slots[0], base, signal_set, set_request, kind)?
                    .into_iter()
                    .next(),
                main: Self::records(&slots[1], base + 1, signal_set, set_request, kind)?,
                next: Self::records(&slots[2], base + 2, signal_set, set_request, kind)?
                    .into_iter()
                    .next(),
            };

            data.for_each_record(|record| Self::apply_derived(record, set_request));
            result.insert(signal_set.to_string(), data);
        }

        Ok(result)
    }

    fn records(
        response: &QueryResponse,
        index: usize,
        signal_set: &str,
        request: &SignalSetRequest,
        kind: QueryKind,
    ) -> Result<Vec<TimedRecord>, FetchError> {
        if response.kind() != kind {
            return Err(FetchError::ModeMismatch { index });
        }
        match response {
            QueryResponse::Docs(docs) => docs
                .iter()
                .map(|doc| Self::doc_record(doc, signal_set, request))
                .collect(),
            QueryResponse::Aggs(_) => Ok(response.buckets().iter().map(Self::bucket_record).collect()),
        }
    }

    /// Raw documents carry one value per signal; it is filed under every
    /// aggregation the caller asked for.
    fn doc_record(
        doc: &Document,
        signal_set: &str,
        request: &SignalSetRequest,
    ) -> Result<TimedRecord, FetchError> {
        let timestamp = doc
            .get(&request.timestamp_field)
            .and_then(parse_timestamp)
            .ok_or_else(|| {
                FetchError::Decode(format!(
                    "document in signal set '{}' has no valid '{}' timestamp",
                    signal_set, request.timestamp_field
                ))
            })?;

        let mut record = TimedRecord::new(timestamp);
        for (id, spec) in &request.signals {
            if let Some(aggs) = spec.fetched_aggs() {
                let value = doc.get(id).cloned().unwrap_or(Value::Null);
                let values: SignalValues = aggs
                    .iter()
                    .map(|agg| (agg.clone(), value.clone()))
                    .collect();
                record.values.insert(id.clone(), values);
            }
        }
        Ok(record)
    }

    fn bucket_record(bucket: &Bucket) -> TimedRecord {
        TimedRecord {
            timestamp: bucket.key,
            values: bucket.values.clone(),
        }
    }

    /// Second pass once all fetched values are in place. Signals are visited
    /// in request order, so a generated signal sees earlier derived ones.
    fn apply_derived(record: &mut TimedRecord, request: &SignalSetRequest) {
        for (id, spec) in &request.signals {
            let derived = match spec {
                SignalSpec::Raw(_) => continue,
                SignalSpec::Generate(generate) => generate(record.timestamp, record),
                SignalSpec::Mutate { mutate, .. } => {
                    let empty = SignalValues::new();
                    let current = record.values.get(id).unwrap_or(&empty);
                    mutate(current, record.timestamp, record)
                }
            };
            record.values.insert(id.clone(), derived);
        }
    }
}
