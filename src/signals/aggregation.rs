//! Helpers for computing derived signals aggregation by aggregation

use serde_json::Value;

use crate::models::SignalValues;

/// Combine several signals' value maps per aggregation.
///
/// The aggregation names come from the first signal; a signal missing one
/// contributes `null`. With no signals the result is empty.
pub fn for_aggs<F>(signals: &[&SignalValues], combine: F) -> SignalValues
where
    F: Fn(&[Value]) -> Value,
{
    let Some(first) = signals.first() else {
        return SignalValues::new();
    };

    first
        .keys()
        .map(|agg| {
            let inputs: Vec<Value> = signals
                .iter()
                .map(|signal| signal.get(agg).cloned().unwrap_or(Value::Null))
                .collect();
            (agg.clone(), combine(&inputs))
        })
        .collect()
}

/// Numeric variant of [`for_aggs`]: yields `null` for an aggregation unless
/// every input is a number and the combined result is finite
pub fn for_aggs_numeric<F>(signals: &[&SignalValues], combine: F) -> SignalValues
where
    F: Fn(&[f64]) -> f64,
{
    for_aggs(signals, |inputs| {
        let numbers: Option<Vec<f64>> = inputs.iter().map(Value::as_f64).collect();
        numbers
            .map(|n| combine(&n))
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    })
}
