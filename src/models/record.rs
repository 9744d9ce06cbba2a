use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// `aggregation name -> scalar` for one signal
pub type SignalValues = BTreeMap<String, Value>;

/// One point in time with the values of every requested signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedRecord {
    pub timestamp: DateTime<Utc>,
    pub values: BTreeMap<String, SignalValues>,
}

impl TimedRecord {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            values: BTreeMap::new(),
        }
    }

    pub fn signal(&self, id: &str) -> Option<&SignalValues> {
        self.values.get(id)
    }

    /// Shorthand for `values[signal][agg]`
    pub fn value(&self, signal: &str, agg: &str) -> Option<&Value> {
        self.values.get(signal).and_then(|aggs| aggs.get(agg))
    }
}

/// Data returned for one signal set: the window plus its neighbours
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalSetData {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub prev: Option<TimedRecord>,
    pub main: Vec<TimedRecord>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub next: Option<TimedRecord>,
}

impl SignalSetData {
    /// prev, main and next in chronological order
    pub fn records(&self) -> impl Iterator<Item = &TimedRecord> {
        self.prev
            .iter()
            .chain(self.main.iter())
            .chain(self.next.iter())
    }

    fn records_mut(&mut self) -> impl Iterator<Item = &mut TimedRecord> {
        self.prev
            .iter_mut()
            .chain(self.main.iter_mut())
            .chain(self.next.iter_mut())
    }

    pub(crate) fn for_each_record(&mut self, mut f: impl FnMut(&mut TimedRecord)) {
        for record in self.records_mut() {
            f(record);
        }
    }
}

/// Result of one fetch, keyed by signal set id
pub type SignalSetsData = BTreeMap<String, SignalSetData>;
