//! Request side of the model: which signals a consumer wants, per signal set.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

use super::record::{SignalValues, TimedRecord};

pub const DEFAULT_TIMESTAMP_FIELD: &str = "ts";

pub type MutateFn = Arc<dyn Fn(&SignalValues, DateTime<Utc>, &TimedRecord) -> SignalValues + Send + Sync>;
pub type GenerateFn = Arc<dyn Fn(DateTime<Utc>, &TimedRecord) -> SignalValues + Send + Sync>;

/// How one signal is obtained
#[derive(Clone)]
pub enum SignalSpec {
    /// Stored signal, read with the listed aggregations
    Raw(Vec<String>),
    /// Stored signal whose fetched value is rewritten after the fetch
    Mutate { aggs: Vec<String>, mutate: MutateFn },
    /// Derived signal computed from the rest of the record; nothing is fetched
    Generate(GenerateFn),
}

impl SignalSpec {
    pub fn raw<I, S>(aggs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SignalSpec::Raw(aggs.into_iter().map(Into::into).collect())
    }

    pub fn mutate<I, S, F>(aggs: I, mutate: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&SignalValues, DateTime<Utc>, &TimedRecord) -> SignalValues + Send + Sync + 'static,
    {
        SignalSpec::Mutate {
            aggs: aggs.into_iter().map(Into::into).collect(),
            mutate: Arc::new(mutate),
        }
    }

    pub fn generate<F>(generate: F) -> Self
    where
        F: Fn(DateTime<Utc>, &TimedRecord) -> SignalValues + Send + Sync + 'static,
    {
        SignalSpec::Generate(Arc::new(generate))
    }

    /// Aggregations requested from the server, `None` for generated signals
    pub fn fetched_aggs(&self) -> Option<&[String]> {
        match self {
            SignalSpec::Raw(aggs) => Some(aggs),
            SignalSpec::Mutate { aggs, .. } => Some(aggs),
            SignalSpec::Generate(_) => None,
        }
    }
}

impl fmt::Debug for SignalSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalSpec::Raw(aggs) => f.debug_tuple("Raw").field(aggs).finish(),
            SignalSpec::Mutate { aggs, .. } => f.debug_struct("Mutate").field("aggs", aggs).finish_non_exhaustive(),
            SignalSpec::Generate(_) => f.write_str("Generate(..)"),
        }
    }
}

/// Signals wanted from one signal set, in the order they should be resolved
#[derive(Debug, Clone)]
pub struct SignalSetRequest {
    pub timestamp_field: String,
    pub signals: Vec<(String, SignalSpec)>,
}

impl Default for SignalSetRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalSetRequest {
    pub fn new() -> Self {
        Self {
            timestamp_field: DEFAULT_TIMESTAMP_FIELD.to_string(),
            signals: Vec::new(),
        }
    }

    pub fn with_timestamp_field(mut self, field: impl Into<String>) -> Self {
        self.timestamp_field = field.into();
        self
    }

    /// Add a signal; an existing signal with the same id is replaced in place
    pub fn with_signal(mut self, id: impl Into<String>, spec: SignalSpec) -> Self {
        let id = id.into();
        match self.signals.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => entry.1 = spec,
            None => self.signals.push((id, spec)),
        }
        self
    }

    pub fn signal(&self, id: &str) -> Option<&SignalSpec> {
        self.signals
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, spec)| spec)
    }
}

/// Ordered `signal set id -> request` map for one fetch
#[derive(Debug, Clone, Default)]
pub struct SignalSetsRequest {
    sets: Vec<(String, SignalSetRequest)>,
}

impl SignalSetsRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signal_set(mut self, id: impl Into<String>, request: SignalSetRequest) -> Self {
        self.insert(id, request);
        self
    }

    pub fn insert(&mut self, id: impl Into<String>, request: SignalSetRequest) {
        let id = id.into();
        match self.sets.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => entry.1 = request,
            None => self.sets.push((id, request)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SignalSetRequest)> {
        self.sets.iter().map(|(id, request)| (id.as_str(), request))
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}
