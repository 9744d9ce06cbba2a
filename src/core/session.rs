//! Per-consumer staleness tracking

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::error::FetchError;
use crate::metrics::Metrics;
use crate::models::{AbsoluteInterval, SignalSetsData, SignalSetsRequest, TimedRecord};

use super::access::TimeBasedDataAccess;
use super::scheduler::FetchScheduler;

/// Delivers only the result of the most recent fetch.
///
/// Superseded fetches are not cancelled; their queries still go out with
/// whatever batch they joined. Only their result is withheld.
pub struct Session {
    access: TimeBasedDataAccess,
    request_no: AtomicU64,
    metrics: Option<Arc<Metrics>>,
}

impl Session {
    pub fn new(scheduler: FetchScheduler) -> Self {
        Self {
            access: TimeBasedDataAccess::new(scheduler),
            request_no: AtomicU64::new(0),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Fetch `request` for `interval`.
    ///
    /// Returns `Ok(None)` when another fetch on this session started while
    /// this one was in flight; the caller should keep what it already shows.
    /// Errors are returned either way.
    pub async fn fetch(
        &self,
        request: &SignalSetsRequest,
        interval: &AbsoluteInterval,
    ) -> Result<Option<SignalSetsData>, FetchError> {
        let request_no = self.request_no.fetch_add(1, Ordering::SeqCst) + 1;

        let result = self.access.get_signal_sets(request, interval).await?;

        let latest = self.request_no.load(Ordering::SeqCst);
        if request_no == latest {
            Ok(Some(result))
        } else {
            debug!(
                request_no = request_no,
                latest = latest,
                "Dropping superseded fetch result"
            );
            if let Some(metrics) = &self.metrics {
                metrics.stale_results_dropped.inc();
            }
            Ok(None)
        }
    }

    /// Newest record strictly before `at`, per signal set
    pub async fn fetch_latest(
        &self,
        request: &SignalSetsRequest,
        at: DateTime<Utc>,
    ) -> Result<Option<BTreeMap<String, Option<TimedRecord>>>, FetchError> {
        let interval = AbsoluteInterval::raw(at, at);
        let data = self.fetch(request, &interval).await?;
        Ok(data.map(|sets| sets.into_iter().map(|(id, set)| (id, set.prev)).collect()))
    }

    /// Number of fetches issued so far
    pub fn request_count(&self) -> u64 {
        self.request_no.load(Ordering::SeqCst)
    }
}
