//! Request path: build queries, share a batch, cut out this caller's results

use crate::error::FetchError;
use crate::models::{AbsoluteInterval, SignalSetsData, SignalSetsRequest};
use crate::query::{QueryBuilder, QueryKind};
use crate::signals::ResultStitcher;

use super::scheduler::FetchScheduler;

#[derive(Clone)]
pub struct TimeBasedDataAccess {
    scheduler: FetchScheduler,
}

impl TimeBasedDataAccess {
    pub fn new(scheduler: FetchScheduler) -> Self {
        Self { scheduler }
    }

    pub fn scheduler(&self) -> &FetchScheduler {
        &self.scheduler
    }

    /// Fetch prev/main/next data of every requested signal set for `interval`
    pub async fn get_signal_sets(
        &self,
        request: &SignalSetsRequest,
        interval: &AbsoluteInterval,
    ) -> Result<SignalSetsData, FetchError> {
        if request.is_empty() {
            return Ok(SignalSetsData::new());
        }

        let kind = if interval.is_docs_mode() {
            QueryKind::Docs
        } else {
            QueryKind::Aggs
        };

        let ticket = self
            .scheduler
            .enqueue(QueryBuilder::build(request, interval))
            .await;
        let offset = ticket.offset;
        let responses = ticket.wait().await?;

        ResultStitcher::stitch(&responses, offset, request, kind)
    }
}
