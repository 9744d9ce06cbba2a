//! Transport interface for the signals query endpoint.

use crate::error::FetchError;
use crate::query::{QueryResponse, SignalSetQuery};

/// Sends one batch of queries and returns one response per query, in order.
///
/// Correlation is purely positional; implementations must neither reorder
/// nor drop entries.
#[async_trait::async_trait]
pub trait SignalsTransport: Send + Sync {
    async fn query(&self, queries: &[SignalSetQuery]) -> Result<Vec<QueryResponse>, FetchError>;
}
