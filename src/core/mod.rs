//! Core engine: batching scheduler, request path and sessions

pub mod access;
pub mod scheduler;
pub mod session;

pub use access::TimeBasedDataAccess;
pub use scheduler::{BatchOutcome, BatchTicket, FetchScheduler};
pub use session::Session;
