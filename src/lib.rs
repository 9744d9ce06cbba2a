//! Batched, time-windowed access to signal set data.
//!
//! Consumers describe which signals they need from which signal sets and the
//! absolute window they are looking at. Requests issued in the same
//! scheduling tick are coalesced into one round trip to the signals query
//! endpoint, and each consumer gets its own prev/main/next view back.

pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod query;
pub mod services;
pub mod signals;

pub use crate::core::{BatchTicket, FetchScheduler, Session, TimeBasedDataAccess};
pub use error::FetchError;
pub use models::{
    AbsoluteInterval, SignalSetData, SignalSetRequest, SignalSetsData, SignalSetsRequest,
    SignalSpec, SignalValues, TimedRecord,
};
