//! Shared data models: requests, windows and fetched records.

pub mod interval;
pub mod record;
pub mod signal;

pub use interval::AbsoluteInterval;
pub use record::{SignalSetData, SignalSetsData, SignalValues, TimedRecord};
pub use signal::{
    GenerateFn, MutateFn, SignalSetRequest, SignalSetsRequest, SignalSpec,
    DEFAULT_TIMESTAMP_FIELD,
};
