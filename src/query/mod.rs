//! Signals query wire format and the builder that produces it.

pub mod builder;
pub mod descriptor;
pub mod duration;
pub mod response;

pub use builder::{QueryBuilder, WindowPart, QUERIES_PER_SIGNAL_SET};
pub use descriptor::{
    AggsQuery, DocsQuery, QueryKind, QueryMode, SignalSetQuery, SortOrder, SortSpec, TimeRange,
};
pub use response::{format_timestamp, parse_timestamp, Bucket, Document, QueryResponse};
