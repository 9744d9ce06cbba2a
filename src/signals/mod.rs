//! Result reconstruction and derived-signal helpers.

pub mod aggregation;
pub mod stitcher;

pub use aggregation::{for_aggs, for_aggs_numeric};
pub use stitcher::ResultStitcher;
