//! Transports that carry batched signals queries.

pub mod http;
pub mod memory;
pub mod transport;

pub use http::HttpTransport;
pub use memory::InMemoryTransport;
pub use transport::SignalsTransport;
