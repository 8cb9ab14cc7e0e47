// Application layer - use cases and orchestration
// The aggregator talks to the explorer; the watch service adds per-user
// address bookkeeping on top of it.

pub mod aggregator;
pub mod error;
pub mod service;

pub use aggregator::*;
pub use error::*;
pub use service::*;
