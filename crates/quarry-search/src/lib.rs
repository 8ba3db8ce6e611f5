mod error;
mod executor;
mod service;

pub use error::SearchError;
pub use executor::{Page, Pagination, SearchExecutor};
pub use service::{SearchCount, SearchMode, SearchOutcome, SearchService};
