use quarry_query::QueryError;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Failure reported by the storage engine, passed through as-is.
    #[error("executor error: {0}")]
    Executor(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl SearchError {
    pub fn executor(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        SearchError::Executor(e.into())
    }

    pub fn is_invalid_request(&self) -> bool {
        matches!(self, SearchError::Query(_))
    }
}
