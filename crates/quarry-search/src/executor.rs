use bson::Document;
use quarry_query::PaginatedQuery;
use serde::Serialize;

use crate::error::SearchError;

/// The storage engine's aggregation primitives.
///
/// Implementations run the pipeline they are given verbatim; the compiler
/// never executes anything itself.
pub trait SearchExecutor: Send + Sync {
    fn aggregate(&self, pipeline: &[Document]) -> Result<Vec<Document>, SearchError>;

    fn paginate(&self, pipeline: &[Document], pagination: &Pagination) -> Result<Page, SearchError>;

    fn count(&self, pipeline: &[Document]) -> Result<u64, SearchError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u64,
    pub page: Option<u64>,
    pub offset: Option<u64>,
}

impl Pagination {
    pub fn from_query(query: &PaginatedQuery) -> Self {
        Self {
            limit: query.limit,
            page: query.page,
            offset: query.offset,
        }
    }

    /// Rows to skip: `offset` when set, otherwise `(page - 1) * limit`.
    pub fn skip(&self) -> u64 {
        match (self.offset, self.page) {
            (Some(offset), _) => offset,
            (None, Some(page)) => page.saturating_sub(1).saturating_mul(self.limit),
            (None, None) => 0,
        }
    }

    /// 1-based page number the skip lands on.
    pub fn current_page(&self) -> u64 {
        match self.limit {
            0 => 1,
            limit => self.skip() / limit + 1,
        }
    }
}

/// Paginated result envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub docs: Vec<Document>,
    pub total_docs: u64,
    pub limit: u64,
    pub page: u64,
    pub offset: u64,
    pub total_pages: u64,
    pub has_prev_page: bool,
    pub has_next_page: bool,
}

impl Page {
    /// Build the envelope from one page of rows and the unpaginated total.
    pub fn new(docs: Vec<Document>, total_docs: u64, pagination: &Pagination) -> Self {
        let limit = pagination.limit;
        let offset = pagination.skip();
        let page = pagination.current_page();
        let total_pages = match limit {
            0 => 1,
            limit => total_docs.div_ceil(limit).max(1),
        };
        Self {
            docs,
            total_docs,
            limit,
            page,
            offset,
            total_pages,
            has_prev_page: page > 1,
            has_next_page: offset.saturating_add(limit) < total_docs,
        }
    }
}
