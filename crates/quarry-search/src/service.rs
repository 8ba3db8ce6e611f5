use bson::Document;
use quarry_query::{ExtraConditions, PaginatedQuery, PipelineCompiler};
use serde::Serialize;

use crate::error::SearchError;
use crate::executor::{Page, Pagination, SearchExecutor};

/// What a search returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchMode {
    /// Paginated envelope.
    #[default]
    Page,
    /// Only the number of matching rows.
    Count,
    /// Every matching row, unpaginated.
    Rows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCount {
    pub search_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SearchOutcome {
    Page(Page),
    Count(SearchCount),
    Rows(Vec<Document>),
}

pub struct SearchService<E: SearchExecutor> {
    executor: E,
    compiler: PipelineCompiler,
}

impl<E: SearchExecutor> SearchService<E> {
    pub fn new(executor: E, compiler: PipelineCompiler) -> Self {
        Self { executor, compiler }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn compiler(&self) -> &PipelineCompiler {
        &self.compiler
    }

    /// Compile `query` and hand the pipeline to the executor.
    ///
    /// Counting skips the `$sort` stage. Compile errors are returned before
    /// the executor is touched.
    pub fn run_search(
        &self,
        query: &PaginatedQuery,
        lookups: &[Document],
        extras: &ExtraConditions,
        mode: SearchMode,
    ) -> Result<SearchOutcome, SearchError> {
        let skip_sort = mode == SearchMode::Count;
        let pipeline = self
            .compiler
            .build_pipeline(query, lookups, extras, skip_sort)?;
        tracing::debug!(?mode, stages = pipeline.len(), "running search");

        match mode {
            SearchMode::Count => {
                let search_count = self.executor.count(&pipeline)?;
                Ok(SearchOutcome::Count(SearchCount { search_count }))
            }
            SearchMode::Rows => Ok(SearchOutcome::Rows(self.executor.aggregate(&pipeline)?)),
            SearchMode::Page => {
                let pagination = Pagination::from_query(query);
                Ok(SearchOutcome::Page(
                    self.executor.paginate(&pipeline, &pagination)?,
                ))
            }
        }
    }
}
