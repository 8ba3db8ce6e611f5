use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use bson::{Document, doc};
use quarry_query::*;
use quarry_search::*;

/// Records every pipeline it is asked to run and serves a fixed row set.
struct RecordingExecutor {
    rows: Vec<Document>,
    calls: Mutex<Vec<(&'static str, Vec<Document>)>>,
}

impl RecordingExecutor {
    fn new() -> Self {
        Self {
            rows: (0..25)
                .map(|i| doc! { "name": format!("Account {i}"), "status": "open" })
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, kind: &'static str, pipeline: &[Document]) {
        self.calls.lock().unwrap().push((kind, pipeline.to_vec()));
    }

    fn calls(&self) -> Vec<(&'static str, Vec<Document>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl SearchExecutor for RecordingExecutor {
    fn aggregate(&self, pipeline: &[Document]) -> Result<Vec<Document>, SearchError> {
        self.record("aggregate", pipeline);
        Ok(self.rows.clone())
    }

    fn paginate(&self, pipeline: &[Document], pagination: &Pagination) -> Result<Page, SearchError> {
        self.record("paginate", pipeline);
        let docs = self
            .rows
            .iter()
            .skip(pagination.skip() as usize)
            .take(pagination.limit as usize)
            .cloned()
            .collect();
        Ok(Page::new(docs, self.rows.len() as u64, pagination))
    }

    fn count(&self, pipeline: &[Document]) -> Result<u64, SearchError> {
        self.record("count", pipeline);
        Ok(self.rows.len() as u64)
    }
}

/// Fails every call and counts how often it was reached.
struct FailingExecutor {
    calls: AtomicUsize,
}

#[derive(Debug, thiserror::Error)]
#[error("engine down")]
struct EngineDown;

impl SearchExecutor for FailingExecutor {
    fn aggregate(&self, _pipeline: &[Document]) -> Result<Vec<Document>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SearchError::executor(EngineDown))
    }

    fn paginate(&self, _pipeline: &[Document], _pagination: &Pagination) -> Result<Page, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SearchError::executor(EngineDown))
    }

    fn count(&self, _pipeline: &[Document]) -> Result<u64, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SearchError::executor(EngineDown))
    }
}

fn service() -> SearchService<RecordingExecutor> {
    SearchService::new(RecordingExecutor::new(), PipelineCompiler::default())
}

fn sorted_query() -> PaginatedQuery {
    PaginatedQuery {
        limit: 10,
        page: Some(3),
        sort_key: Some("name".into()),
        query: Some(Query::new().with(
            "status",
            vec![PropertyCondition::new("open", MatchMode::Equals)],
        )),
        ..Default::default()
    }
}

// ── Modes ───────────────────────────────────────────────────────

#[test]
fn paginated_search_returns_envelope() {
    let service = service();
    let outcome = service
        .run_search(&sorted_query(), &[], &ExtraConditions::none(), SearchMode::Page)
        .unwrap();

    let SearchOutcome::Page(page) = outcome else {
        panic!("expected page");
    };
    assert_eq!(page.docs.len(), 5);
    assert_eq!(page.total_docs, 25);
    assert_eq!(page.page, 3);
    assert!(!page.has_next_page);

    let calls = service.executor().calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "paginate");
    assert_eq!(calls[0].1.last(), Some(&doc! { "$sort": { "name": 1 } }));
}

#[test]
fn count_search_skips_sort() {
    let service = service();
    let outcome = service
        .run_search(&sorted_query(), &[], &ExtraConditions::none(), SearchMode::Count)
        .unwrap();
    assert_eq!(outcome, SearchOutcome::Count(SearchCount { search_count: 25 }));

    let calls = service.executor().calls();
    assert_eq!(calls[0].0, "count");
    assert!(calls[0].1.iter().all(|s| !s.contains_key("$sort")));
}

#[test]
fn raw_search_returns_all_rows() {
    let service = service();
    let outcome = service
        .run_search(&sorted_query(), &[], &ExtraConditions::none(), SearchMode::Rows)
        .unwrap();
    let SearchOutcome::Rows(rows) = outcome else {
        panic!("expected rows");
    };
    assert_eq!(rows.len(), 25);
    assert_eq!(service.executor().calls()[0].0, "aggregate");
}

// ── Delegation ──────────────────────────────────────────────────

#[test]
fn lookups_and_extras_reach_the_executor() {
    let service = service();
    let lookups = build_lookup_stage(&LookupSpec::new("departments", "deptId", "_id", "dept"), None);
    let extras = ExtraConditions::none().post(doc! { "dept.active": true });
    service
        .run_search(&PaginatedQuery::default(), &lookups, &extras, SearchMode::Rows)
        .unwrap();

    let pipeline = &service.executor().calls()[0].1;
    assert_eq!(
        pipeline,
        &vec![
            doc! { "$match": {} },
            lookups[0].clone(),
            lookups[1].clone(),
            doc! { "$match": { "dept.active": true } },
        ]
    );
}

#[test]
fn compile_errors_never_reach_the_executor() {
    let service = SearchService::new(
        FailingExecutor {
            calls: AtomicUsize::new(0),
        },
        PipelineCompiler::default(),
    );
    let query = PaginatedQuery {
        query: Some(Query::new().with(
            "age",
            vec![PropertyCondition::new(4_i32, MatchMode::Between)],
        )),
        ..Default::default()
    };
    let err = service
        .run_search(&query, &[], &ExtraConditions::none(), SearchMode::Page)
        .unwrap_err();
    assert!(err.is_invalid_request());
    assert_eq!(service.executor().calls.load(Ordering::SeqCst), 0);
}

#[test]
fn executor_errors_pass_through() {
    let service = SearchService::new(
        FailingExecutor {
            calls: AtomicUsize::new(0),
        },
        PipelineCompiler::default(),
    );
    let err = service
        .run_search(
            &PaginatedQuery::default(),
            &[],
            &ExtraConditions::none(),
            SearchMode::Count,
        )
        .unwrap_err();
    assert!(!err.is_invalid_request());
    assert_eq!(err.to_string(), "executor error: engine down");
    let SearchError::Executor(source) = err else {
        panic!("expected executor error");
    };
    assert!(source.downcast_ref::<EngineDown>().is_some());
}
