use bson::{Document, doc};

use crate::config::CompilerConfig;
use crate::error::QueryError;
use crate::filter::{ConditionSets, ExtraConditions, compile_filters};
use crate::merge::merge_optional;
use crate::projection::build_projection;
use crate::query::PaginatedQuery;
use crate::quick::compile_quick_filter;

/// Turns a [`PaginatedQuery`] into an aggregation pipeline.
///
/// Stage order: `$project`, `$match` (pre-join), the caller's lookup
/// stages, `$match` (post-join), `$sort`.
#[derive(Debug, Clone, Default)]
pub struct PipelineCompiler {
    config: CompilerConfig,
}

impl PipelineCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn build_pipeline(
        &self,
        query: &PaginatedQuery,
        lookups: &[Document],
        extras: &ExtraConditions,
        skip_sort: bool,
    ) -> Result<Vec<Document>, QueryError> {
        let conditions = self.merged_conditions(query, extras)?;

        let mut stages = Vec::with_capacity(lookups.len() + 3);
        stages.push(doc! { "$match": conditions.pre_conditions.unwrap_or_default() });
        stages.extend(lookups.iter().cloned());
        stages.push(doc! { "$match": conditions.post_conditions.unwrap_or_default() });

        if !skip_sort {
            if let Some(key) = query.sort_key.as_deref().filter(|k| !k.is_empty()) {
                stages.push(doc! { "$sort": { key: query.sort_direction().as_i32() } });
            }
        }

        let mut pipeline = self.build_projection(Some(query), &stages);
        pipeline.extend(stages);
        tracing::debug!(stages = pipeline.len(), lookups = lookups.len(), "compiled pipeline");
        Ok(pipeline)
    }

    /// See [`build_projection`](crate::projection::build_projection).
    pub fn build_projection(
        &self,
        query: Option<&PaginatedQuery>,
        pipeline: &[Document],
    ) -> Vec<Document> {
        build_projection(&self.config, query, pipeline)
    }

    /// Filter and quick-search conditions merged side by side.
    ///
    /// Extras go to exactly one assembler so they are not duplicated; with
    /// neither a filter nor a search they are used as the conditions
    /// themselves.
    fn merged_conditions(
        &self,
        query: &PaginatedQuery,
        extras: &ExtraConditions,
    ) -> Result<ConditionSets, QueryError> {
        match (query.query.as_ref(), query.search_query.as_ref()) {
            (None, None) => Ok(ConditionSets {
                pre_conditions: extras.pre.clone().map(|e| e.into_document()),
                post_conditions: extras.post.clone().map(|e| e.into_document()),
            }),
            (Some(filters), None) => compile_filters(Some(filters), extras),
            (None, Some(search)) => compile_quick_filter(Some(search), extras),
            (Some(filters), Some(search)) => {
                let filters = compile_filters(Some(filters), extras)?;
                let search = compile_quick_filter(Some(search), &ExtraConditions::none())?;
                Ok(ConditionSets {
                    pre_conditions: merge_optional(
                        filters.pre_conditions.as_ref(),
                        search.pre_conditions.as_ref(),
                    ),
                    post_conditions: merge_optional(
                        filters.post_conditions.as_ref(),
                        search.post_conditions.as_ref(),
                    ),
                })
            }
        }
    }
}
