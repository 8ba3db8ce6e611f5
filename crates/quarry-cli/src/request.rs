use bson::Document;
use quarry_query::{
    ExtraConditions, LookupSpec, PaginatedQuery, PipelineCompiler, QueryError,
    build_lookup_from_selection,
};
use serde::Deserialize;

/// One join, possibly with joins of its own.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupRequest {
    pub from: String,
    pub local_field: String,
    pub foreign_field: String,
    #[serde(rename = "as")]
    pub as_field: String,
    #[serde(default)]
    pub lookups: Vec<LookupRequest>,
    #[serde(default)]
    pub is_array: bool,
}

impl LookupRequest {
    /// Build this join and its nested joins, each narrowed to the fields
    /// the query needs under its own path prefix.
    fn build(&self, query: &PaginatedQuery, prefix: &str) -> Vec<Document> {
        let nested = self
            .lookups
            .iter()
            .flat_map(|n| n.build(query, &format!("{prefix}{}.", n.as_field)))
            .collect();
        let mut spec = LookupSpec::new(
            self.from.as_str(),
            self.local_field.as_str(),
            self.foreign_field.as_str(),
            self.as_field.as_str(),
        )
        .with_pipeline(nested);
        spec.is_array = self.is_array;
        build_lookup_from_selection(&spec, Some(query), Some(prefix))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileRequest {
    #[serde(default)]
    pub query: PaginatedQuery,
    /// Joins built from the selection.
    #[serde(default)]
    pub lookups: Vec<LookupRequest>,
    /// Pre-built stages inserted verbatim after `lookups`.
    #[serde(default)]
    pub stages: Vec<Document>,
    pub extra_pre: Option<Document>,
    pub extra_post: Option<Document>,
    #[serde(default)]
    pub skip_sort: bool,
}

impl CompileRequest {
    pub fn compile(&self, compiler: &PipelineCompiler) -> Result<Vec<Document>, QueryError> {
        let mut lookups: Vec<Document> = self
            .lookups
            .iter()
            .flat_map(|l| l.build(&self.query, &format!("{}.", l.as_field)))
            .collect();
        lookups.extend(self.stages.iter().cloned());

        let extras = ExtraConditions {
            pre: self.extra_pre.clone().map(Into::into),
            post: self.extra_post.clone().map(Into::into),
        };
        compiler.build_pipeline(&self.query, &lookups, &extras, self.skip_sort)
    }
}

/// Render stages as extended JSON, so object ids and dates survive.
pub fn to_json(pipeline: &[Document]) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(pipeline)
}
