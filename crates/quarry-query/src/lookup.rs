use bson::{Bson, Document, doc};

use crate::projection::{collapse_paths, projection_document};
use crate::query::{PaginatedQuery, root_segment};

/// Describes one `$lookup` join.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupSpec {
    pub from: String,
    pub local_field: String,
    pub foreign_field: String,
    /// Name the joined value is stored under.
    pub as_field: String,
    /// Stages run inside the join, e.g. further nested lookups.
    pub pipeline: Vec<Document>,
    /// Keep the joined value as an array instead of flattening it to the
    /// first element.
    pub is_array: bool,
}

impl LookupSpec {
    pub fn new(
        from: impl Into<String>,
        local_field: impl Into<String>,
        foreign_field: impl Into<String>,
        as_field: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            local_field: local_field.into(),
            foreign_field: foreign_field.into(),
            as_field: as_field.into(),
            pipeline: Vec::new(),
            is_array: false,
        }
    }

    pub fn with_pipeline(mut self, pipeline: Vec<Document>) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn array(mut self) -> Self {
        self.is_array = true;
        self
    }
}

/// Build the stages for one join.
///
/// The nested pipeline runs first, then the optional `$project`. Unless the
/// join is array-valued, a `$set` replaces the joined array with its first
/// element.
pub fn build_lookup_stage(spec: &LookupSpec, projection: Option<&[String]>) -> Vec<Document> {
    let mut lookup = doc! {
        "from": spec.from.as_str(),
        "localField": spec.local_field.as_str(),
        "foreignField": spec.foreign_field.as_str(),
        "as": spec.as_field.as_str(),
    };

    let mut pipeline: Vec<Bson> = spec.pipeline.iter().cloned().map(Bson::Document).collect();
    if let Some(fields) = projection.filter(|f| !f.is_empty()) {
        pipeline.push(Bson::Document(doc! { "$project": projection_document(fields) }));
    }
    if !pipeline.is_empty() {
        lookup.insert("pipeline", pipeline);
    }

    let mut stages = vec![doc! { "$lookup": lookup }];
    if !spec.is_array {
        stages.push(doc! {
            "$set": {
                spec.as_field.as_str(): {
                    "$arrayElemAt": [format!("${}", spec.as_field), 0]
                }
            }
        });
    }
    stages
}

/// Build a join whose inner projection keeps only what the query needs.
///
/// `prefix` defaults to `"<as>."`; nested joins pass their full path, e.g.
/// `"dept.manager."`. Without a selection the join passes every field
/// through.
pub fn build_lookup_from_selection(
    spec: &LookupSpec,
    query: Option<&PaginatedQuery>,
    prefix: Option<&str>,
) -> Vec<Document> {
    let prefix = prefix
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}.", spec.as_field));
    let fields = query
        .map(|q| selected_sub_fields(spec, q, &prefix))
        .unwrap_or_default();
    tracing::debug!(join = %spec.as_field, fields = fields.len(), "narrowing lookup projection");
    build_lookup_stage(spec, Some(fields.as_slice()))
}

/// Sub-fields of the joined document named by the selection, a filter or
/// the sort key.
fn selected_sub_fields(spec: &LookupSpec, query: &PaginatedQuery, prefix: &str) -> Vec<String> {
    let Some(select) = query.select.as_deref() else {
        return Vec::new();
    };
    let whole = prefix.trim_end_matches('.');
    if select.iter().any(|s| s.field == whole) {
        return Vec::new();
    }

    let nested: Vec<&str> = lookup_targets(&spec.pipeline).collect();

    let paths = select
        .iter()
        .map(|s| s.field.as_str())
        .chain(query.filter_paths())
        .chain(query.sort_key.as_deref())
        .filter_map(|path| path.strip_prefix(prefix))
        .filter(|suffix| !suffix.is_empty())
        .map(|suffix| {
            let first = root_segment(suffix);
            if nested.contains(&first) {
                first.to_string()
            } else {
                suffix.to_string()
            }
        });

    collapse_paths(paths)
}

/// `as` names of the `$lookup` stages in `pipeline`.
pub(crate) fn lookup_targets(pipeline: &[Document]) -> impl Iterator<Item = &str> {
    lookups(pipeline).filter_map(|l| l.get_str("as").ok())
}

/// `localField`s of the `$lookup` stages in `pipeline`.
pub(crate) fn lookup_local_fields(pipeline: &[Document]) -> impl Iterator<Item = &str> {
    lookups(pipeline).filter_map(|l| l.get_str("localField").ok())
}

fn lookups(pipeline: &[Document]) -> impl Iterator<Item = &Document> {
    pipeline
        .iter()
        .filter_map(|stage| stage.get_document("$lookup").ok())
}
