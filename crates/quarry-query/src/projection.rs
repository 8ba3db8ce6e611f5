use bson::{Bson, Document, doc};

use crate::config::CompilerConfig;
use crate::lookup::lookup_local_fields;
use crate::query::{PaginatedQuery, SelectField, root_segment};

/// Derive the top-level `$project` stage from the query's selection.
///
/// The projection runs before any stage in `pipeline`, so besides the
/// selected fields it keeps whatever those stages still read: lookup
/// `localField`s, the roots of filter and search paths, and the sort key.
/// Fields read only by [`ExtraConditions`](crate::ExtraConditions) are not
/// kept. Returns no stage when nothing is selected.
pub fn build_projection(
    config: &CompilerConfig,
    query: Option<&PaginatedQuery>,
    pipeline: &[Document],
) -> Vec<Document> {
    let Some(query) = query else {
        return Vec::new();
    };
    let Some(select) = query.select.as_deref() else {
        return Vec::new();
    };

    let (external, local): (Vec<_>, Vec<_>) = select.iter().partition(|s| s.external_document);

    let local = local.into_iter().map(|s| s.field.as_str());
    let joins = external.into_iter().map(SelectField::root);
    let always = config.always_projected.iter().map(String::as_str);
    let join_keys = lookup_local_fields(pipeline);
    let filters = query.filter_paths().map(root_segment);
    let sort = query.sort_key.as_deref().map(root_segment);

    let fields = collapse_paths(
        local
            .chain(joins)
            .chain(always)
            .chain(join_keys)
            .chain(filters)
            .chain(sort)
            .map(str::to_string),
    );
    tracing::debug!(fields = fields.len(), "built top-level projection");

    vec![doc! { "$project": projection_document(&fields) }]
}

/// `{ field: 1, ... }` inclusion projection.
pub(crate) fn projection_document(fields: &[String]) -> Document {
    fields.iter().map(|f| (f.clone(), Bson::Int32(1))).collect()
}

/// Deduplicate paths, keeping first-seen order, and drop any path whose
/// ancestor is also present. MongoDB rejects projections that name both
/// `a` and `a.b`.
pub(crate) fn collapse_paths(paths: impl IntoIterator<Item = impl Into<String>>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for path in paths {
        let path = path.into();
        if !path.is_empty() && !unique.contains(&path) {
            unique.push(path);
        }
    }
    unique
        .iter()
        .filter(|path| !unique.iter().any(|other| is_ancestor(other, path)))
        .cloned()
        .collect()
}

fn is_ancestor(ancestor: &str, path: &str) -> bool {
    path.strip_prefix(ancestor)
        .is_some_and(|rest| rest.starts_with('.'))
}
