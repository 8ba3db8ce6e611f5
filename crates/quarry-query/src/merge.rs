use bson::{Bson, Document};

/// Recursively merge `right` into a copy of `left`.
///
/// - document + document: merged key by key
/// - array + array: concatenated, `left` first
/// - anything else: the value from `right` wins
///
/// Arrays concatenate so that two `{ $and: [...] }` condition sets combine
/// into one `$and` holding every member of both.
pub fn deep_merge(left: &Document, right: &Document) -> Document {
    let mut merged = left.clone();
    for (key, value) in right {
        let combined = match (merged.get(key), value) {
            (Some(Bson::Document(l)), Bson::Document(r)) => Bson::Document(deep_merge(l, r)),
            (Some(Bson::Array(l)), Bson::Array(r)) => {
                Bson::Array(l.iter().chain(r.iter()).cloned().collect())
            }
            _ => value.clone(),
        };
        merged.insert(key.clone(), combined);
    }
    merged
}

/// Merge two optional documents; absent sides are treated as empty.
pub fn merge_optional(left: Option<&Document>, right: Option<&Document>) -> Option<Document> {
    match (left, right) {
        (None, None) => None,
        (Some(d), None) | (None, Some(d)) => Some(d.clone()),
        (Some(l), Some(r)) => Some(deep_merge(l, r)),
    }
}
