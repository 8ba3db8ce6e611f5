use bson::{Bson, Document, doc};
use serde::Serialize;

use crate::compile::compile_condition;
use crate::error::QueryError;
use crate::expression::{ExtraCondition, Expression};
use crate::query::{PropertyCondition, Query};

/// Caller-supplied conditions AND-ed into the pre- and/or post-join match.
///
/// The documents are opaque, so projections never see the fields they read.
/// A caller that also selects fields must select whatever its extras match
/// on, including sub-fields of a narrowed join.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtraConditions {
    pub pre: Option<ExtraCondition>,
    pub post: Option<ExtraCondition>,
}

impl ExtraConditions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn pre(mut self, doc: Document) -> Self {
        self.pre = Some(ExtraCondition::new(doc));
        self
    }

    pub fn post(mut self, doc: Document) -> Self {
        self.post = Some(ExtraCondition::new(doc));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pre.is_none() && self.post.is_none()
    }
}

/// Match conditions split around the lookup stages.
///
/// Each side is either absent or an `{ $and: [...] }` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionSets {
    pub pre_conditions: Option<Document>,
    pub post_conditions: Option<Document>,
}

impl ConditionSets {
    pub(crate) fn from_groups(pre: Vec<Expression>, post: Vec<Expression>) -> Self {
        Self {
            pre_conditions: and_list(pre),
            post_conditions: and_list(post),
        }
    }
}

fn and_list(group: Vec<Expression>) -> Option<Document> {
    if group.is_empty() {
        return None;
    }
    let members: Vec<Bson> = group
        .iter()
        .map(|e| Bson::Document(e.to_document()))
        .collect();
    Some(doc! { "$and": members })
}

/// A path with a dot reaches into a joined or nested document.
pub fn crosses_join(path: &str) -> bool {
    path.contains('.')
}

/// Compile a structured query into pre- and post-join conditions.
///
/// A field goes to the post side when its path crosses a join or any of
/// its conditions matches array-of-object structure; otherwise it is safe
/// to evaluate before the lookups.
pub fn compile_filters(
    query: Option<&Query>,
    extras: &ExtraConditions,
) -> Result<ConditionSets, QueryError> {
    let query = query.ok_or(QueryError::MissingQuery)?;

    let mut pre = Vec::new();
    let mut post = Vec::new();

    for (field, conditions) in query.iter() {
        let Some(fragment) = compile_field(field, conditions)? else {
            continue;
        };
        let structural = conditions.iter().any(|c| c.match_mode.is_structural());
        if crosses_join(field) || structural {
            tracing::debug!(field, structural, "routing filter to post-conditions");
            post.push(fragment);
        } else {
            pre.push(fragment);
        }
    }

    if let Some(extra) = &extras.pre {
        pre.push(Expression::Extra(extra.clone()));
    }
    if let Some(extra) = &extras.post {
        post.push(Expression::Extra(extra.clone()));
    }

    Ok(ConditionSets::from_groups(pre, post))
}

/// Required conditions are AND-ed, the rest OR-ed, and the two groups
/// AND-ed together. Returns `None` for a field with no conditions.
fn compile_field(
    field: &str,
    conditions: &[PropertyCondition],
) -> Result<Option<Expression>, QueryError> {
    let mut required = Vec::new();
    let mut optional = Vec::new();
    for condition in conditions {
        let expr = compile_condition(field, condition)?;
        if condition.required {
            required.push(expr);
        } else {
            optional.push(expr);
        }
    }

    let groups: Vec<Expression> = [
        (!required.is_empty()).then(|| Expression::And(required)),
        (!optional.is_empty()).then(|| Expression::Or(optional)),
    ]
    .into_iter()
    .flatten()
    .collect();

    Ok(match groups.len() {
        0 => None,
        1 => groups.into_iter().next(),
        _ => Some(Expression::And(groups)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_mode::MatchMode;

    fn equals(value: &str) -> PropertyCondition {
        PropertyCondition::new(value, MatchMode::Equals)
    }

    #[test]
    fn missing_query_is_invalid_request() {
        let err = compile_filters(None, &ExtraConditions::none()).unwrap_err();
        assert_eq!(err, QueryError::MissingQuery);
        assert!(err.is_invalid_request());
    }

    #[test]
    fn root_fields_go_pre() {
        let query = Query::new().with("status", vec![equals("open")]);
        let sets = compile_filters(Some(&query), &ExtraConditions::none()).unwrap();
        assert_eq!(
            sets.pre_conditions,
            Some(doc! { "$and": [ { "$or": [ { "status": "open" } ] } ] })
        );
        assert_eq!(sets.post_conditions, None);
    }

    #[test]
    fn dotted_fields_go_post_even_for_equals() {
        let query = Query::new().with("candidate.email", vec![equals("a@b.c")]);
        let sets = compile_filters(Some(&query), &ExtraConditions::none()).unwrap();
        assert_eq!(sets.pre_conditions, None);
        assert_eq!(
            sets.post_conditions,
            Some(doc! { "$and": [ { "$or": [ { "candidate.email": "a@b.c" } ] } ] })
        );
    }

    #[test]
    fn structural_modes_go_post() {
        let query = Query::new().with(
            "skills",
            vec![
                PropertyCondition::new("rust", MatchMode::ArrayContainsObject).on_property("name"),
                equals("x"),
            ],
        );
        let sets = compile_filters(Some(&query), &ExtraConditions::none()).unwrap();
        assert!(sets.pre_conditions.is_none());
        assert!(sets.post_conditions.is_some());
    }

    #[test]
    fn required_and_optional_groups_are_anded() {
        let query = Query::new().with(
            "status",
            vec![
                equals("open").required(),
                equals("a"),
                PropertyCondition::new("closed", MatchMode::NotEquals).required(),
                equals("b"),
            ],
        );
        let sets = compile_filters(Some(&query), &ExtraConditions::none()).unwrap();
        assert_eq!(
            sets.pre_conditions,
            Some(doc! { "$and": [ { "$and": [
                { "$and": [ { "status": "open" }, { "status": { "$ne": "closed" } } ] },
                { "$or": [ { "status": "a" }, { "status": "b" } ] },
            ] } ] })
        );
    }

    #[test]
    fn fields_without_conditions_are_skipped() {
        let query = Query::new().with("status", vec![]);
        let sets = compile_filters(Some(&query), &ExtraConditions::none()).unwrap();
        assert_eq!(sets, ConditionSets::default());
    }

    #[test]
    fn extras_are_appended_to_their_side() {
        let query = Query::new().with("status", vec![equals("open")]);
        let extras = ExtraConditions::none()
            .pre(doc! { "tenant": "t1" })
            .post(doc! { "dept.active": true });
        let sets = compile_filters(Some(&query), &extras).unwrap();
        assert_eq!(
            sets.pre_conditions,
            Some(doc! { "$and": [ { "$or": [ { "status": "open" } ] }, { "tenant": "t1" } ] })
        );
        assert_eq!(
            sets.post_conditions,
            Some(doc! { "$and": [ { "dept.active": true } ] })
        );
    }

    #[test]
    fn compile_errors_abort_the_whole_query() {
        let query = Query::new()
            .with("status", vec![equals("open")])
            .with("age", vec![PropertyCondition::new(3_i32, MatchMode::Between)]);
        assert!(compile_filters(Some(&query), &ExtraConditions::none()).is_err());
    }

    #[test]
    fn compiling_twice_is_identical() {
        let query = Query::new()
            .with("b", vec![equals("1")])
            .with("a.x", vec![equals("2")])
            .with("c", vec![equals("3")]);
        let first = compile_filters(Some(&query), &ExtraConditions::none()).unwrap();
        let second = compile_filters(Some(&query), &ExtraConditions::none()).unwrap();
        assert_eq!(first, second);
    }
}
