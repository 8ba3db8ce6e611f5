use crate::error::QueryError;
use crate::expression::Expression;
use crate::filter::{ConditionSets, ExtraConditions, crosses_join};
use crate::query::QuickQuery;

/// Compile a free-text search into pre- and post-join conditions.
///
/// The search is an OR of case-insensitive regex matches, one per field.
/// Routing is all-or-nothing: if any field crosses a join, the whole OR
/// group runs after the lookups.
pub fn compile_quick_filter(
    quick: Option<&QuickQuery>,
    extras: &ExtraConditions,
) -> Result<ConditionSets, QueryError> {
    let quick = quick.ok_or(QueryError::MissingQuickQuery)?;
    if quick.value.is_empty() {
        return Err(QueryError::EmptySearchValue);
    }

    let mut pre = Vec::new();
    let mut post = Vec::new();

    if quick.fields.is_empty() {
        tracing::debug!("quick search has no fields; no search condition emitted");
    } else {
        let search = Expression::Or(
            quick
                .fields
                .iter()
                .map(|field| Expression::Regex(field.clone(), quick.value.clone()))
                .collect(),
        );
        if quick.fields.iter().any(|f| crosses_join(f)) {
            tracing::debug!(fields = quick.fields.len(), "routing quick search to post-conditions");
            post.push(search);
        } else {
            pre.push(search);
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

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn missing_quick_query_is_invalid_request() {
        let err = compile_quick_filter(None, &ExtraConditions::none()).unwrap_err();
        assert_eq!(err, QueryError::MissingQuickQuery);
        assert!(err.is_invalid_request());
    }

    #[test]
    fn empty_value_is_rejected() {
        let quick = QuickQuery::new("", ["name"]);
        assert_eq!(
            compile_quick_filter(Some(&quick), &ExtraConditions::none()),
            Err(QueryError::EmptySearchValue)
        );
    }

    #[test]
    fn root_fields_are_ored_before_lookups() {
        let quick = QuickQuery::new("ann", ["name", "email"]);
        let sets = compile_quick_filter(Some(&quick), &ExtraConditions::none()).unwrap();
        assert_eq!(
            sets.pre_conditions,
            Some(doc! { "$and": [ { "$or": [
                { "name": { "$regex": "ann", "$options": "i" } },
                { "email": { "$regex": "ann", "$options": "i" } },
            ] } ] })
        );
        assert_eq!(sets.post_conditions, None);
    }

    #[test]
    fn one_joined_field_moves_every_field_post() {
        let quick = QuickQuery::new("ann", ["email", "profile.name"]);
        let sets = compile_quick_filter(Some(&quick), &ExtraConditions::none()).unwrap();
        assert_eq!(sets.pre_conditions, None);
        assert_eq!(
            sets.post_conditions,
            Some(doc! { "$and": [ { "$or": [
                { "email": { "$regex": "ann", "$options": "i" } },
                { "profile.name": { "$regex": "ann", "$options": "i" } },
            ] } ] })
        );
    }

    #[test]
    fn extras_are_anded_alongside_the_search() {
        let quick = QuickQuery::new("ann", ["name"]);
        let extras = ExtraConditions::none().pre(doc! { "tenant": "t1" });
        let sets = compile_quick_filter(Some(&quick), &extras).unwrap();
        assert_eq!(
            sets.pre_conditions,
            Some(doc! { "$and": [
                { "$or": [ { "name": { "$regex": "ann", "$options": "i" } } ] },
                { "tenant": "t1" },
            ] })
        );
    }

    #[test]
    fn no_fields_yields_only_extras() {
        let quick = QuickQuery::new("ann", Vec::<String>::new());
        let extras = ExtraConditions::none().post(doc! { "x": 1 });
        let sets = compile_quick_filter(Some(&quick), &extras).unwrap();
        assert_eq!(sets.pre_conditions, None);
        assert_eq!(sets.post_conditions, Some(doc! { "$and": [ { "x": 1 } ] }));
    }
}
