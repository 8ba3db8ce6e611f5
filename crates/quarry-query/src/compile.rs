use bson::Bson;
use bson::oid::ObjectId;

use crate::error::QueryError;
use crate::expression::{Comparison, Expression};
use crate::match_mode::MatchMode;
use crate::query::PropertyCondition;

/// Compile one condition on `field` into an expression.
///
/// List values OR one fragment per element for every mode except
/// `between`, `arrayContains` and `arrayContainsObject`, which consume the
/// list as a whole.
pub fn compile_condition(field: &str, condition: &PropertyCondition) -> Result<Expression, QueryError> {
    let value = &condition.value;
    match condition.match_mode {
        MatchMode::Contains => each_value(value, |v| {
            let pattern = regex_pattern(field, v)?;
            Ok(Expression::Regex(field.to_string(), pattern))
        }),
        MatchMode::Equals => each_value(value, |v| {
            Ok(Expression::Eq(field.to_string(), to_identifier(v)))
        }),
        MatchMode::NotEquals => compare(field, Comparison::Ne, value),
        MatchMode::GreaterThan => compare(field, Comparison::Gt, value),
        MatchMode::GreaterThanOrEqual => compare(field, Comparison::Gte, value),
        MatchMode::LessThan => compare(field, Comparison::Lt, value),
        MatchMode::LessThanOrEqual => compare(field, Comparison::Lte, value),
        MatchMode::Exists => compare(field, Comparison::Exists, value),
        MatchMode::Between => between(field, value),
        MatchMode::ArrayContains => Ok(Expression::In(field.to_string(), identifier_list(value))),
        MatchMode::ArrayContainsObject => {
            let property = condition
                .property
                .as_deref()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| QueryError::MissingProperty {
                    field: field.to_string(),
                })?;
            Ok(Expression::ElemMatch(
                field.to_string(),
                property.to_string(),
                identifier_list(value),
            ))
        }
    }
}

/// Scalar → single fragment, list → OR of per-element fragments.
fn each_value(
    value: &Bson,
    mut compile: impl FnMut(&Bson) -> Result<Expression, QueryError>,
) -> Result<Expression, QueryError> {
    match value {
        Bson::Array(items) => Ok(Expression::Or(
            items.iter().map(compile).collect::<Result<Vec<_>, _>>()?,
        )),
        scalar => compile(scalar),
    }
}

fn compare(field: &str, op: Comparison, value: &Bson) -> Result<Expression, QueryError> {
    each_value(value, |v| Ok(Expression::Compare(field.to_string(), op, v.clone())))
}

fn between(field: &str, value: &Bson) -> Result<Expression, QueryError> {
    let items = match value {
        Bson::Array(items) => items,
        _ => {
            return Err(QueryError::BetweenRequiresList {
                field: field.to_string(),
            });
        }
    };
    let [lower, upper] = items.as_slice() else {
        return Err(QueryError::BetweenRequiresTwoValues {
            field: field.to_string(),
            len: items.len(),
        });
    };
    if looks_reversed(lower, upper) {
        tracing::warn!(field, %lower, %upper, "between bounds look reversed; range will match nothing");
    }
    Ok(Expression::Range(
        field.to_string(),
        lower.clone(),
        upper.clone(),
    ))
}

fn looks_reversed(lower: &Bson, upper: &Bson) -> bool {
    match (as_number(lower), as_number(upper)) {
        (Some(l), Some(u)) => l > u,
        _ => match (lower, upper) {
            (Bson::DateTime(l), Bson::DateTime(u)) => l > u,
            (Bson::String(l), Bson::String(u)) => l > u,
            _ => false,
        },
    }
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

fn regex_pattern(field: &str, value: &Bson) -> Result<String, QueryError> {
    match value {
        Bson::String(s) => Ok(s.clone()),
        Bson::Int32(n) => Ok(n.to_string()),
        Bson::Int64(n) => Ok(n.to_string()),
        // Numbers match literally; a decimal point is not a wildcard.
        Bson::Double(n) => Ok(n.to_string().replace('.', r"\.")),
        _ => Err(QueryError::UnsupportedValue {
            field: field.to_string(),
            mode: MatchMode::Contains.as_str(),
        }),
    }
}

fn identifier_list(value: &Bson) -> Vec<Bson> {
    match value {
        Bson::Array(items) => items.iter().map(to_identifier).collect(),
        scalar => vec![to_identifier(scalar)],
    }
}

/// Whether `s` has the shape of a database identifier: non-empty, even
/// length, hex digits only. Deliberately loose; see [`to_identifier`].
pub fn is_identifier_shaped(s: &str) -> bool {
    !s.is_empty() && s.len() % 2 == 0 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Convert identifier-shaped strings to `ObjectId`; everything else is
/// returned unchanged.
///
/// A shaped string that does not parse as an `ObjectId` (anything but 24
/// hex digits) stays a plain string.
pub fn to_identifier(value: &Bson) -> Bson {
    match value {
        Bson::String(s) if is_identifier_shaped(s) => match ObjectId::parse_str(s) {
            Ok(oid) => Bson::ObjectId(oid),
            Err(_) => {
                tracing::debug!(value = %s, "hex-shaped value is not an object id; matching literally");
                value.clone()
            }
        },
        _ => value.clone(),
    }
}
