use bson::{Bson, Document, doc};

/// Comparison operators that take a single operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Exists,
}

impl Comparison {
    pub fn operator(self) -> &'static str {
        match self {
            Comparison::Ne => "$ne",
            Comparison::Gt => "$gt",
            Comparison::Gte => "$gte",
            Comparison::Lt => "$lt",
            Comparison::Lte => "$lte",
            Comparison::Exists => "$exists",
        }
    }
}

/// A condition document supplied by the caller. The compiler never looks
/// inside it; it is only ever AND-ed in as a whole.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtraCondition(Document);

impl ExtraCondition {
    pub fn new(doc: Document) -> Self {
        Self(doc)
    }

    pub fn as_document(&self) -> &Document {
        &self.0
    }

    pub fn into_document(self) -> Document {
        self.0
    }
}

impl From<Document> for ExtraCondition {
    fn from(doc: Document) -> Self {
        Self(doc)
    }
}

/// Boolean expression tree for match conditions.
///
/// Renders to a MongoDB `$match` filter with [`Expression::to_document`].
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// `{ field: value }`
    Eq(String, Bson),
    /// `{ field: { <op>: value } }`
    Compare(String, Comparison, Bson),
    /// Case-insensitive `{ field: { $regex, $options: "i" } }`
    Regex(String, String),
    /// Inclusive `{ field: { $gte: lower, $lte: upper } }`
    Range(String, Bson, Bson),
    /// `{ field: { $in: [...] } }`
    In(String, Vec<Bson>),
    /// `{ field: { $elemMatch: { property: { $in: [...] } } } }`
    ElemMatch(String, String, Vec<Bson>),
    And(Vec<Expression>),
    Or(Vec<Expression>),
    Extra(ExtraCondition),
}

impl Expression {
    pub fn to_document(&self) -> Document {
        match self {
            Expression::Eq(field, value) => doc! { field.as_str(): value.clone() },
            Expression::Compare(field, op, value) => {
                doc! { field.as_str(): { op.operator(): value.clone() } }
            }
            Expression::Regex(field, pattern) => {
                doc! { field.as_str(): { "$regex": pattern.as_str(), "$options": "i" } }
            }
            Expression::Range(field, lower, upper) => {
                doc! { field.as_str(): { "$gte": lower.clone(), "$lte": upper.clone() } }
            }
            Expression::In(field, values) => {
                doc! { field.as_str(): { "$in": values.clone() } }
            }
            Expression::ElemMatch(field, property, values) => doc! {
                field.as_str(): { "$elemMatch": { property.as_str(): { "$in": values.clone() } } }
            },
            // An empty group is always true.
            Expression::And(children) if children.is_empty() => Document::new(),
            Expression::Or(children) if children.is_empty() => Document::new(),
            Expression::And(children) => doc! { "$and": render_all(children) },
            Expression::Or(children) => doc! { "$or": render_all(children) },
            Expression::Extra(extra) => extra.as_document().clone(),
        }
    }
}

fn render_all(children: &[Expression]) -> Vec<Bson> {
    children
        .iter()
        .map(|c| Bson::Document(c.to_document()))
        .collect()
}
