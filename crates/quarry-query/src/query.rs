use std::collections::BTreeMap;

use bson::{Bson, Document};
use serde::Deserialize;

use crate::error::QueryError;
use crate::match_mode::MatchMode;

/// One match condition on a single field.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyCondition {
    pub value: Bson,
    pub match_mode: MatchMode,
    pub required: bool,
    /// Sub-field matched inside array elements; only used by
    /// `arrayContainsObject`.
    pub property: Option<String>,
}

impl PropertyCondition {
    pub fn new(value: impl Into<Bson>, match_mode: MatchMode) -> Self {
        Self {
            value: value.into(),
            match_mode,
            required: false,
            property: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn on_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    /// Parse one condition document found under `field`.
    pub fn from_bson(field: &str, value: &Bson) -> Result<Self, QueryError> {
        let doc = match value {
            Bson::Document(doc) => doc,
            _ => {
                return Err(QueryError::ConditionNotADocument {
                    field: field.to_string(),
                });
            }
        };

        let value = match doc.get("value") {
            None | Some(Bson::Null) | Some(Bson::Undefined) => None,
            Some(Bson::String(s)) if s.is_empty() => None,
            Some(Bson::Array(items)) if items.is_empty() => None,
            Some(v) => Some(v.clone()),
        }
        .ok_or_else(|| QueryError::MissingValue {
            field: field.to_string(),
        })?;

        let match_mode = match doc.get("matchMode") {
            None | Some(Bson::Null) => {
                return Err(QueryError::MissingMatchMode {
                    field: field.to_string(),
                });
            }
            Some(Bson::String(s)) => s.parse::<MatchMode>().map_err(|e| {
                QueryError::UnknownMatchMode {
                    field: field.to_string(),
                    mode: e.0,
                }
            })?,
            Some(_) => return Err(invalid_type(field, "matchMode", "a string")),
        };

        let required = match doc.get("required") {
            None | Some(Bson::Null) => false,
            Some(Bson::Boolean(b)) => *b,
            Some(_) => return Err(invalid_type(field, "required", "a boolean")),
        };

        let property = match doc.get("property") {
            None | Some(Bson::Null) => None,
            Some(Bson::String(s)) => Some(s.clone()),
            Some(_) => return Err(invalid_type(field, "property", "a string")),
        };

        Ok(Self {
            value,
            match_mode,
            required,
            property,
        })
    }
}

fn invalid_type(field: &str, key: &'static str, expected: &'static str) -> QueryError {
    QueryError::InvalidFieldType {
        field: field.to_string(),
        key,
        expected,
    }
}

/// Field path to its ordered list of conditions.
///
/// Keys are kept sorted so that compiling the same query twice yields the
/// same stage layout.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Document")]
pub struct Query {
    fields: BTreeMap<String, Vec<PropertyCondition>>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, conditions: Vec<PropertyCondition>) -> Self {
        self.fields.insert(field.into(), conditions);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PropertyCondition])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parse a query from a loosely-typed value. `null` means the caller
    /// forgot the query entirely.
    pub fn from_bson(value: &Bson) -> Result<Self, QueryError> {
        match value {
            Bson::Null | Bson::Undefined => Err(QueryError::MissingQuery),
            Bson::Document(doc) => Self::from_document(doc),
            _ => Err(QueryError::NotADocument { what: "query" }),
        }
    }

    pub fn from_document(doc: &Document) -> Result<Self, QueryError> {
        let mut fields = BTreeMap::new();
        for (field, value) in doc {
            let items = match value {
                Bson::Array(items) => items,
                _ => {
                    return Err(QueryError::ConditionsNotAList {
                        field: field.clone(),
                    });
                }
            };
            let conditions = items
                .iter()
                .map(|item| PropertyCondition::from_bson(field, item))
                .collect::<Result<Vec<_>, _>>()?;
            fields.insert(field.clone(), conditions);
        }
        Ok(Self { fields })
    }
}

impl TryFrom<Document> for Query {
    type Error = QueryError;

    fn try_from(doc: Document) -> Result<Self, Self::Error> {
        Self::from_document(&doc)
    }
}

/// Free-text search across several fields.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Document")]
pub struct QuickQuery {
    pub value: String,
    pub fields: Vec<String>,
}

impl QuickQuery {
    pub fn new(value: impl Into<String>, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            value: value.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_bson(value: &Bson) -> Result<Self, QueryError> {
        match value {
            Bson::Null | Bson::Undefined => Err(QueryError::MissingQuickQuery),
            Bson::Document(doc) => Self::from_document(doc),
            _ => Err(QueryError::NotADocument {
                what: "search query",
            }),
        }
    }

    pub fn from_document(doc: &Document) -> Result<Self, QueryError> {
        let value = match doc.get("value") {
            None | Some(Bson::Null) => return Err(QueryError::EmptySearchValue),
            Some(Bson::String(s)) if s.is_empty() => return Err(QueryError::EmptySearchValue),
            Some(Bson::String(s)) => s.clone(),
            Some(_) => return Err(invalid_type("searchQuery", "value", "a string")),
        };

        let items = match doc.get("fields") {
            None | Some(Bson::Null) => return Err(QueryError::MissingSearchFields),
            Some(Bson::Array(items)) => items,
            Some(_) => return Err(QueryError::SearchFieldsNotAList),
        };

        let fields = items
            .iter()
            .enumerate()
            .map(|(index, item)| match item {
                Bson::String(s) => Ok(s.clone()),
                _ => Err(QueryError::SearchFieldNotAString { index }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { value, fields })
    }
}

impl TryFrom<Document> for QuickQuery {
    type Error = QueryError;

    fn try_from(doc: Document) -> Result<Self, Self::Error> {
        Self::from_document(&doc)
    }
}

/// One requested output field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectField {
    pub field: String,
    /// The field lives behind a `$lookup`; its first path segment names the
    /// join target.
    #[serde(default)]
    pub external_document: bool,
}

impl SelectField {
    pub fn local(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            external_document: false,
        }
    }

    pub fn external(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            external_document: true,
        }
    }

    /// First dot-separated segment of the path.
    pub fn root(&self) -> &str {
        root_segment(&self.field)
    }
}

pub(crate) fn root_segment(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Only the exact string `"desc"` sorts descending.
    pub fn from_order(order: Option<&str>) -> Self {
        match order {
            Some("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

/// Pagination parameters plus the optional filter, search and selection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaginatedQuery {
    pub limit: u64,
    pub page: Option<u64>,
    pub offset: Option<u64>,
    pub sort_key: Option<String>,
    pub sort_order: Option<String>,
    pub query: Option<Query>,
    pub search_query: Option<QuickQuery>,
    pub select: Option<Vec<SelectField>>,
}

impl PaginatedQuery {
    pub const DEFAULT_LIMIT: u64 = 10;

    pub fn sort_direction(&self) -> SortDirection {
        SortDirection::from_order(self.sort_order.as_deref())
    }

    /// Every field path referenced by the filter or the quick search.
    pub fn filter_paths(&self) -> impl Iterator<Item = &str> {
        let query = self.query.iter().flat_map(Query::paths);
        let search = self
            .search_query
            .iter()
            .flat_map(|q| q.fields.iter().map(String::as_str));
        query.chain(search)
    }
}

impl Default for PaginatedQuery {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            page: None,
            offset: None,
            sort_key: None,
            sort_order: None,
            query: None,
            search_query: None,
            select: None,
        }
    }
}
