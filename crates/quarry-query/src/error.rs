/// Errors raised while compiling a query description.
///
/// Every variant describes malformed caller input, so all of them are
/// invalid-request errors. Compilation fails atomically: no stage is
/// emitted once one of these is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("invalid request: query is required")]
    MissingQuery,

    #[error("invalid request: search query is required")]
    MissingQuickQuery,

    #[error("invalid request: {what} must be a document")]
    NotADocument { what: &'static str },

    #[error("invalid request: conditions for field `{field}` must be a list")]
    ConditionsNotAList { field: String },

    #[error("invalid request: each condition for field `{field}` must be a document")]
    ConditionNotADocument { field: String },

    #[error("invalid request: condition for field `{field}` is missing a value")]
    MissingValue { field: String },

    #[error("invalid request: condition for field `{field}` is missing a match mode")]
    MissingMatchMode { field: String },

    #[error("invalid request: unknown match mode `{mode}` for field `{field}`")]
    UnknownMatchMode { field: String, mode: String },

    #[error("invalid request: `{key}` for field `{field}` must be {expected}")]
    InvalidFieldType {
        field: String,
        key: &'static str,
        expected: &'static str,
    },

    #[error("invalid request: `between` for field `{field}` requires a list value")]
    BetweenRequiresList { field: String },

    #[error("invalid request: `between` for field `{field}` requires exactly 2 values, got {len}")]
    BetweenRequiresTwoValues { field: String, len: usize },

    #[error("invalid request: `arrayContainsObject` for field `{field}` requires a property")]
    MissingProperty { field: String },

    #[error("invalid request: unsupported value for `{mode}` on field `{field}`")]
    UnsupportedValue { field: String, mode: &'static str },

    #[error("invalid request: search value must not be empty")]
    EmptySearchValue,

    #[error("invalid request: search fields are required")]
    MissingSearchFields,

    #[error("invalid request: search fields must be a list")]
    SearchFieldsNotAList,

    #[error("invalid request: search field at index {index} must be a string")]
    SearchFieldNotAString { index: usize },
}

impl QueryError {
    /// All compiler errors are caller mistakes; there is no internal category.
    pub fn is_invalid_request(&self) -> bool {
        true
    }
}
