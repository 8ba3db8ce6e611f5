use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How a single property condition compares its value against a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchMode {
    Contains,
    ArrayContains,
    ArrayContainsObject,
    Between,
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Exists,
}

impl MatchMode {
    pub const ALL: [MatchMode; 11] = [
        MatchMode::Contains,
        MatchMode::ArrayContains,
        MatchMode::ArrayContainsObject,
        MatchMode::Between,
        MatchMode::Equals,
        MatchMode::NotEquals,
        MatchMode::GreaterThan,
        MatchMode::GreaterThanOrEqual,
        MatchMode::LessThan,
        MatchMode::LessThanOrEqual,
        MatchMode::Exists,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MatchMode::Contains => "contains",
            MatchMode::ArrayContains => "arrayContains",
            MatchMode::ArrayContainsObject => "arrayContainsObject",
            MatchMode::Between => "between",
            MatchMode::Equals => "equals",
            MatchMode::NotEquals => "notEquals",
            MatchMode::GreaterThan => "greaterThan",
            MatchMode::GreaterThanOrEqual => "greaterThanOrEqual",
            MatchMode::LessThan => "lessThan",
            MatchMode::LessThanOrEqual => "lessThanOrEqual",
            MatchMode::Exists => "exists",
        }
    }

    /// Array-of-objects matching inspects joined structure, so the field
    /// has to be evaluated after lookups.
    pub fn is_structural(self) -> bool {
        matches!(self, MatchMode::ArrayContainsObject)
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized match mode name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMatchMode(pub String);

impl FromStr for MatchMode {
    type Err = UnknownMatchMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MatchMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| UnknownMatchMode(s.to_string()))
    }
}
