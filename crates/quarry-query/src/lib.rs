mod compile;
mod config;
mod error;
mod expression;
mod filter;
mod lookup;
mod match_mode;
mod merge;
mod pipeline;
mod projection;
mod query;
mod quick;

pub use compile::{compile_condition, is_identifier_shaped, to_identifier};
pub use config::CompilerConfig;
pub use error::QueryError;
pub use expression::{Comparison, Expression, ExtraCondition};
pub use filter::{ConditionSets, ExtraConditions, compile_filters, crosses_join};
pub use lookup::{LookupSpec, build_lookup_from_selection, build_lookup_stage};
pub use match_mode::{MatchMode, UnknownMatchMode};
pub use merge::{deep_merge, merge_optional};
pub use pipeline::PipelineCompiler;
pub use projection::build_projection;
pub use query::{PaginatedQuery, PropertyCondition, Query, QuickQuery, SelectField, SortDirection};
pub use quick::compile_quick_filter;
