//! Search: declarative filtering and the query pipeline.

pub mod filter;
pub mod query;

pub use filter::{
    FilterGroup, FilterNode, FilterOperator, LogicalOperator, MetadataFilter, SearchFilters,
};
pub use query::{QueryMatch, QueryResponse, MAX_K};
