//! Query construction: raw parameters, validation, and visibility rules.

mod builder;
mod params;
mod terms;
mod types;
mod visibility;

pub use builder::{parse_category, QuerySpecBuilder};
pub use params::{parse_page, ListingSurface, SearchParams, SearchRequest};
pub use terms::{search_tokens, tokenize, MIN_TOKEN_CHARS};
pub use types::{CategoryScope, QualityFilter, QuerySpec, SortKey, SortOrder};
pub use visibility::{VisibilityFilter, VisibilityPolicy};
