//! Game catalog: search, slugs and form rules

#[cfg(test)]
pub mod memory;
pub mod search;
pub mod slug;
pub mod validation;

pub use search::{
    execute_query, search_games, search_page, GameQuery, GameRepository, GameSearchParams,
    Pagination, RepositoryError, SearchError, SearchPage, Sort, SortField, SortOrder,
};
pub use slug::{is_variant_of, slugify, unique_slug};
pub use validation::{FieldError, GameForm, ValidatedGame};
