use std::{fmt, str::FromStr};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Game;

/// Page size used when a page number is requested without an explicit size
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Upper bound for `per_page`
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                RepositoryError::Unavailable(err.to_string())
            }
            other => RepositoryError::Database(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid sort field: {0:?}")]
    InvalidSortField(String),

    #[error("invalid sort order: {0:?}")]
    InvalidSortOrder(String),

    #[error("malformed search parameters: {0}")]
    MalformedQuery(String),

    #[error("persistence unavailable: {0}")]
    PersistenceUnavailable(#[from] RepositoryError),
}

/// Read access to the game collection
///
/// `find_all` returns every game in default order (oldest first). `search`
/// must honor every filter of the query, break sort ties by `game_id`, and
/// apply pagination last.
#[async_trait]
pub trait GameRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Game>, RepositoryError>;

    async fn search(&self, query: &GameQuery) -> Result<Vec<Game>, RepositoryError>;

    /// Number of games matching the filters of `query`, ignoring sort and
    /// pagination
    async fn count(&self, query: &GameQuery) -> Result<u64, RepositoryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Title,
    CreatedAt,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Title => "title",
            SortField::CreatedAt => "created_at",
        }
    }
}

impl FromStr for SortField {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(SortField::Title),
            "created_at" => Ok(SortField::CreatedAt),
            _ => Err(SearchError::InvalidSortField(s.to_string())),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            _ => Err(SearchError::InvalidSortOrder(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sort {
    pub by: SortField,
    pub order: SortOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// 1-based page number
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.per_page)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }
}

/// Raw search parameters as submitted by a client
///
/// Empty strings count as "not supplied", matching what an untouched search
/// form posts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GameSearchParams {
    pub title: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl GameSearchParams {
    /// Parse a URL query string, collecting repeated `categories` keys
    /// (`categories[]` is accepted as well)
    pub fn from_query_string(query: &str) -> Result<Self, SearchError> {
        let pairs = serde_urlencoded::from_str::<Vec<(String, String)>>(query)
            .map_err(|e| SearchError::MalformedQuery(e.to_string()))?;

        let mut params = GameSearchParams::default();
        for (key, value) in pairs {
            match key.as_str() {
                "title" => params.title = Some(value),
                "categories" | "categories[]" => params.categories.push(value),
                "sort_by" => params.sort_by = Some(value),
                "sort_order" => params.sort_order = Some(value),
                "page" => params.page = parse_number("page", &value)?,
                "per_page" => params.per_page = parse_number("per_page", &value)?,
                _ => {}
            }
        }
        Ok(params)
    }
}

fn parse_number(key: &str, value: &str) -> Result<Option<u32>, SearchError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| SearchError::MalformedQuery(format!("{} must be a positive number", key)))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validated, normalized search over the game collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GameQuery {
    /// Case-insensitive substring of the title
    pub title: Option<String>,
    /// Category labels, OR-ed together
    pub categories: Vec<String>,
    pub sort: Option<Sort>,
    pub pagination: Option<Pagination>,
    /// Excludes games whose `is_visible` flag is off
    pub visible_only: bool,
}

impl GameQuery {
    pub fn from_params(params: GameSearchParams) -> Result<Self, SearchError> {
        let title = non_blank(params.title);

        let mut categories: Vec<String> = Vec::new();
        for label in params.categories {
            let label = label.trim();
            if !label.is_empty() && !categories.iter().any(|c| c == label) {
                categories.push(label.to_string());
            }
        }

        // A supplied value is always validated, but sorting only kicks in
        // when both halves are present.
        let by = non_blank(params.sort_by)
            .map(|s| s.parse::<SortField>())
            .transpose()?;
        let order = non_blank(params.sort_order)
            .map(|s| s.parse::<SortOrder>())
            .transpose()?;
        let sort = match (by, order) {
            (Some(by), Some(order)) => Some(Sort { by, order }),
            _ => None,
        };

        let pagination = if params.page.is_some() || params.per_page.is_some() {
            Some(Pagination::new(params.page, params.per_page))
        } else {
            None
        };

        Ok(GameQuery {
            title,
            categories,
            sort,
            pagination,
            visible_only: false,
        })
    }

    /// Restrict the query to games flagged visible
    pub fn visible_only(mut self) -> Self {
        self.visible_only = true;
        self
    }

    /// True when the query would return the whole collection in default order
    pub fn is_unfiltered(&self) -> bool {
        self.title.is_none()
            && self.categories.is_empty()
            && self.sort.is_none()
            && self.pagination.is_none()
            && !self.visible_only
    }
}

/// Parse raw parameters and run the search
pub async fn search_games(
    repository: &dyn GameRepository,
    params: GameSearchParams,
) -> Result<Vec<Game>, SearchError> {
    let query = GameQuery::from_params(params)?;
    execute_query(repository, &query).await
}

/// Run an already validated query
pub async fn execute_query(
    repository: &dyn GameRepository,
    query: &GameQuery,
) -> Result<Vec<Game>, SearchError> {
    let games = if query.is_unfiltered() {
        repository.find_all().await?
    } else {
        repository.search(query).await?
    };

    tracing::debug!(
        title = ?query.title,
        categories = ?query.categories,
        sort = ?query.sort,
        results = games.len(),
        "Game search completed"
    );

    Ok(games)
}

/// One page of results plus the number of matches across all pages
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub games: Vec<Game>,
    pub total: u64,
}

/// Run a query and count its matches; the count query only runs when the
/// result is paginated
pub async fn search_page(
    repository: &dyn GameRepository,
    query: &GameQuery,
) -> Result<SearchPage, SearchError> {
    let games = execute_query(repository, query).await?;
    let total = match query.pagination {
        Some(_) => repository.count(query).await?,
        None => games.len() as u64,
    };

    Ok(SearchPage { games, total })
}
