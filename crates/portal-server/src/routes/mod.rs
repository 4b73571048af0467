//! HTTP routes, one module per resource.
//!
//! Each module exposes a `router()` and keeps its wire types
//! (`*Request`/`*Response`) next to the handlers. Responses are mapped
//! from domain models with explicit `From` impls.

pub mod assets;
pub mod auth;
pub mod files;
pub mod health;
pub mod jobs;
pub mod referrals;
pub mod users;

use axum::Router;
use portal_core::repository::{PaginatedResult, Pagination};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

const MAX_PAGE_SIZE: u64 = 200;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest(
            "/api",
            Router::new()
                .merge(health::api_router())
                .nest("/auth", auth::router())
                .nest("/users", users::router())
                .nest("/jobs", jobs::router())
                .nest("/referrals", referrals::router())
                .nest("/assets", assets::router())
                .nest("/files", files::router()),
        )
}

/// `?offset=&limit=` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl PageQuery {
    pub fn pagination(&self) -> Pagination {
        let default = Pagination::default();
        Pagination {
            offset: self.offset.unwrap_or(default.offset),
            limit: self.limit.unwrap_or(default.limit).clamp(1, MAX_PAGE_SIZE),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

impl<T> From<PaginatedResult<T>> for PageResponse<T> {
    fn from(page: PaginatedResult<T>) -> Self {
        Self {
            items: page.items,
            total: page.total,
            offset: page.offset,
            limit: page.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_clamped() {
        let query = PageQuery {
            offset: None,
            limit: Some(10_000),
        };
        assert_eq!(query.pagination().limit, MAX_PAGE_SIZE);

        let zero = PageQuery {
            offset: Some(5),
            limit: Some(0),
        };
        let pagination = zero.pagination();
        assert_eq!(pagination.limit, 1);
        assert_eq!(pagination.offset, 5);
    }

    #[test]
    fn defaults_match_repository_defaults() {
        let pagination = PageQuery::default().pagination();
        assert_eq!(pagination.offset, 0);
        assert_eq!(pagination.limit, 50);
    }
}
