use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{config::AppConfig, ApiResponse, PaginatedResponse};

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

/// Standard no content response
pub fn no_content_response() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Pagination parameters for list operations
#[derive(Debug, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Page number starting at 1
    pub page: Option<u64>,
    /// Items per page
    pub per_page: Option<u64>,
}

impl PaginationParams {
    /// Page and page size with configured defaults and the page-size cap applied
    pub fn resolve(&self, config: &AppConfig) -> (u64, u64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self
            .per_page
            .unwrap_or(config.api_default_page_size)
            .clamp(1, config.api_max_page_size.max(1));
        (page, per_page)
    }
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let total_pages = if total == 0 || limit == 0 {
            0
        } else {
            (total + limit - 1) / limit
        };
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

/// Body for endpoints that take a status name
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct StatusUpdate {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".into(),
            "x".repeat(64),
            3600,
            86400,
            "127.0.0.1".into(),
            8080,
            "development".into(),
        )
    }

    #[test]
    fn pagination_defaults_and_cap() {
        let config = config();
        let (page, per_page) = PaginationParams::default().resolve(&config);
        assert_eq!(page, 1);
        assert_eq!(per_page, config.api_default_page_size);

        let params = PaginationParams {
            page: Some(0),
            per_page: Some(10_000),
        };
        assert_eq!(params.resolve(&config), (1, config.api_max_page_size));
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = PaginatedResponse::new(vec![1, 2, 3], 41, 1, 20);
        assert_eq!(page.total_pages, 3);
        assert_eq!(PaginatedResponse::<i32>::new(vec![], 0, 1, 20).total_pages, 0);
    }
}
