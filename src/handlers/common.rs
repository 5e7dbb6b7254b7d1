use crate::config::AppConfig;
use crate::errors::ApiError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;
use validator::Validate;

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ApiError> {
    input
        .validate()
        .map_err(|e| ApiError::ValidationError(format!("Validation failed: {}", e)))
}

/// Pagination parameters for list operations
#[derive(Debug, Default, Clone, Deserialize, Serialize, IntoParams)]
pub struct PaginationParams {
    /// Page number, starting at 1
    pub page: Option<u64>,
    /// Items per page, capped by configuration
    pub per_page: Option<u64>,
}

impl PaginationParams {
    /// Resolves to `(page, per_page)` using the configured default and cap.
    pub fn resolve(&self, config: &AppConfig) -> (u64, u64) {
        resolve_page(self.page, self.per_page, config)
    }
}

pub(crate) fn resolve_page(
    page: Option<u64>,
    per_page: Option<u64>,
    config: &AppConfig,
) -> (u64, u64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page
        .unwrap_or(config.api_default_page_size)
        .clamp(1, config.api_max_page_size.max(1));
    (page, per_page)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".into(),
            "127.0.0.1".into(),
            8080,
            "development".into(),
        );
        cfg.api_default_page_size = 20;
        cfg.api_max_page_size = 50;
        cfg
    }

    #[test]
    fn pagination_defaults_and_caps() {
        let cfg = config();
        assert_eq!(PaginationParams::default().resolve(&cfg), (1, 20));
        assert_eq!(
            PaginationParams {
                page: Some(0),
                per_page: Some(500)
            }
            .resolve(&cfg),
            (1, 50)
        );
        assert_eq!(
            PaginationParams {
                page: Some(3),
                per_page: Some(0)
            }
            .resolve(&cfg),
            (3, 1)
        );
    }
}
