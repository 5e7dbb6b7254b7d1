pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        let services = handlers::AppServices::new(db.clone(), Arc::new(event_sender.clone()));
        Self {
            db,
            config,
            event_sender,
            services,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[tokio::test]
    async fn error_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-err"), async {
                ApiResponse::<()>::error("oops".into())
            })
            .await;

        assert!(!response.success);
        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-err"));
    }
}

/// Routes mounted under `/api/v1`
pub fn api_v1_routes() -> Router<AppState> {
    let trays = Router::new()
        .route(
            "/trays",
            get(handlers::trays::list_trays).post(handlers::trays::register_tray),
        )
        .route(
            "/trays/:tray_id",
            get(handlers::trays::get_tray)
                .put(handlers::trays::update_tray)
                .delete(handlers::trays::delete_tray),
        )
        .route("/trays/:tray_id/detail", get(handlers::trays::get_tray_detail))
        .route(
            "/trays/:tray_id/capacity",
            post(handlers::trays::reconfigure_capacity),
        )
        .route("/trays/:tray_id/summary", get(handlers::trays::tray_summary));

    let slots = Router::new()
        .route(
            "/trays/:tray_id/slots/initialize",
            post(handlers::slots::initialize_slots),
        )
        .route("/trays/:tray_id/slots", get(handlers::slots::list_slots))
        .route(
            "/trays/:tray_id/slots/first-available",
            get(handlers::slots::first_available_slot),
        )
        .route(
            "/trays/:tray_id/slots/:slot_index",
            get(handlers::slots::get_slot).put(handlers::slots::place_item),
        )
        .route(
            "/trays/:tray_id/slots/:slot_index/clear",
            post(handlers::slots::clear_slot),
        )
        .route("/trays/:tray_id/clear", post(handlers::slots::clear_tray));

    let locations = Router::new()
        .route(
            "/items/:item_id/locations",
            get(handlers::locations::item_locations),
        )
        .route(
            "/reports/slots/:status",
            get(handlers::locations::slots_by_status),
        );

    let admin = Router::new()
        .route("/admin/slots", get(handlers::locations::list_all_slots))
        .route(
            "/admin/slots/batch-update",
            post(handlers::locations::batch_update_slots),
        )
        .route(
            "/admin/slots/batch-clear",
            post(handlers::locations::batch_clear_slots),
        )
        .route(
            "/admin/slots/:id",
            get(handlers::locations::get_slot_by_id).delete(handlers::locations::delete_slot),
        );

    Router::new()
        .route("/health", get(handlers::health::simple_health_check))
        .route("/health/ready", get(handlers::health::readiness_check))
        .merge(trays)
        .merge(slots)
        .merge(locations)
        .merge(admin)
}

/// The full application router: health, `/api/v1`, Swagger UI, request ids
/// and HTTP tracing. Transport concerns (CORS, compression, timeouts) are
/// layered on by the server binary.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "wms-locations up" }))
        .route("/health", get(handlers::health::simple_health_check))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        .fallback(not_found)
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

/// Fallback for unknown routes
pub async fn not_found() -> (axum::http::StatusCode, Json<errors::ErrorResponse>) {
    (
        axum::http::StatusCode::NOT_FOUND,
        Json(errors::ErrorResponse {
            error: "Not Found".to_string(),
            message: "No route matches the request".to_string(),
            details: None,
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }),
    )
}

pub mod prelude {
    pub use crate::config::AppConfig;
    pub use crate::db::*;
    pub use crate::entities::*;
    pub use crate::errors::*;
    pub use crate::events::*;
    pub use crate::services::{
        locations::LocationManager, reports::ReportingService, slots::SlotStore,
        trays::TrayRegistry,
    };
    pub use crate::{ApiResponse, AppState};
}
