use crate::{
    errors::ApiError,
    handlers::{
        common::{created_response, validate_input, PaginationParams},
        AppState,
    },
    services::{
        reports::TraySummary,
        slots::SlotResponse,
        trays::{
            ReconfigureCapacityRequest, RegisterTrayRequest, TrayListResponse, TrayResponse,
            UpdateTrayRequest,
        },
    },
    ApiResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TrayDetailResponse {
    pub tray: TrayResponse,
    pub slots: Vec<SlotResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TrayDeletedResponse {
    pub tray_id: String,
    pub slots_removed: u64,
}

#[utoipa::path(
    post,
    path = "/api/v1/trays",
    tag = "trays",
    request_body = RegisterTrayRequest,
    responses(
        (status = 201, description = "Tray registered with vacant slots", body = ApiResponse<TrayResponse>),
        (status = 400, description = "Duplicate id or invalid capacity", body = crate::errors::ErrorResponse),
    )
)]
pub async fn register_tray(
    State(state): State<AppState>,
    Json(request): Json<RegisterTrayRequest>,
) -> Result<Response, ApiError> {
    validate_input(&request)?;
    let tray = state.services.trays.register(request).await?;
    Ok(created_response(ApiResponse::success(tray)))
}

#[utoipa::path(
    get,
    path = "/api/v1/trays",
    tag = "trays",
    params(PaginationParams),
    responses((status = 200, description = "Trays ordered by id", body = ApiResponse<TrayListResponse>))
)]
pub async fn list_trays(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<TrayListResponse>>, ApiError> {
    let (page, per_page) = params.resolve(&state.config);
    let trays = state.services.trays.list(page, per_page).await?;
    Ok(Json(ApiResponse::success(trays)))
}

#[utoipa::path(
    get,
    path = "/api/v1/trays/{tray_id}",
    tag = "trays",
    params(("tray_id" = String, Path, description = "Tray identifier")),
    responses(
        (status = 200, description = "Tray found", body = ApiResponse<TrayResponse>),
        (status = 404, description = "Tray not registered", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_tray(
    State(state): State<AppState>,
    Path(tray_id): Path<String>,
) -> Result<Json<ApiResponse<TrayResponse>>, ApiError> {
    let tray = state.services.trays.lookup(&tray_id).await?;
    Ok(Json(ApiResponse::success(tray)))
}

#[utoipa::path(
    get,
    path = "/api/v1/trays/{tray_id}/detail",
    tag = "trays",
    params(("tray_id" = String, Path, description = "Tray identifier")),
    responses(
        (status = 200, description = "Tray with its slots", body = ApiResponse<TrayDetailResponse>),
        (status = 404, description = "Tray not registered", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_tray_detail(
    State(state): State<AppState>,
    Path(tray_id): Path<String>,
) -> Result<Json<ApiResponse<TrayDetailResponse>>, ApiError> {
    let tray = state.services.trays.lookup(&tray_id).await?;
    let slots = state.services.slots.list(&tray_id).await?;
    Ok(Json(ApiResponse::success(TrayDetailResponse { tray, slots })))
}

#[utoipa::path(
    put,
    path = "/api/v1/trays/{tray_id}",
    tag = "trays",
    params(("tray_id" = String, Path, description = "Tray identifier")),
    request_body = UpdateTrayRequest,
    responses(
        (status = 200, description = "Description updated", body = ApiResponse<TrayResponse>),
        (status = 404, description = "Tray not registered", body = crate::errors::ErrorResponse),
    )
)]
pub async fn update_tray(
    State(state): State<AppState>,
    Path(tray_id): Path<String>,
    Json(request): Json<UpdateTrayRequest>,
) -> Result<Json<ApiResponse<TrayResponse>>, ApiError> {
    validate_input(&request)?;
    let tray = state.services.trays.update(&tray_id, request).await?;
    Ok(Json(ApiResponse::success(tray)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/trays/{tray_id}",
    tag = "trays",
    params(("tray_id" = String, Path, description = "Tray identifier")),
    responses(
        (status = 200, description = "Tray and its slots removed", body = ApiResponse<TrayDeletedResponse>),
        (status = 404, description = "Tray not registered", body = crate::errors::ErrorResponse),
    )
)]
pub async fn delete_tray(
    State(state): State<AppState>,
    Path(tray_id): Path<String>,
) -> Result<Json<ApiResponse<TrayDeletedResponse>>, ApiError> {
    let slots_removed = state.services.trays.delete(&tray_id).await?;
    Ok(Json(ApiResponse::success(TrayDeletedResponse {
        tray_id,
        slots_removed,
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/trays/{tray_id}/capacity",
    tag = "trays",
    params(("tray_id" = String, Path, description = "Tray identifier")),
    request_body = ReconfigureCapacityRequest,
    responses(
        (status = 200, description = "Capacity changed and slots reconciled", body = ApiResponse<TrayResponse>),
        (status = 400, description = "Invalid capacity", body = crate::errors::ErrorResponse),
        (status = 404, description = "Tray not registered", body = crate::errors::ErrorResponse),
        (status = 409, description = "Slots above the new capacity are occupied", body = crate::errors::ErrorResponse),
    )
)]
pub async fn reconfigure_capacity(
    State(state): State<AppState>,
    Path(tray_id): Path<String>,
    Json(request): Json<ReconfigureCapacityRequest>,
) -> Result<Json<ApiResponse<TrayResponse>>, ApiError> {
    validate_input(&request)?;
    let tray = state
        .services
        .trays
        .reconfigure_capacity(&tray_id, request.capacity)
        .await?;
    Ok(Json(ApiResponse::success(tray)))
}

#[utoipa::path(
    get,
    path = "/api/v1/trays/{tray_id}/summary",
    tag = "trays",
    params(("tray_id" = String, Path, description = "Tray identifier")),
    responses(
        (status = 200, description = "Occupancy counts", body = ApiResponse<TraySummary>),
        (status = 404, description = "Tray not registered", body = crate::errors::ErrorResponse),
    )
)]
pub async fn tray_summary(
    State(state): State<AppState>,
    Path(tray_id): Path<String>,
) -> Result<Json<ApiResponse<TraySummary>>, ApiError> {
    let summary = state.services.reports.tray_summary(&tray_id).await?;
    Ok(Json(ApiResponse::success(summary)))
}
