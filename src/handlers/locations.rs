use crate::{
    entities::material_location::SlotStatus,
    errors::ApiError,
    handlers::{
        common::{resolve_page, validate_input, PaginationParams},
        AppState,
    },
    services::{
        locations::{BatchClearRequest, BatchUpdateRequest},
        slots::{SlotFilter, SlotListResponse, SlotResponse},
    },
    ApiResponse,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AdminSlotQuery {
    pub tray_id: Option<String>,
    pub item_id: Option<String>,
    pub status: Option<SlotStatus>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/items/{item_id}/locations",
    tag = "locations",
    params(("item_id" = String, Path, description = "Item identifier"), PaginationParams),
    responses(
        (status = 200, description = "Slots holding the item", body = ApiResponse<SlotListResponse>),
        (status = 400, description = "Blank item id", body = crate::errors::ErrorResponse),
    )
)]
pub async fn item_locations(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<SlotListResponse>>, ApiError> {
    let (page, per_page) = params.resolve(&state.config);
    let slots = state
        .services
        .reports
        .locations_of_item(&item_id, page, per_page)
        .await?;
    Ok(Json(ApiResponse::success(slots)))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/slots/{status}",
    tag = "locations",
    params(("status" = SlotStatus, Path, description = "empty, active or disabled"), PaginationParams),
    responses(
        (status = 200, description = "Slots in the given status", body = ApiResponse<SlotListResponse>),
        (status = 400, description = "Unknown status", body = crate::errors::ErrorResponse),
    )
)]
pub async fn slots_by_status(
    State(state): State<AppState>,
    Path(status): Path<SlotStatus>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<SlotListResponse>>, ApiError> {
    let (page, per_page) = params.resolve(&state.config);
    let slots = state
        .services
        .reports
        .slots_by_status(status, page, per_page)
        .await?;
    Ok(Json(ApiResponse::success(slots)))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/slots",
    tag = "admin",
    params(AdminSlotQuery),
    responses((status = 200, description = "Slots ordered by surrogate id", body = ApiResponse<SlotListResponse>))
)]
pub async fn list_all_slots(
    State(state): State<AppState>,
    Query(query): Query<AdminSlotQuery>,
) -> Result<Json<ApiResponse<SlotListResponse>>, ApiError> {
    let (page, per_page) = resolve_page(query.page, query.per_page, &state.config);
    let filter = SlotFilter {
        tray_id: query.tray_id,
        item_id: query.item_id,
        status: query.status,
    };
    let slots = state
        .services
        .slots
        .list_all(&filter, page, per_page)
        .await?;
    Ok(Json(ApiResponse::success(slots)))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/slots/{id}",
    tag = "admin",
    params(("id" = i32, Path, description = "Surrogate slot id")),
    responses(
        (status = 200, description = "Slot found", body = ApiResponse<SlotResponse>),
        (status = 404, description = "No such slot record", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_slot_by_id(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<SlotResponse>>, ApiError> {
    let slot = state.services.slots.get_by_id(id).await?;
    Ok(Json(ApiResponse::success(slot)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/slots/{id}",
    tag = "admin",
    params(("id" = i32, Path, description = "Surrogate slot id")),
    responses(
        (status = 200, description = "Slot record removed", body = ApiResponse<SlotResponse>),
        (status = 404, description = "No such slot record", body = crate::errors::ErrorResponse),
    )
)]
pub async fn delete_slot(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<SlotResponse>>, ApiError> {
    let slot = state.services.slots.delete(id).await?;
    Ok(Json(ApiResponse::success(slot)))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/slots/batch-update",
    tag = "admin",
    request_body = BatchUpdateRequest,
    responses((status = 200, description = "Updated records in ascending id order", body = ApiResponse<Vec<SlotResponse>>))
)]
pub async fn batch_update_slots(
    State(state): State<AppState>,
    Json(request): Json<BatchUpdateRequest>,
) -> Result<Json<ApiResponse<Vec<SlotResponse>>>, ApiError> {
    validate_input(&request)?;
    let slots = state
        .services
        .locations
        .batch_update_content(request.updates)
        .await?;
    Ok(Json(ApiResponse::success(slots)))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/slots/batch-clear",
    tag = "admin",
    request_body = BatchClearRequest,
    responses((status = 200, description = "Cleared records in ascending id order", body = ApiResponse<Vec<SlotResponse>>))
)]
pub async fn batch_clear_slots(
    State(state): State<AppState>,
    Json(request): Json<BatchClearRequest>,
) -> Result<Json<ApiResponse<Vec<SlotResponse>>>, ApiError> {
    validate_input(&request)?;
    let slots = state
        .services
        .locations
        .batch_clear(request.ids, request.replacement)
        .await?;
    Ok(Json(ApiResponse::success(slots)))
}
