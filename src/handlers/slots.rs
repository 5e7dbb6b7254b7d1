use crate::{
    errors::ApiError,
    handlers::{common::validate_input, AppState},
    services::{locations::PlaceItemRequest, slots::SlotResponse},
    ApiResponse,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct InitializeSlotsRequest {
    /// Must equal the tray's capacity; defaults to it when omitted
    #[validate(range(min = 1, max = 10000))]
    pub capacity: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InitializeSlotsResponse {
    pub tray_id: String,
    pub created: u64,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PlaceQuery {
    /// Replace an existing occupant instead of failing with 409
    #[serde(default)]
    pub allow_overwrite: bool,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ClearQuery {
    /// Occupant left behind, e.g. a disabled marker; vacant when omitted
    pub replacement: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/trays/{tray_id}/slots/initialize",
    tag = "slots",
    params(("tray_id" = String, Path, description = "Tray identifier")),
    request_body = InitializeSlotsRequest,
    responses(
        (status = 200, description = "Missing slots created", body = ApiResponse<InitializeSlotsResponse>),
        (status = 400, description = "Capacity mismatch", body = crate::errors::ErrorResponse),
        (status = 404, description = "Tray not registered", body = crate::errors::ErrorResponse),
    )
)]
pub async fn initialize_slots(
    State(state): State<AppState>,
    Path(tray_id): Path<String>,
    request: Option<Json<InitializeSlotsRequest>>,
) -> Result<Json<ApiResponse<InitializeSlotsResponse>>, ApiError> {
    let request = request.map(|Json(body)| body).unwrap_or_default();
    validate_input(&request)?;

    let capacity = match request.capacity {
        Some(capacity) => capacity,
        None => state.services.trays.lookup(&tray_id).await?.capacity,
    };
    let created = state.services.slots.initialize(&tray_id, capacity).await?;
    Ok(Json(ApiResponse::success(InitializeSlotsResponse {
        tray_id,
        created,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/trays/{tray_id}/slots",
    tag = "slots",
    params(("tray_id" = String, Path, description = "Tray identifier")),
    responses(
        (status = 200, description = "Slots ordered by index", body = ApiResponse<Vec<SlotResponse>>),
        (status = 404, description = "Tray not registered", body = crate::errors::ErrorResponse),
    )
)]
pub async fn list_slots(
    State(state): State<AppState>,
    Path(tray_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<SlotResponse>>>, ApiError> {
    let slots = state.services.slots.list(&tray_id).await?;
    Ok(Json(ApiResponse::success(slots)))
}

#[utoipa::path(
    get,
    path = "/api/v1/trays/{tray_id}/slots/first-available",
    tag = "slots",
    params(("tray_id" = String, Path, description = "Tray identifier")),
    responses(
        (status = 200, description = "Lowest vacant slot, data is null when the tray is full", body = ApiResponse<SlotResponse>),
        (status = 404, description = "Tray not registered", body = crate::errors::ErrorResponse),
    )
)]
pub async fn first_available_slot(
    State(state): State<AppState>,
    Path(tray_id): Path<String>,
) -> Result<Json<ApiResponse<Option<SlotResponse>>>, ApiError> {
    let slot = state
        .services
        .locations
        .find_first_available(&tray_id)
        .await?;
    Ok(Json(ApiResponse::success(slot)))
}

#[utoipa::path(
    get,
    path = "/api/v1/trays/{tray_id}/slots/{slot_index}",
    tag = "slots",
    params(
        ("tray_id" = String, Path, description = "Tray identifier"),
        ("slot_index" = i32, Path, description = "1-based slot index"),
    ),
    responses(
        (status = 200, description = "Slot found", body = ApiResponse<SlotResponse>),
        (status = 404, description = "Slot not found", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_slot(
    State(state): State<AppState>,
    Path((tray_id, slot_index)): Path<(String, i32)>,
) -> Result<Json<ApiResponse<SlotResponse>>, ApiError> {
    let slot = state.services.slots.get(&tray_id, slot_index).await?;
    Ok(Json(ApiResponse::success(slot)))
}

#[utoipa::path(
    put,
    path = "/api/v1/trays/{tray_id}/slots/{slot_index}",
    tag = "slots",
    params(
        ("tray_id" = String, Path, description = "Tray identifier"),
        ("slot_index" = i32, Path, description = "1-based slot index"),
        PlaceQuery,
    ),
    request_body = PlaceItemRequest,
    responses(
        (status = 200, description = "Item placed", body = ApiResponse<SlotResponse>),
        (status = 400, description = "Index out of range or blank item", body = crate::errors::ErrorResponse),
        (status = 404, description = "Tray or slot missing", body = crate::errors::ErrorResponse),
        (status = 409, description = "Slot occupied and overwrite disallowed", body = crate::errors::ErrorResponse),
    )
)]
pub async fn place_item(
    State(state): State<AppState>,
    Path((tray_id, slot_index)): Path<(String, i32)>,
    Query(query): Query<PlaceQuery>,
    Json(request): Json<PlaceItemRequest>,
) -> Result<Json<ApiResponse<SlotResponse>>, ApiError> {
    validate_input(&request)?;
    let slot = state
        .services
        .locations
        .place(&tray_id, slot_index, request, query.allow_overwrite)
        .await?;
    Ok(Json(ApiResponse::success(slot)))
}

#[utoipa::path(
    post,
    path = "/api/v1/trays/{tray_id}/slots/{slot_index}/clear",
    tag = "slots",
    params(
        ("tray_id" = String, Path, description = "Tray identifier"),
        ("slot_index" = i32, Path, description = "1-based slot index"),
        ClearQuery,
    ),
    responses(
        (status = 200, description = "Slot cleared", body = ApiResponse<SlotResponse>),
        (status = 404, description = "Tray or slot missing", body = crate::errors::ErrorResponse),
    )
)]
pub async fn clear_slot(
    State(state): State<AppState>,
    Path((tray_id, slot_index)): Path<(String, i32)>,
    Query(query): Query<ClearQuery>,
) -> Result<Json<ApiResponse<SlotResponse>>, ApiError> {
    let slot = state
        .services
        .locations
        .clear(&tray_id, slot_index, query.replacement)
        .await?;
    Ok(Json(ApiResponse::success(slot)))
}

#[utoipa::path(
    post,
    path = "/api/v1/trays/{tray_id}/clear",
    tag = "slots",
    params(("tray_id" = String, Path, description = "Tray identifier")),
    responses(
        (status = 200, description = "Every slot of the tray cleared", body = ApiResponse<Vec<SlotResponse>>),
        (status = 404, description = "Tray not registered", body = crate::errors::ErrorResponse),
    )
)]
pub async fn clear_tray(
    State(state): State<AppState>,
    Path(tray_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<SlotResponse>>>, ApiError> {
    let slots = state.services.locations.clear_tray(&tray_id).await?;
    Ok(Json(ApiResponse::success(slots)))
}
