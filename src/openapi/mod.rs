use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "WMS Locations API",
        version = "0.1.0",
        description = r#"
# Tray and slot location API

Tracks which material item occupies which slot of which tray.

- A tray is registered with a fixed capacity; its slots `1..=capacity` are created vacant.
- `PUT /trays/{tray_id}/slots/{slot_index}` places an item. An occupied slot answers
  `409 Conflict` unless `allow_overwrite=true` is given.
- Clearing a slot accepts a `replacement` occupant; `-99` and `-1` mark the slot disabled.
- Batch endpoints under `/admin/slots` address slots by surrogate id and skip unknown ids.

## Error Handling

Errors share one body shape:

```json
{
  "error": "Conflict",
  "message": "Conflict: slot 2 of tray AGV1 is occupied by ITEM7",
  "request_id": "1f0c...",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

## Pagination

List endpoints accept `page` (from 1) and `per_page` (capped by server configuration).
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "trays", description = "Tray registration and capacity"),
        (name = "slots", description = "Slot occupancy per tray"),
        (name = "locations", description = "Item-centric and status lookups"),
        (name = "admin", description = "Surrogate-id and batch operations"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        // Health
        crate::handlers::health::simple_health_check,
        crate::handlers::health::readiness_check,

        // Trays
        crate::handlers::trays::register_tray,
        crate::handlers::trays::list_trays,
        crate::handlers::trays::get_tray,
        crate::handlers::trays::get_tray_detail,
        crate::handlers::trays::update_tray,
        crate::handlers::trays::delete_tray,
        crate::handlers::trays::reconfigure_capacity,
        crate::handlers::trays::tray_summary,

        // Slots
        crate::handlers::slots::initialize_slots,
        crate::handlers::slots::list_slots,
        crate::handlers::slots::first_available_slot,
        crate::handlers::slots::get_slot,
        crate::handlers::slots::place_item,
        crate::handlers::slots::clear_slot,
        crate::handlers::slots::clear_tray,

        // Locations and admin
        crate::handlers::locations::item_locations,
        crate::handlers::locations::slots_by_status,
        crate::handlers::locations::list_all_slots,
        crate::handlers::locations::get_slot_by_id,
        crate::handlers::locations::delete_slot,
        crate::handlers::locations::batch_update_slots,
        crate::handlers::locations::batch_clear_slots,
    ),
    components(
        schemas(
            crate::entities::material_location::SlotStatus,
            crate::services::locations::SlotPatch,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
