mod common;

use assert_matches::assert_matches;
use common::TestApp;
use wms_locations::{
    entities::SlotStatus,
    errors::ServiceError,
    services::{
        locations::{PlaceItemRequest, SlotPatch},
        slots::SlotFilter,
    },
};

#[tokio::test]
async fn place_query_clear_scenario() {
    let app = TestApp::new().await;
    app.register_tray("AGV1", 3).await;
    let locations = &app.services().locations;

    let mut request = PlaceItemRequest::new("ITEM7");
    request.task_id = Some("T-100".into());
    let placed = locations.place("AGV1", 2, request, false).await.unwrap();
    assert_eq!(placed.item_id.as_deref(), Some("ITEM7"));
    assert_eq!(placed.status, SlotStatus::Active);
    assert_eq!(placed.task_id.as_deref(), Some("T-100"));

    let first = locations.find_first_available("AGV1").await.unwrap().unwrap();
    assert_eq!(first.slot_index, 1);

    let err = locations
        .place("AGV1", 2, PlaceItemRequest::new("ITEM9"), false)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(msg) if msg.contains("ITEM7"));

    let found = app
        .services()
        .reports
        .locations_of_item("ITEM7", 1, 20)
        .await
        .unwrap();
    assert_eq!(found.total, 1);
    assert_eq!(found.slots[0].tray_id, "AGV1");
    assert_eq!(found.slots[0].slot_index, 2);

    let cleared = locations.clear("AGV1", 2, None).await.unwrap();
    assert!(cleared.item_id.is_none());
    assert_eq!(cleared.status, SlotStatus::Empty);
    assert!(cleared.task_id.is_none());

    let found = app
        .services()
        .reports
        .locations_of_item("ITEM7", 1, 20)
        .await
        .unwrap();
    assert_eq!(found.total, 0);
}

#[tokio::test]
async fn place_rejects_out_of_range_unknown_tray_and_blank_item() {
    let app = TestApp::new().await;
    app.register_tray("AGV1", 3).await;
    let locations = &app.services().locations;

    for index in [0, 4, -1] {
        let err = locations
            .place("AGV1", index, PlaceItemRequest::new("ITEM7"), false)
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::InvalidInput(_));
    }

    let err = locations
        .place("NOPE", 1, PlaceItemRequest::new("ITEM7"), false)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let err = locations
        .place("AGV1", 1, PlaceItemRequest::new("  "), false)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidInput(_));
}

#[tokio::test]
async fn place_into_deleted_slot_is_not_found_until_reinitialized() {
    let app = TestApp::new().await;
    app.register_tray("AGV1", 3).await;
    let slot = app.services().slots.get("AGV1", 3).await.unwrap();
    app.services().slots.delete(slot.id).await.unwrap();

    let err = app
        .services()
        .locations
        .place("AGV1", 3, PlaceItemRequest::new("ITEM7"), false)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let created = app.services().slots.initialize("AGV1", 3).await.unwrap();
    assert_eq!(created, 1);
    app.services()
        .locations
        .place("AGV1", 3, PlaceItemRequest::new("ITEM7"), false)
        .await
        .unwrap();
}

#[tokio::test]
async fn overwrite_replaces_occupant() {
    let app = TestApp::new().await;
    app.register_tray("AGV1", 2).await;
    let locations = &app.services().locations;

    locations
        .place("AGV1", 1, PlaceItemRequest::new("ITEM7"), false)
        .await
        .unwrap();
    let replaced = locations
        .place("AGV1", 1, PlaceItemRequest::new("ITEM9"), true)
        .await
        .unwrap();
    assert_eq!(replaced.item_id.as_deref(), Some("ITEM9"));
    assert_eq!(replaced.status, SlotStatus::Active);
}

#[tokio::test]
async fn clearing_to_sentinel_disables_slot() {
    let app = TestApp::new().await;
    app.register_tray("AGV1", 2).await;
    let locations = &app.services().locations;

    let disabled = locations
        .clear("AGV1", 1, Some("-99".into()))
        .await
        .unwrap();
    assert_eq!(disabled.item_id.as_deref(), Some("-99"));
    assert_eq!(disabled.status, SlotStatus::Disabled);

    // A disabled slot is not vacant
    let first = locations.find_first_available("AGV1").await.unwrap().unwrap();
    assert_eq!(first.slot_index, 2);
    let err = locations
        .place("AGV1", 1, PlaceItemRequest::new("ITEM7"), false)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));

    // An empty replacement means vacant
    let vacant = locations.clear("AGV1", 1, Some(String::new())).await.unwrap();
    assert!(vacant.item_id.is_none());
    assert_eq!(vacant.status, SlotStatus::Empty);
}

#[tokio::test]
async fn first_available_is_none_when_tray_is_full() {
    let app = TestApp::new().await;
    app.register_tray("AGV1", 2).await;
    let locations = &app.services().locations;
    for index in 1..=2 {
        locations
            .place("AGV1", index, PlaceItemRequest::new(format!("ITEM{index}")), false)
            .await
            .unwrap();
    }

    assert!(locations.find_first_available("AGV1").await.unwrap().is_none());

    let err = locations.find_first_available("NOPE").await.unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn batch_clear_skips_unknown_ids() {
    let app = TestApp::new().await;
    app.register_tray("AGV1", 6).await;
    let locations = &app.services().locations;
    for index in [5, 6] {
        locations
            .place("AGV1", index, PlaceItemRequest::new(format!("ITEM{index}")), false)
            .await
            .unwrap();
    }
    let slot5 = app.services().slots.get("AGV1", 5).await.unwrap();
    let slot6 = app.services().slots.get("AGV1", 6).await.unwrap();

    let cleared = locations
        .batch_clear(vec![slot6.id, 999, slot5.id], None)
        .await
        .unwrap();
    let ids: Vec<i32> = cleared.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![slot5.id, slot6.id]);
    assert!(cleared.iter().all(|s| s.item_id.is_none()));

    let none = locations.batch_clear(vec![998, 999], None).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn batch_update_applies_partial_patches() {
    let app = TestApp::new().await;
    app.register_tray("AGV1", 3).await;
    let slots = app.services().slots.list("AGV1").await.unwrap();

    let updated = app
        .services()
        .locations
        .batch_update_content(vec![
            SlotPatch {
                id: slots[2].id,
                item_id: Some("ITEM3".into()),
                ..Default::default()
            },
            SlotPatch {
                id: 999,
                item_id: Some("GHOST".into()),
                ..Default::default()
            },
            SlotPatch {
                id: slots[0].id,
                task_id: Some("T-1".into()),
                ..Default::default()
            },
            SlotPatch {
                id: slots[1].id,
                ..Default::default()
            },
        ])
        .await
        .unwrap();

    let ids: Vec<i32> = updated.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![slots[0].id, slots[2].id]);
    assert_eq!(updated[0].task_id.as_deref(), Some("T-1"));
    assert!(updated[0].item_id.is_none());
    assert_eq!(updated[1].item_id.as_deref(), Some("ITEM3"));
    assert_eq!(updated[1].status, SlotStatus::Active);

    // Untouched slot keeps its state
    let middle = app.services().slots.get("AGV1", 2).await.unwrap();
    assert!(middle.item_id.is_none());
}

#[tokio::test]
async fn clear_tray_vacates_every_slot() {
    let app = TestApp::new().await;
    app.register_tray("AGV1", 3).await;
    app.register_tray("AGV2", 1).await;
    let locations = &app.services().locations;
    locations
        .place("AGV1", 1, PlaceItemRequest::new("ITEM1"), false)
        .await
        .unwrap();
    locations.clear("AGV1", 3, Some("-1".into())).await.unwrap();
    locations
        .place("AGV2", 1, PlaceItemRequest::new("ITEM2"), false)
        .await
        .unwrap();

    let cleared = locations.clear_tray("AGV1").await.unwrap();
    assert_eq!(cleared.len(), 3);
    assert!(cleared
        .iter()
        .all(|s| s.item_id.is_none() && s.status == SlotStatus::Empty));

    let other = app.services().slots.get("AGV2", 1).await.unwrap();
    assert_eq!(other.item_id.as_deref(), Some("ITEM2"));
}

#[tokio::test]
async fn initialize_is_idempotent_and_checks_capacity() {
    let app = TestApp::new().await;
    app.register_tray("AGV1", 4).await;
    let slots = &app.services().slots;

    assert_eq!(slots.initialize("AGV1", 4).await.unwrap(), 0);
    assert_eq!(slots.list("AGV1").await.unwrap().len(), 4);

    let err = slots.initialize("AGV1", 5).await.unwrap_err();
    assert_matches!(err, ServiceError::CapacityMismatch(_));

    let err = slots.initialize("NOPE", 4).await.unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn reports_reflect_slot_states() {
    let app = TestApp::new().await;
    app.register_tray("AGV1", 4).await;
    app.register_tray("AGV2", 2).await;
    let locations = &app.services().locations;
    locations
        .place("AGV2", 2, PlaceItemRequest::new("ITEM7"), false)
        .await
        .unwrap();
    locations
        .place("AGV1", 3, PlaceItemRequest::new("ITEM7"), false)
        .await
        .unwrap();
    locations.clear("AGV1", 4, Some("-99".into())).await.unwrap();

    let reports = &app.services().reports;
    let found = reports.locations_of_item("ITEM7", 1, 20).await.unwrap();
    let places: Vec<(&str, i32)> = found
        .slots
        .iter()
        .map(|s| (s.tray_id.as_str(), s.slot_index))
        .collect();
    assert_eq!(places, vec![("AGV1", 3), ("AGV2", 2)]);

    let summary = reports.tray_summary("AGV1").await.unwrap();
    assert_eq!(summary.capacity, 4);
    assert_eq!(summary.total_slots, 4);
    assert_eq!((summary.empty, summary.active, summary.disabled), (2, 1, 1));

    let disabled = reports
        .slots_by_status(SlotStatus::Disabled, 1, 20)
        .await
        .unwrap();
    assert_eq!(disabled.total, 1);
    assert_eq!(disabled.slots[0].slot_index, 4);

    let err = reports.locations_of_item(" ", 1, 20).await.unwrap_err();
    assert_matches!(err, ServiceError::InvalidInput(_));

    let filtered = app
        .services()
        .slots
        .list_all(
            &SlotFilter {
                tray_id: Some("AGV1".into()),
                status: Some(SlotStatus::Empty),
                ..Default::default()
            },
            1,
            20,
        )
        .await
        .unwrap();
    assert_eq!(filtered.total, 2);
}
