mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use common::TestApp;
use futures::future::join_all;
use wms_locations::{errors::ServiceError, services::locations::PlaceItemRequest};

#[tokio::test]
async fn concurrent_placements_on_one_slot_have_one_winner() {
    let app = Arc::new(TestApp::new().await);
    app.register_tray("AGV1", 2).await;

    let attempts = (0..8).map(|n| {
        let app = Arc::clone(&app);
        tokio::spawn(async move {
            app.services()
                .locations
                .place("AGV1", 1, PlaceItemRequest::new(format!("ITEM{n}")), false)
                .await
        })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    for result in results.iter().filter(|r| r.is_err()) {
        assert_matches!(result, Err(ServiceError::Conflict(_)));
    }

    let slot = app.services().slots.get("AGV1", 1).await.unwrap();
    assert_eq!(slot.item_id, winners[0].item_id);
}

#[tokio::test]
async fn concurrent_placements_on_distinct_slots_all_land() {
    let app = Arc::new(TestApp::new().await);
    app.register_tray("AGV1", 5).await;

    let attempts = (1..=5).map(|index| {
        let app = Arc::clone(&app);
        tokio::spawn(async move {
            app.services()
                .locations
                .place("AGV1", index, PlaceItemRequest::new(format!("ITEM{index}")), false)
                .await
        })
    });
    for joined in join_all(attempts).await {
        assert!(joined.expect("task panicked").is_ok());
    }

    assert!(app
        .services()
        .locations
        .find_first_available("AGV1")
        .await
        .unwrap()
        .is_none());
}
