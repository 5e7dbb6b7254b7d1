pub mod common;
pub mod health;
pub mod locations;
pub mod slots;
pub mod trays;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    locations::LocationManager, reports::ReportingService, slots::SlotStore, trays::TrayRegistry,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub trays: Arc<TrayRegistry>,
    pub slots: Arc<SlotStore>,
    pub locations: Arc<LocationManager>,
    pub reports: Arc<ReportingService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            trays: Arc::new(TrayRegistry::new(
                db_pool.clone(),
                Some(event_sender.clone()),
            )),
            slots: Arc::new(SlotStore::new(db_pool.clone(), Some(event_sender.clone()))),
            locations: Arc::new(LocationManager::new(db_pool.clone(), Some(event_sender))),
            reports: Arc::new(ReportingService::new(db_pool)),
        }
    }
}
