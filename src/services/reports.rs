use crate::{
    db::DbPool,
    entities::material_location::{self, Entity as MaterialLocationEntity, SlotStatus},
    errors::ServiceError,
    services::{
        page_bounds,
        slots::{SlotListResponse, SlotResponse},
        trays::find_tray,
    },
};
use sea_orm::{
    sea_query::Expr, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, instrument, warn};
use utoipa::ToSchema;

/// Occupancy counts for one tray
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TraySummary {
    pub tray_id: String,
    pub capacity: i32,
    /// Slot records present; lower than capacity when slots were deleted
    pub total_slots: u64,
    pub empty: u64,
    pub active: u64,
    pub disabled: u64,
}

impl TraySummary {
    /// Share of present slots holding a real item, 0.0 for a tray without slots
    pub fn occupancy_rate(&self) -> f64 {
        if self.total_slots == 0 {
            0.0
        } else {
            self.active as f64 / self.total_slots as f64
        }
    }
}

/// Read-only projections over slot records
#[derive(Clone)]
pub struct ReportingService {
    db_pool: Arc<DbPool>,
}

impl ReportingService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    async fn page_of(
        &self,
        query: Select<MaterialLocationEntity>,
        page: u64,
        per_page: u64,
    ) -> Result<SlotListResponse, ServiceError> {
        let (page, per_page) = page_bounds(page, per_page);
        let paginator = query
            .order_by_asc(material_location::Column::TrayId)
            .order_by_asc(material_location::Column::SlotIndex)
            .paginate(&*self.db_pool, per_page);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count slots");
            ServiceError::db_error(e)
        })?;
        let slots = paginator.fetch_page(page - 1).await?;

        Ok(SlotListResponse {
            slots: slots.into_iter().map(SlotResponse::from).collect(),
            total,
            page,
            per_page,
        })
    }

    /// Every slot holding `item_id`, ordered by tray then index
    #[instrument(skip(self))]
    pub async fn locations_of_item(
        &self,
        item_id: &str,
        page: u64,
        per_page: u64,
    ) -> Result<SlotListResponse, ServiceError> {
        let item_id = item_id.trim();
        if item_id.is_empty() {
            return Err(ServiceError::InvalidInput("item id must not be blank".into()));
        }

        let query =
            MaterialLocationEntity::find().filter(material_location::Column::ItemId.eq(item_id));
        self.page_of(query, page, per_page).await
    }

    #[instrument(skip(self))]
    pub async fn slots_by_status(
        &self,
        status: SlotStatus,
        page: u64,
        per_page: u64,
    ) -> Result<SlotListResponse, ServiceError> {
        let query =
            MaterialLocationEntity::find().filter(material_location::Column::Status.eq(status));
        self.page_of(query, page, per_page).await
    }

    /// Capacity and per-status slot counts of one tray
    #[instrument(skip(self))]
    pub async fn tray_summary(&self, tray_id: &str) -> Result<TraySummary, ServiceError> {
        let db = &*self.db_pool;
        let tray = find_tray(db, tray_id).await?;

        let counts: Vec<(String, i64)> = MaterialLocationEntity::find()
            .select_only()
            .column(material_location::Column::Status)
            .column_as(Expr::col(material_location::Column::Id).count(), "count")
            .filter(material_location::Column::TrayId.eq(tray_id))
            .group_by(material_location::Column::Status)
            .into_tuple()
            .all(db)
            .await?;

        let mut summary = TraySummary {
            tray_id: tray.id,
            capacity: tray.capacity,
            total_slots: 0,
            empty: 0,
            active: 0,
            disabled: 0,
        };
        for (status, count) in counts {
            let count = u64::try_from(count).unwrap_or(0);
            summary.total_slots += count;
            match SlotStatus::from_str(&status) {
                Ok(SlotStatus::Empty) => summary.empty += count,
                Ok(SlotStatus::Active) => summary.active += count,
                Ok(SlotStatus::Disabled) => summary.disabled += count,
                Err(_) => warn!(tray_id, status = %status, "Unknown slot status in store"),
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occupancy_rate_counts_active_slots_only() {
        let summary = TraySummary {
            tray_id: "AGV1".into(),
            capacity: 4,
            total_slots: 4,
            empty: 1,
            active: 2,
            disabled: 1,
        };
        assert!((summary.occupancy_rate() - 0.5).abs() < f64::EPSILON);

        let empty = TraySummary {
            total_slots: 0,
            empty: 0,
            active: 0,
            disabled: 0,
            ..summary
        };
        assert_eq!(empty.occupancy_rate(), 0.0);
    }
}
