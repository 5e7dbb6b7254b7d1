use crate::{
    db::{with_transaction, DbPool},
    entities::material_location::{
        self, vacant_slot, Entity as MaterialLocationEntity, Model as SlotModel, SlotStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        page_bounds,
        trays::{check_capacity, find_tray},
    },
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

/// Rows per INSERT when bulk-creating slots, below SQLite's bind-variable limit
const INSERT_CHUNK_SIZE: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SlotResponse {
    /// Surrogate id
    pub id: i32,
    pub tray_id: String,
    pub slot_index: i32,
    pub item_id: Option<String>,
    pub status: SlotStatus,
    pub process_info: Option<String>,
    pub task_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<SlotModel> for SlotResponse {
    fn from(model: SlotModel) -> Self {
        Self {
            id: model.id,
            tray_id: model.tray_id,
            slot_index: model.slot_index,
            item_id: model.item_id,
            status: model.status,
            process_info: model.process_info,
            task_id: model.task_id,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SlotListResponse {
    pub slots: Vec<SlotResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Filter for the global slot listing; absent fields do not constrain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlotFilter {
    pub tray_id: Option<String>,
    pub item_id: Option<String>,
    pub status: Option<SlotStatus>,
}

impl SlotFilter {
    fn condition(&self) -> Condition {
        let mut condition = Condition::all();
        if let Some(tray_id) = self.tray_id.as_deref().filter(|s| !s.is_empty()) {
            condition = condition.add(material_location::Column::TrayId.eq(tray_id));
        }
        if let Some(item_id) = self.item_id.as_deref().filter(|s| !s.is_empty()) {
            condition = condition.add(material_location::Column::ItemId.eq(item_id));
        }
        if let Some(status) = self.status {
            condition = condition.add(material_location::Column::Status.eq(status));
        }
        condition
    }
}

/// Matches slots whose occupant is NULL or empty.
pub(crate) fn vacant_condition() -> Condition {
    Condition::any()
        .add(material_location::Column::ItemId.is_null())
        .add(material_location::Column::ItemId.eq(""))
}

pub(crate) fn occupied_condition() -> Condition {
    Condition::all()
        .add(material_location::Column::ItemId.is_not_null())
        .add(material_location::Column::ItemId.ne(""))
}

/// Inserts vacant slots for `indices`, chunked. Returns the number inserted.
pub(crate) async fn insert_vacant_slots<C, I>(
    conn: &C,
    tray_id: &str,
    indices: I,
) -> Result<u64, ServiceError>
where
    C: ConnectionTrait,
    I: IntoIterator<Item = i32>,
{
    let now = Utc::now();
    let mut inserted = 0u64;
    let mut chunk = Vec::with_capacity(INSERT_CHUNK_SIZE);

    for index in indices {
        chunk.push(vacant_slot(tray_id, index, now));
        if chunk.len() == INSERT_CHUNK_SIZE {
            inserted += chunk.len() as u64;
            MaterialLocationEntity::insert_many(std::mem::take(&mut chunk))
                .exec(conn)
                .await?;
        }
    }
    if !chunk.is_empty() {
        inserted += chunk.len() as u64;
        MaterialLocationEntity::insert_many(chunk).exec(conn).await?;
    }

    debug!(tray_id, inserted, "Inserted vacant slots");
    Ok(inserted)
}

/// Loads the slot at (tray, index), `NotFound` if there is no record.
pub(crate) async fn find_slot<C>(
    conn: &C,
    tray_id: &str,
    slot_index: i32,
) -> Result<SlotModel, ServiceError>
where
    C: ConnectionTrait,
{
    MaterialLocationEntity::find()
        .filter(material_location::Column::TrayId.eq(tray_id))
        .filter(material_location::Column::SlotIndex.eq(slot_index))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::slot_not_found(tray_id, slot_index))
}

/// Loads the given slot ids in ascending id order; unknown ids are dropped.
pub(crate) async fn find_slots_by_ids<C>(conn: &C, ids: &[i32]) -> Result<Vec<SlotModel>, ServiceError>
where
    C: ConnectionTrait,
{
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    Ok(MaterialLocationEntity::find()
        .filter(material_location::Column::Id.is_in(ids.iter().copied()))
        .order_by_asc(material_location::Column::Id)
        .all(conn)
        .await?)
}

/// Per-slot occupancy records
#[derive(Clone)]
pub struct SlotStore {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl SlotStore {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates the missing vacant slots 1..=capacity. Idempotent; returns the
    /// number of slots created by this call.
    #[instrument(skip(self))]
    pub async fn initialize(&self, tray_id: &str, capacity: i32) -> Result<u64, ServiceError> {
        check_capacity(capacity)?;
        let id = tray_id.to_string();
        let created = with_transaction(&self.db_pool, "initialize_slots", move |txn| {
            Box::pin(async move {
                let tray = find_tray(txn, &id).await?;
                if capacity != tray.capacity {
                    return Err(ServiceError::CapacityMismatch(format!(
                        "tray {} has capacity {}, not {}",
                        id, tray.capacity, capacity
                    )));
                }

                let existing: HashSet<i32> = MaterialLocationEntity::find()
                    .select_only()
                    .column(material_location::Column::SlotIndex)
                    .filter(material_location::Column::TrayId.eq(id.as_str()))
                    .into_tuple::<i32>()
                    .all(txn)
                    .await?
                    .into_iter()
                    .collect();

                let missing = missing_indices(capacity, &existing);
                insert_vacant_slots(txn, &id, missing).await
            })
        })
        .await?;

        info!(tray_id, created, "Slots initialized");
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(Event::SlotsInitialized {
                tray_id: tray_id.to_string(),
                created,
            });
        }
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, tray_id: &str, slot_index: i32) -> Result<SlotResponse, ServiceError> {
        find_slot(&*self.db_pool, tray_id, slot_index)
            .await
            .map(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, slot_id: i32) -> Result<SlotResponse, ServiceError> {
        MaterialLocationEntity::find_by_id(slot_id)
            .one(&*self.db_pool)
            .await?
            .map(Into::into)
            .ok_or_else(|| ServiceError::NotFound(format!("slot record {} not found", slot_id)))
    }

    /// All slots of a tray ordered by index
    #[instrument(skip(self))]
    pub async fn list(&self, tray_id: &str) -> Result<Vec<SlotResponse>, ServiceError> {
        let db = &*self.db_pool;
        find_tray(db, tray_id).await?;

        let slots = MaterialLocationEntity::find()
            .filter(material_location::Column::TrayId.eq(tray_id))
            .order_by_asc(material_location::Column::SlotIndex)
            .all(db)
            .await?;
        Ok(slots.into_iter().map(Into::into).collect())
    }

    /// Global listing ordered by surrogate id
    #[instrument(skip(self))]
    pub async fn list_all(
        &self,
        filter: &SlotFilter,
        page: u64,
        per_page: u64,
    ) -> Result<SlotListResponse, ServiceError> {
        let (page, per_page) = page_bounds(page, per_page);
        let paginator = MaterialLocationEntity::find()
            .filter(filter.condition())
            .order_by_asc(material_location::Column::Id)
            .paginate(&*self.db_pool, per_page);

        let total = paginator.num_items().await?;
        let slots = paginator.fetch_page(page - 1).await?;

        Ok(SlotListResponse {
            slots: slots.into_iter().map(Into::into).collect(),
            total,
            page,
            per_page,
        })
    }

    /// Administrative removal of one slot record; `initialize` can recreate it.
    #[instrument(skip(self))]
    pub async fn delete(&self, slot_id: i32) -> Result<SlotResponse, ServiceError> {
        let removed = with_transaction(&self.db_pool, "delete_slot", move |txn| {
            Box::pin(async move {
                let slot = MaterialLocationEntity::find_by_id(slot_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("slot record {} not found", slot_id))
                    })?;
                MaterialLocationEntity::delete_by_id(slot_id).exec(txn).await?;
                Ok(slot)
            })
        })
        .await?;

        info!(slot_id, tray_id = %removed.tray_id, slot_index = removed.slot_index, "Slot deleted");
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(Event::SlotDeleted {
                slot_id,
                tray_id: removed.tray_id.clone(),
                slot_index: removed.slot_index,
            });
        }
        Ok(removed.into())
    }
}

fn missing_indices(capacity: i32, existing: &HashSet<i32>) -> Vec<i32> {
    let all: RangeInclusive<i32> = 1..=capacity;
    all.filter(|index| !existing.contains(index)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_indices_skips_existing() {
        let existing: HashSet<i32> = [1, 3].into_iter().collect();
        assert_eq!(missing_indices(4, &existing), vec![2, 4]);
        assert!(missing_indices(2, &[1, 2].into_iter().collect()).is_empty());
        assert!(missing_indices(0, &HashSet::new()).is_empty());
    }

    #[test]
    fn empty_filter_has_no_conditions() {
        assert!(SlotFilter::default().condition().is_empty());
        let filter = SlotFilter {
            tray_id: Some("AGV1".into()),
            status: Some(SlotStatus::Active),
            ..Default::default()
        };
        assert_eq!(filter.condition().len(), 2);
    }
}
