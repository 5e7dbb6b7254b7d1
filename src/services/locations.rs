use crate::{
    db::{with_transaction, DbPool},
    entities::material_location::{
        self, normalize_occupant, ActiveModel as SlotActiveModel, Entity as MaterialLocationEntity,
        SlotStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        slots::{find_slot, find_slots_by_ids, vacant_condition, SlotResponse},
        trays::find_tray,
    },
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveEnum, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait,
    EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

/// What to put into a slot
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct PlaceItemRequest {
    #[validate(length(min = 1, max = 128, message = "Item id must be 1-128 characters"))]
    pub item_id: String,
    #[validate(length(max = 255))]
    pub process_info: Option<String>,
    #[validate(length(max = 64))]
    pub task_id: Option<String>,
}

impl PlaceItemRequest {
    pub fn new(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            process_info: None,
            task_id: None,
        }
    }
}

/// Partial update of one slot record. Only present fields are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SlotPatch {
    /// Surrogate id of the slot
    pub id: i32,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub process_info: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
}

impl SlotPatch {
    pub fn is_empty(&self) -> bool {
        self.item_id.is_none() && self.process_info.is_none() && self.task_id.is_none()
    }

    fn apply(&self, active: &mut SlotActiveModel) {
        if let Some(item_id) = &self.item_id {
            // before_save normalizes the occupant and derives the status
            active.item_id = Set(Some(item_id.clone()));
        }
        if let Some(process_info) = &self.process_info {
            active.process_info = Set(Some(process_info.clone()));
        }
        if let Some(task_id) = &self.task_id {
            active.task_id = Set(Some(task_id.clone()));
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct BatchUpdateRequest {
    #[validate(length(max = 1000))]
    pub updates: Vec<SlotPatch>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct BatchClearRequest {
    #[validate(length(max = 1000))]
    pub ids: Vec<i32>,
    /// Occupant to leave behind; vacant when absent or empty
    #[serde(default)]
    pub replacement: Option<String>,
}

/// Writes an occupant onto every slot matching `condition` and returns the
/// number of rows changed. Process metadata is replaced as given.
async fn write_occupant<C>(
    conn: &C,
    condition: Condition,
    occupant: Option<String>,
    process_info: Option<String>,
    task_id: Option<String>,
) -> Result<u64, ServiceError>
where
    C: ConnectionTrait,
{
    let occupant = normalize_occupant(occupant);
    let status = SlotStatus::classify(occupant.as_deref());

    let result = MaterialLocationEntity::update_many()
        .col_expr(material_location::Column::ItemId, Expr::value(occupant))
        .col_expr(material_location::Column::Status, Expr::value(status.to_value()))
        .col_expr(material_location::Column::ProcessInfo, Expr::value(process_info))
        .col_expr(material_location::Column::TaskId, Expr::value(task_id))
        .col_expr(material_location::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(condition)
        .exec(conn)
        .await?;

    Ok(result.rows_affected)
}

/// Place, clear and batch operations over trays and their slots
#[derive(Clone)]
pub struct LocationManager {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl LocationManager {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(event);
        }
    }

    /// Puts an item into a pre-initialized slot.
    ///
    /// Without `allow_overwrite` the write only lands on a vacant slot; the
    /// occupancy check and the write are one conditional UPDATE, so of two
    /// concurrent placements onto the same vacant slot exactly one succeeds.
    #[instrument(skip(self, request), fields(item_id = %request.item_id))]
    pub async fn place(
        &self,
        tray_id: &str,
        slot_index: i32,
        request: PlaceItemRequest,
        allow_overwrite: bool,
    ) -> Result<SlotResponse, ServiceError> {
        let item_id = request.item_id.trim().to_string();
        if item_id.is_empty() {
            return Err(ServiceError::InvalidInput("item id must not be blank".into()));
        }

        let tray_key = tray_id.to_string();
        let placed_item = item_id.clone();
        let (slot, previous_item_id) = with_transaction(&self.db_pool, "place_item", move |txn| {
            Box::pin(async move {
                let tray = find_tray(txn, &tray_key).await?;
                if !tray.contains_index(slot_index) {
                    return Err(ServiceError::InvalidInput(format!(
                        "slot index {} is outside 1..={} for tray {}",
                        slot_index, tray.capacity, tray.id
                    )));
                }

                let slot = find_slot(txn, &tray_key, slot_index).await?;
                let occupied_conflict = |occupant: Option<&str>| {
                    ServiceError::Conflict(format!(
                        "slot {} of tray {} is occupied by {}",
                        slot_index,
                        tray_key,
                        occupant.unwrap_or("another item")
                    ))
                };
                if !allow_overwrite && !slot.is_vacant() {
                    return Err(occupied_conflict(slot.item_id.as_deref()));
                }

                let mut condition =
                    Condition::all().add(material_location::Column::Id.eq(slot.id));
                if !allow_overwrite {
                    condition = condition.add(vacant_condition());
                }

                let written = write_occupant(
                    txn,
                    condition,
                    Some(item_id),
                    request.process_info,
                    request.task_id,
                )
                .await?;
                if written == 0 {
                    // Lost the race against a concurrent placement
                    return Err(occupied_conflict(None));
                }

                let updated = MaterialLocationEntity::find_by_id(slot.id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| ServiceError::slot_not_found(&tray_key, slot_index))?;
                Ok((updated, slot.item_id))
            })
        })
        .await?;

        info!(tray_id, slot_index, item_id = %placed_item, overwrite = previous_item_id.is_some(), "Item placed");
        self.emit(Event::ItemPlaced {
            tray_id: tray_id.to_string(),
            slot_index,
            item_id: placed_item,
            previous_item_id,
        });

        Ok(slot.into())
    }

    /// Sets a slot's occupant to `replacement` (vacant when `None` or empty)
    /// and resets its process metadata.
    #[instrument(skip(self))]
    pub async fn clear(
        &self,
        tray_id: &str,
        slot_index: i32,
        replacement: Option<String>,
    ) -> Result<SlotResponse, ServiceError> {
        let tray_key = tray_id.to_string();
        let replacement = normalize_occupant(replacement);
        let written_replacement = replacement.clone();

        let (slot, previous_item_id) = with_transaction(&self.db_pool, "clear_slot", move |txn| {
            Box::pin(async move {
                find_tray(txn, &tray_key).await?;
                let slot = find_slot(txn, &tray_key, slot_index).await?;

                write_occupant(
                    txn,
                    Condition::all().add(material_location::Column::Id.eq(slot.id)),
                    written_replacement,
                    None,
                    None,
                )
                .await?;

                let updated = MaterialLocationEntity::find_by_id(slot.id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| ServiceError::slot_not_found(&tray_key, slot_index))?;
                Ok((updated, slot.item_id))
            })
        })
        .await?;

        info!(tray_id, slot_index, "Slot cleared");
        self.emit(Event::SlotCleared {
            tray_id: tray_id.to_string(),
            slot_index,
            previous_item_id,
            replacement,
        });

        Ok(slot.into())
    }

    /// Lowest-index vacant slot of a tray, `None` when the tray is full
    #[instrument(skip(self))]
    pub async fn find_first_available(
        &self,
        tray_id: &str,
    ) -> Result<Option<SlotResponse>, ServiceError> {
        let db = &*self.db_pool;
        find_tray(db, tray_id).await?;

        let slot = MaterialLocationEntity::find()
            .filter(material_location::Column::TrayId.eq(tray_id))
            .filter(vacant_condition())
            .order_by_asc(material_location::Column::SlotIndex)
            .one(db)
            .await?;

        Ok(slot.map(Into::into))
    }

    /// Applies partial updates by surrogate id in one transaction.
    ///
    /// Unknown ids and empty patches are skipped. Occupants are written
    /// without an occupancy check. The result holds the updated records in
    /// ascending id order.
    #[instrument(skip(self, patches), fields(count = patches.len()))]
    pub async fn batch_update_content(
        &self,
        patches: Vec<SlotPatch>,
    ) -> Result<Vec<SlotResponse>, ServiceError> {
        let updated = with_transaction(&self.db_pool, "batch_update_slots", move |txn| {
            Box::pin(async move {
                let mut touched = Vec::with_capacity(patches.len());
                for patch in patches {
                    if patch.is_empty() {
                        continue;
                    }
                    let Some(slot) = MaterialLocationEntity::find_by_id(patch.id).one(txn).await?
                    else {
                        warn!(slot_id = patch.id, "Skipping update for unknown slot");
                        continue;
                    };

                    let mut active: SlotActiveModel = slot.into();
                    patch.apply(&mut active);
                    active.update(txn).await?;
                    touched.push(patch.id);
                }

                find_slots_by_ids(txn, &touched).await
            })
        })
        .await?;

        let slot_ids: Vec<i32> = updated.iter().map(|slot| slot.id).collect();
        info!(updated = slot_ids.len(), "Batch slot update applied");
        if !slot_ids.is_empty() {
            self.emit(Event::SlotsBatchUpdated { slot_ids });
        }

        Ok(updated.into_iter().map(Into::into).collect())
    }

    /// Clears every existing slot in `ids` to `replacement` in one
    /// transaction; unknown ids are skipped. Returns the cleared records in
    /// ascending id order.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn batch_clear(
        &self,
        ids: Vec<i32>,
        replacement: Option<String>,
    ) -> Result<Vec<SlotResponse>, ServiceError> {
        let cleared = with_transaction(&self.db_pool, "batch_clear_slots", move |txn| {
            Box::pin(async move {
                let existing: Vec<i32> = find_slots_by_ids(txn, &ids)
                    .await?
                    .into_iter()
                    .map(|slot| slot.id)
                    .collect();
                if existing.is_empty() {
                    return Ok(Vec::new());
                }

                write_occupant(
                    txn,
                    Condition::all().add(material_location::Column::Id.is_in(existing.clone())),
                    replacement,
                    None,
                    None,
                )
                .await?;

                find_slots_by_ids(txn, &existing).await
            })
        })
        .await?;

        let slot_ids: Vec<i32> = cleared.iter().map(|slot| slot.id).collect();
        info!(cleared = slot_ids.len(), "Batch slot clear applied");
        if !slot_ids.is_empty() {
            self.emit(Event::SlotsBatchCleared { slot_ids });
        }

        Ok(cleared.into_iter().map(Into::into).collect())
    }

    /// Clears every slot of a tray; returns them ordered by index
    #[instrument(skip(self))]
    pub async fn clear_tray(&self, tray_id: &str) -> Result<Vec<SlotResponse>, ServiceError> {
        let tray_key = tray_id.to_string();
        let slots = with_transaction(&self.db_pool, "clear_tray", move |txn| {
            Box::pin(async move {
                find_tray(txn, &tray_key).await?;

                write_occupant(
                    txn,
                    Condition::all()
                        .add(material_location::Column::TrayId.eq(tray_key.as_str())),
                    None,
                    None,
                    None,
                )
                .await?;

                Ok(MaterialLocationEntity::find()
                    .filter(material_location::Column::TrayId.eq(tray_key.as_str()))
                    .order_by_asc(material_location::Column::SlotIndex)
                    .all(txn)
                    .await?)
            })
        })
        .await?;

        let slots_cleared = slots.len() as u64;
        info!(tray_id, slots_cleared, "Tray cleared");
        self.emit(Event::TrayCleared {
            tray_id: tray_id.to_string(),
            slots_cleared,
        });

        Ok(slots.into_iter().map(Into::into).collect())
    }
}
