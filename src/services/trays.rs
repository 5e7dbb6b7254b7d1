use crate::{
    db::{with_transaction, DbPool},
    entities::{
        material_location::{self, Entity as MaterialLocationEntity},
        tray::{self, ActiveModel as TrayActiveModel, Entity as TrayEntity, Model as TrayModel},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{page_bounds, slots},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegisterTrayRequest {
    #[validate(length(min = 1, max = 64, message = "Tray id must be 1-64 characters"))]
    pub id: String,
    #[validate(length(max = 255))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 10000, message = "Capacity must be between 1 and 10000"))]
    pub capacity: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateTrayRequest {
    #[validate(length(max = 255))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReconfigureCapacityRequest {
    #[validate(range(min = 1, max = 10000, message = "Capacity must be between 1 and 10000"))]
    pub capacity: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TrayResponse {
    pub id: String,
    pub description: Option<String>,
    pub capacity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TrayModel> for TrayResponse {
    fn from(model: TrayModel) -> Self {
        Self {
            id: model.id,
            description: model.description,
            capacity: model.capacity,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TrayListResponse {
    pub trays: Vec<TrayResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Rejects capacities outside `1..=MAX_CAPACITY`.
pub(crate) fn check_capacity(capacity: i32) -> Result<(), ServiceError> {
    if (1..=tray::MAX_CAPACITY).contains(&capacity) {
        Ok(())
    } else {
        Err(ServiceError::InvalidInput(format!(
            "capacity must be between 1 and {}, got {}",
            tray::MAX_CAPACITY,
            capacity
        )))
    }
}

/// Loads a tray on any connection or transaction, `NotFound` if absent.
pub(crate) async fn find_tray<C>(conn: &C, tray_id: &str) -> Result<TrayModel, ServiceError>
where
    C: ConnectionTrait,
{
    TrayEntity::find_by_id(tray_id.to_string())
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::tray_not_found(tray_id))
}

/// Registry of trays and their slot capacity
#[derive(Clone)]
pub struct TrayRegistry {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl TrayRegistry {
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

    /// Registers a tray and creates its vacant slots in one transaction
    #[instrument(skip(self, request), fields(tray_id = %request.id, capacity = request.capacity))]
    pub async fn register(&self, request: RegisterTrayRequest) -> Result<TrayResponse, ServiceError> {
        let tray_id = request.id.trim().to_string();
        if tray_id.is_empty() {
            return Err(ServiceError::InvalidInput("tray id must not be blank".into()));
        }
        check_capacity(request.capacity)?;

        let capacity = request.capacity;
        let description = request.description;
        let id = tray_id.clone();

        let tray = with_transaction(&self.db_pool, "register_tray", move |txn| {
            Box::pin(async move {
                if TrayEntity::find_by_id(id.clone()).one(txn).await?.is_some() {
                    return Err(ServiceError::DuplicateKey(format!(
                        "tray {} is already registered",
                        id
                    )));
                }

                let tray = TrayActiveModel {
                    id: Set(id.clone()),
                    description: Set(description),
                    capacity: Set(capacity),
                    ..Default::default()
                }
                .insert(txn)
                .await
                .map_err(|e| match e.sql_err() {
                    Some(SqlErr::UniqueConstraintViolation(_)) => {
                        ServiceError::DuplicateKey(format!("tray {} is already registered", id))
                    }
                    _ => ServiceError::from(e),
                })?;

                slots::insert_vacant_slots(txn, &tray.id, 1..=capacity).await?;
                Ok(tray)
            })
        })
        .await?;

        info!(tray_id = %tray.id, capacity, "Tray registered");
        self.emit(Event::TrayRegistered {
            tray_id: tray.id.clone(),
            capacity,
        });

        Ok(tray.into())
    }

    #[instrument(skip(self))]
    pub async fn lookup(&self, tray_id: &str) -> Result<TrayResponse, ServiceError> {
        find_tray(&*self.db_pool, tray_id).await.map(Into::into)
    }

    /// Lists trays ordered by id
    #[instrument(skip(self))]
    pub async fn list(&self, page: u64, per_page: u64) -> Result<TrayListResponse, ServiceError> {
        let (page, per_page) = page_bounds(page, per_page);
        let paginator = TrayEntity::find()
            .order_by_asc(tray::Column::Id)
            .paginate(&*self.db_pool, per_page);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count trays");
            ServiceError::db_error(e)
        })?;
        let trays = paginator.fetch_page(page - 1).await.map_err(|e| {
            error!(error = %e, page, per_page, "Failed to fetch trays page");
            ServiceError::db_error(e)
        })?;

        Ok(TrayListResponse {
            trays: trays.into_iter().map(Into::into).collect(),
            total,
            page,
            per_page,
        })
    }

    /// Updates the description; capacity changes go through `reconfigure_capacity`
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        tray_id: &str,
        request: UpdateTrayRequest,
    ) -> Result<TrayResponse, ServiceError> {
        let id = tray_id.to_string();
        let tray = with_transaction(&self.db_pool, "update_tray", move |txn| {
            Box::pin(async move {
                let tray = find_tray(txn, &id).await?;
                let mut active: TrayActiveModel = tray.into();
                active.description = Set(request.description);
                Ok(active.update(txn).await?)
            })
        })
        .await?;

        info!(tray_id = %tray.id, "Tray updated");
        self.emit(Event::TrayUpdated {
            tray_id: tray.id.clone(),
        });

        Ok(tray.into())
    }

    /// Deletes a tray and every slot on it; returns the number of slots removed
    #[instrument(skip(self))]
    pub async fn delete(&self, tray_id: &str) -> Result<u64, ServiceError> {
        let id = tray_id.to_string();
        let slots_removed = with_transaction(&self.db_pool, "delete_tray", move |txn| {
            Box::pin(async move {
                find_tray(txn, &id).await?;

                // Explicit so the cascade does not depend on backend FK enforcement
                let removed = MaterialLocationEntity::delete_many()
                    .filter(material_location::Column::TrayId.eq(id.as_str()))
                    .exec(txn)
                    .await?
                    .rows_affected;
                TrayEntity::delete_by_id(id.clone()).exec(txn).await?;
                Ok(removed)
            })
        })
        .await?;

        info!(tray_id, slots_removed, "Tray deleted");
        self.emit(Event::TrayDeleted {
            tray_id: tray_id.to_string(),
            slots_removed,
        });

        Ok(slots_removed)
    }

    /// Changes a tray's capacity, reconciling its slots.
    ///
    /// Growing creates the missing vacant slots. Shrinking removes the slots
    /// above the new capacity and is refused with `Conflict` if any of them
    /// holds an occupant (disabled sentinels included).
    #[instrument(skip(self))]
    pub async fn reconfigure_capacity(
        &self,
        tray_id: &str,
        new_capacity: i32,
    ) -> Result<TrayResponse, ServiceError> {
        check_capacity(new_capacity)?;

        let id = tray_id.to_string();
        let (tray, old_capacity) =
            with_transaction(&self.db_pool, "reconfigure_tray_capacity", move |txn| {
                Box::pin(async move {
                    let tray = find_tray(txn, &id).await?;
                    let old_capacity = tray.capacity;

                    if new_capacity > old_capacity {
                        slots::insert_vacant_slots(txn, &id, (old_capacity + 1)..=new_capacity)
                            .await?;
                    } else if new_capacity < old_capacity {
                        let occupied = MaterialLocationEntity::find()
                            .filter(material_location::Column::TrayId.eq(id.as_str()))
                            .filter(material_location::Column::SlotIndex.gt(new_capacity))
                            .filter(slots::occupied_condition())
                            .order_by_asc(material_location::Column::SlotIndex)
                            .all(txn)
                            .await?;
                        if !occupied.is_empty() {
                            let indices: Vec<String> =
                                occupied.iter().map(|s| s.slot_index.to_string()).collect();
                            return Err(ServiceError::Conflict(format!(
                                "cannot shrink tray {} to {}: slots {} are occupied",
                                id,
                                new_capacity,
                                indices.join(", ")
                            )));
                        }

                        MaterialLocationEntity::delete_many()
                            .filter(material_location::Column::TrayId.eq(id.as_str()))
                            .filter(material_location::Column::SlotIndex.gt(new_capacity))
                            .exec(txn)
                            .await?;
                    }

                    let mut active: TrayActiveModel = tray.into();
                    active.capacity = Set(new_capacity);
                    let tray = active.update(txn).await?;
                    Ok((tray, old_capacity))
                })
            })
            .await?;

        info!(tray_id, old_capacity, new_capacity, "Tray capacity reconfigured");
        if old_capacity != new_capacity {
            self.emit(Event::TrayCapacityChanged {
                tray_id: tray_id.to_string(),
                old_capacity,
                new_capacity,
            });
        }

        Ok(tray.into())
    }
}
