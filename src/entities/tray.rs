use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, Set};
use serde::{Deserialize, Serialize};

/// Upper bound on slots per tray
pub const MAX_CAPACITY: i32 = 10_000;

/// A carrier with a fixed number of numbered slots.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trays")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub description: Option<String>,
    pub capacity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Whether `slot_index` addresses a slot of this tray (1-based).
    pub fn contains_index(&self, slot_index: i32) -> bool {
        (1..=self.capacity).contains(&slot_index)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::material_location::Entity")]
    MaterialLocations,
}

impl Related<super::material_location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MaterialLocations.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            active_model.created_at = Set(now);
        }
        active_model.updated_at = Set(now);

        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn tray(capacity: i32) -> Model {
        let now = Utc::now();
        Model {
            id: "AGV1".into(),
            description: None,
            capacity,
            created_at: now,
            updated_at: now,
        }
    }

    #[rstest]
    #[case(3, 1, true)]
    #[case(3, 3, true)]
    #[case(3, 0, false)]
    #[case(3, 4, false)]
    #[case(3, -1, false)]
    fn contains_index_is_one_based(#[case] capacity: i32, #[case] index: i32, #[case] expected: bool) {
        assert_eq!(tray(capacity).contains_index(index), expected);
    }
}
