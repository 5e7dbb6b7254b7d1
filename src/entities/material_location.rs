use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Occupant values reserved to mark a slot as unusable.
pub const DISABLED_SENTINELS: [&str; 2] = ["-99", "-1"];

/// Occupancy state of a slot, derived from its occupant.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    #[sea_orm(string_value = "empty")]
    Empty,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "disabled")]
    Disabled,
}

impl SlotStatus {
    /// Derives the status for an occupant value.
    pub fn classify(occupant: Option<&str>) -> Self {
        match occupant.map(str::trim) {
            None | Some("") => SlotStatus::Empty,
            Some(value) if is_disabled_sentinel(value) => SlotStatus::Disabled,
            Some(_) => SlotStatus::Active,
        }
    }
}

pub fn is_disabled_sentinel(value: &str) -> bool {
    DISABLED_SENTINELS.contains(&value.trim())
}

/// Blank occupants are stored as NULL.
pub fn normalize_occupant(occupant: Option<String>) -> Option<String> {
    occupant.filter(|value| !value.trim().is_empty())
}

/// One addressable position on a tray.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "material_locations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tray_id: String,
    pub slot_index: i32,
    pub item_id: Option<String>,
    pub status: SlotStatus,
    pub process_info: Option<String>,
    pub task_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn is_vacant(&self) -> bool {
        self.status == SlotStatus::Empty
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tray::Entity",
        from = "Column::TrayId",
        to = "super::tray::Column::Id",
        on_delete = "Cascade"
    )]
    Tray,
}

impl Related<super::tray::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tray.def()
    }
}

/// A fully populated vacant slot. Bulk inserts skip `before_save`, so every
/// column is set here.
pub fn vacant_slot(tray_id: &str, slot_index: i32, now: DateTime<Utc>) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::NotSet,
        tray_id: Set(tray_id.to_string()),
        slot_index: Set(slot_index),
        item_id: Set(None),
        status: Set(SlotStatus::Empty),
        process_info: Set(None),
        task_id: Set(None),
        updated_at: Set(now),
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        if let ActiveValue::Set(occupant) = &active_model.item_id {
            let occupant = normalize_occupant(occupant.clone());
            active_model.status = Set(SlotStatus::classify(occupant.as_deref()));
            active_model.item_id = Set(occupant);
        } else if insert {
            active_model.item_id = Set(None);
            active_model.status = Set(SlotStatus::Empty);
        }

        active_model.updated_at = Set(Utc::now());

        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use std::str::FromStr;

    #[rstest]
    #[case(None, SlotStatus::Empty)]
    #[case(Some(""), SlotStatus::Empty)]
    #[case(Some("   "), SlotStatus::Empty)]
    #[case(Some("-99"), SlotStatus::Disabled)]
    #[case(Some("-1"), SlotStatus::Disabled)]
    #[case(Some("ITEM7"), SlotStatus::Active)]
    #[case(Some("-2"), SlotStatus::Active)]
    fn classify_follows_occupant(#[case] occupant: Option<&str>, #[case] expected: SlotStatus) {
        assert_eq!(SlotStatus::classify(occupant), expected);
    }

    #[test]
    fn status_string_forms_match_storage() {
        assert_eq!(SlotStatus::Disabled.to_string(), "disabled");
        assert_eq!(SlotStatus::from_str("active").unwrap(), SlotStatus::Active);
        assert_eq!(
            serde_json::to_string(&SlotStatus::Empty).unwrap(),
            "\"empty\""
        );
        assert!(SlotStatus::from_str("occupied").is_err());
    }

    #[test]
    fn normalize_turns_blank_into_none() {
        assert_eq!(normalize_occupant(Some(String::new())), None);
        assert_eq!(normalize_occupant(Some(" ".into())), None);
        assert_eq!(normalize_occupant(Some("A".into())), Some("A".into()));
        assert_eq!(normalize_occupant(None), None);
    }

    proptest! {
        #[test]
        fn non_sentinel_occupants_are_active(item in "[A-Za-z0-9_]{1,24}") {
            prop_assume!(!is_disabled_sentinel(&item));
            prop_assert_eq!(SlotStatus::classify(Some(&item)), SlotStatus::Active);
        }

        #[test]
        fn normalized_occupant_is_never_blank(raw in ".{0,12}") {
            let normalized = normalize_occupant(Some(raw));
            prop_assert!(normalized.map(|v| !v.trim().is_empty()).unwrap_or(true));
        }
    }
}
