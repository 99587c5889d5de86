use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Reservation lifecycle state.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ReservationStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "seated")]
    Seated,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "no-show")]
    #[serde(rename = "no-show")]
    #[strum(serialize = "no-show")]
    NoShow,
}

impl ReservationStatus {
    /// Completed, cancelled and no-show reservations accept no further changes
    pub fn is_final(self) -> bool {
        matches!(
            self,
            ReservationStatus::Completed | ReservationStatus::Cancelled | ReservationStatus::NoShow
        )
    }

    /// Legal next states
    pub fn next_states(self) -> &'static [ReservationStatus] {
        use ReservationStatus::*;
        match self {
            Pending => &[Confirmed, Cancelled],
            Confirmed => &[Seated, Cancelled, NoShow],
            Seated => &[Completed],
            Completed | Cancelled | NoShow => &[],
        }
    }

    pub fn can_transition_to(self, next: ReservationStatus) -> bool {
        self.next_states().contains(&next)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "reservations")]
#[schema(as = Reservation)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Null for walk-in bookings entered by staff
    pub user_id: Option<Uuid>,
    pub table_id: i32,
    pub date: NaiveDate,
    #[schema(value_type = String, example = "19:30:00")]
    pub time: NaiveTime,
    pub party_size: i32,
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub special_requests: Option<String>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::table::Entity",
        from = "Column::TableId",
        to = "super::table::Column::Id"
    )]
    Table,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::table::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Table.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr> {
        let mut active_model = self;
        let now = Utc::now();
        if insert && active_model.created_at.is_not_set() {
            active_model.created_at = Set(now);
        }
        active_model.updated_at = Set(now);
        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn lifecycle_transitions() {
        use ReservationStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(NoShow));
        assert!(Seated.can_transition_to(Completed));
        assert!(!Seated.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Seated));
        for last in [Completed, Cancelled, NoShow] {
            assert!(last.is_final());
            assert!(last.next_states().is_empty());
        }
    }

    #[test]
    fn parses_and_displays_wire_names() {
        assert_eq!(
            ReservationStatus::from_str("No-Show").unwrap(),
            ReservationStatus::NoShow
        );
        assert_eq!(ReservationStatus::NoShow.to_string(), "no-show");
        assert_eq!(
            serde_json::to_string(&ReservationStatus::Confirmed).unwrap(),
            "\"confirmed\""
        );
    }
}
