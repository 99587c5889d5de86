use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Kitchen-facing order state. `Preparing` is what customers see as "in progress".
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
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "preparing")]
    Preparing,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

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
pub enum OrderType {
    #[sea_orm(string_value = "delivery")]
    Delivery,
    #[sea_orm(string_value = "takeout")]
    Takeout,
    #[sea_orm(string_value = "dine-in")]
    #[serde(rename = "dine-in")]
    #[strum(serialize = "dine-in")]
    DineIn,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "orders")]
#[schema(as = Order)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Null for anonymous carts
    pub user_id: Option<Uuid>,
    pub session_id: Option<String>,
    pub order_type: OrderType,
    pub status: OrderStatus,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    #[serde(serialize_with = "crate::entities::money::serialize")]
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Human-readable order number, e.g. `ORD-007`
    pub fn display_number(&self) -> String {
        display_number(self.id)
    }
}

pub fn display_number(id: i32) -> String {
    format!("ORD-{:03}", id)
}

/// Accepts `42`, `ORD-042` or `ord-42`
pub fn parse_display_number(value: &str) -> Option<i32> {
    let trimmed = value.trim();
    let digits = match trimmed.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("ORD-") => &trimmed[4..],
        _ => trimmed,
    };
    digits.parse().ok()
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
    #[sea_orm(has_one = "super::delivery::Entity")]
    Delivery,
    #[sea_orm(has_one = "super::takeout::Entity")]
    Takeout,
    #[sea_orm(has_one = "super::transaction::Entity")]
    Transaction,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::delivery::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Delivery.def()
    }
}

impl Related<super::takeout::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Takeout.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transaction.def()
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
    fn display_number_is_zero_padded() {
        assert_eq!(display_number(7), "ORD-007");
        assert_eq!(display_number(1234), "ORD-1234");
    }

    #[test]
    fn parses_display_numbers_and_raw_ids() {
        assert_eq!(parse_display_number("ORD-042"), Some(42));
        assert_eq!(parse_display_number("ord-5"), Some(5));
        assert_eq!(parse_display_number(" 17 "), Some(17));
        assert_eq!(parse_display_number("Smith"), None);
    }

    #[test]
    fn status_parsing_is_case_insensitive() {
        assert_eq!(OrderStatus::from_str("PREPARING").unwrap(), OrderStatus::Preparing);
        assert_eq!(OrderType::from_str("Dine-In").unwrap(), OrderType::DineIn);
        assert!(OrderStatus::from_str("shipped").is_err());
    }
}
