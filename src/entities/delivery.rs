use chrono::NaiveTime;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DeliveryStatus {
    #[sea_orm(string_value = "preparing_order")]
    PreparingOrder,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "delivered")]
    Delivered,
}

/// Delivery fee record, one per delivery order.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "deliveries")]
#[schema(as = Delivery)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub order_id: i32,
    pub address: String,
    #[sea_orm(column_type = "Decimal(Some((8, 2)))")]
    #[serde(serialize_with = "crate::entities::money::serialize")]
    pub fee: Decimal,
    pub delivery_status: DeliveryStatus,
    #[schema(value_type = Option<String>, example = "19:45:00")]
    pub arrival_time: Option<NaiveTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id",
        on_delete = "Cascade"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
