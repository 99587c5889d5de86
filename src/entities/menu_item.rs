use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "menu_items")]
#[schema(as = MenuItem)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub subcategory_id: i32,
    pub name: String,
    pub description: String,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    #[serde(serialize_with = "crate::entities::money::serialize")]
    pub price: Decimal,
    pub image_url: Option<String>,
    pub is_available: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::menu_subcategory::Entity",
        from = "Column::SubcategoryId",
        to = "super::menu_subcategory::Column::Id",
        on_delete = "Cascade"
    )]
    Subcategory,
    #[sea_orm(has_many = "super::promotion::Entity")]
    Promotions,
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::menu_subcategory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subcategory.def()
    }
}

impl Related<super::promotion::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Promotions.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
