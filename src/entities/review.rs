use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
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
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Recommendation {
    #[sea_orm(string_value = "yes")]
    Yes,
    #[sea_orm(string_value = "neutral")]
    Neutral,
    #[sea_orm(string_value = "no")]
    No,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "reviews")]
#[schema(as = Review)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_name: String,
    pub email: String,
    pub title: String,
    pub text: String,
    /// 1..=5
    pub rating: i32,
    pub dishes_ordered: String,
    pub date_of_visit: NaiveDate,
    pub would_recommend: Recommendation,
    pub is_verified: bool,
    pub helpful_count: i32,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr> {
        let mut active_model = self;
        if insert && active_model.submitted_at.is_not_set() {
            active_model.submitted_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}
