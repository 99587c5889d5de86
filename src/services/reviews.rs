use chrono::NaiveDate;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    entities::review::{self, Recommendation},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{icontains, today},
};

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct SubmitReviewRequest {
    #[validate(length(min = 1, max = 100, message = "Your name is required"))]
    pub user_name: String,
    #[validate(email(message = "A valid email address is required"), length(max = 100))]
    pub email: String,
    #[validate(length(min = 1, max = 100, message = "A title is required"))]
    pub title: String,
    #[validate(length(min = 1, max = 500, message = "Reviews are limited to 500 characters"))]
    pub text: String,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(max = 255))]
    #[serde(default)]
    pub dishes_ordered: String,
    pub date_of_visit: NaiveDate,
    pub would_recommend: Recommendation,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ReviewSearch {
    /// Matches name, title or text
    pub q: Option<String>,
    pub verified: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReviewStats {
    pub average_rating: f64,
    pub total: u64,
    pub pending: u64,
}

/// Mean rating rounded to one decimal place; 0.0 without reviews.
pub fn average_rating(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    let mean = sum as f64 / ratings.len() as f64;
    (mean * 10.0).round() / 10.0
}

#[derive(Clone)]
pub struct ReviewService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ReviewService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Stores a new, unverified review
    #[instrument(skip(self, request), fields(rating = request.rating))]
    pub async fn submit(&self, request: SubmitReviewRequest) -> Result<review::Model, ServiceError> {
        request.validate()?;
        if request.date_of_visit > today() {
            return Err(ServiceError::ValidationError(
                "Date of visit cannot be in the future".into(),
            ));
        }

        let saved = review::ActiveModel {
            user_name: Set(request.user_name.trim().to_string()),
            email: Set(request.email.trim().to_lowercase()),
            title: Set(request.title.trim().to_string()),
            text: Set(request.text.trim().to_string()),
            rating: Set(request.rating),
            dishes_ordered: Set(request.dishes_ordered.trim().to_string()),
            date_of_visit: Set(request.date_of_visit),
            would_recommend: Set(request.would_recommend),
            is_verified: Set(false),
            helpful_count: Set(0),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to save review");
            ServiceError::DatabaseError(e)
        })?;

        info!(review_id = saved.id, "Review submitted");
        self.event_sender
            .send_or_log(Event::ReviewSubmitted(saved.id))
            .await;
        Ok(saved)
    }

    /// Verified reviews, newest first
    pub async fn list_public(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<review::Model>, u64), ServiceError> {
        let paginator = review::Entity::find()
            .filter(review::Column::IsVerified.eq(true))
            .order_by_desc(review::Column::SubmittedAt)
            .order_by_desc(review::Column::Id)
            .paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    pub async fn latest_verified(&self, limit: u64) -> Result<Vec<review::Model>, ServiceError> {
        Ok(review::Entity::find()
            .filter(review::Column::IsVerified.eq(true))
            .order_by_desc(review::Column::SubmittedAt)
            .order_by_desc(review::Column::Id)
            .limit(limit)
            .all(&*self.db)
            .await?)
    }

    /// Increments the helpful counter and returns the new count.
    #[instrument(skip(self))]
    pub async fn mark_helpful(&self, id: i32) -> Result<i32, ServiceError> {
        let updated = review::Entity::update_many()
            .col_expr(
                review::Column::HelpfulCount,
                Expr::col(review::Column::HelpfulCount).add(1),
            )
            .filter(review::Column::Id.eq(id))
            .exec(&*self.db)
            .await?;
        if updated.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Review {} not found", id)));
        }
        let review = self.get(id).await?;
        Ok(review.helpful_count)
    }

    pub async fn get(&self, id: i32) -> Result<review::Model, ServiceError> {
        review::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Review {} not found", id)))
    }

    /// Admin search over name, title or text
    pub async fn search(
        &self,
        params: &ReviewSearch,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<review::Model>, u64), ServiceError> {
        let mut query = review::Entity::find();
        if let Some(q) = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(icontains(review::Column::UserName, q))
                    .add(icontains(review::Column::Title, q))
                    .add(icontains(review::Column::Text, q)),
            );
        }
        if let Some(verified) = params.verified {
            query = query.filter(review::Column::IsVerified.eq(verified));
        }
        let paginator = query
            .order_by_desc(review::Column::SubmittedAt)
            .order_by_desc(review::Column::Id)
            .paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    #[instrument(skip(self))]
    pub async fn verify(&self, id: i32) -> Result<review::Model, ServiceError> {
        let current = self.get(id).await?;
        if current.is_verified {
            return Ok(current);
        }
        let mut active: review::ActiveModel = current.into();
        active.is_verified = Set(true);
        let verified = active.update(&*self.db).await?;
        info!(review_id = id, "Review verified");
        self.event_sender
            .send_or_log(Event::ReviewVerified(id))
            .await;
        Ok(verified)
    }

    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let result = review::Entity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Review {} not found", id)));
        }
        info!(review_id = id, "Review deleted");
        Ok(())
    }

    pub async fn stats(&self) -> Result<ReviewStats, ServiceError> {
        let ratings: Vec<i32> = review::Entity::find()
            .select_only()
            .column(review::Column::Rating)
            .into_tuple()
            .all(&*self.db)
            .await?;
        let pending = review::Entity::find()
            .filter(review::Column::IsVerified.eq(false))
            .count(&*self.db)
            .await?;
        Ok(ReviewStats {
            average_rating: average_rating(&ratings),
            total: ratings.len() as u64,
            pending,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SubmitReviewRequest {
        SubmitReviewRequest {
            user_name: "Priya".into(),
            email: "priya@umail.com".into(),
            title: "Lovely evening".into(),
            text: "The curry was excellent.".into(),
            rating: 5,
            dishes_ordered: "Curry, Naan".into(),
            date_of_visit: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            would_recommend: Recommendation::Yes,
        }
    }

    #[test]
    fn average_is_zero_without_reviews() {
        assert_eq!(average_rating(&[]), 0.0);
        assert_eq!(average_rating(&[5, 4, 4]), 4.3);
    }

    #[test]
    fn rating_and_length_limits() {
        assert!(request().validate().is_ok());

        let mut bad = request();
        bad.rating = 6;
        assert!(bad.validate().unwrap_err().field_errors().contains_key("rating"));

        let mut long = request();
        long.text = "x".repeat(501);
        assert!(long.validate().unwrap_err().field_errors().contains_key("text"));
    }
}
