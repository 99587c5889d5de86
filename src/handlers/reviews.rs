use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use super::common::{created_response, no_content_response, success_response, PaginationParams};
use crate::{
    entities::review,
    errors::ServiceError,
    services::reviews::{ReviewSearch, ReviewStats, SubmitReviewRequest},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct HelpfulCount {
    pub helpful_count: i32,
}

#[utoipa::path(
    get,
    path = "/api/v1/reviews",
    summary = "Verified reviews",
    params(PaginationParams),
    responses((status = 200, description = "Verified reviews, newest first", body = ApiResponse<PaginatedResponse<review::Model>>)),
    tag = "reviews"
)]
pub async fn list_reviews(
    State(state): State<AppState>,
    Query(paging): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<review::Model>> {
    let (page, per_page) = paging.resolve(&state.config);
    let (reviews, total) = state.services.reviews.list_public(page, per_page).await?;
    Ok(success_response(PaginatedResponse::new(
        reviews, total, page, per_page,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/reviews",
    summary = "Submit review",
    description = "Stores a review; it is published once an admin verifies it",
    request_body = SubmitReviewRequest,
    responses(
        (status = 201, description = "Review stored", body = ApiResponse<review::Model>),
        (status = 400, description = "Invalid review", body = crate::errors::ErrorResponse),
    ),
    tag = "reviews"
)]
pub async fn submit_review(
    State(state): State<AppState>,
    Json(request): Json<SubmitReviewRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let review = state.services.reviews.submit(request).await?;
    Ok(created_response(review))
}

#[utoipa::path(
    post,
    path = "/api/v1/reviews/{id}/helpful",
    summary = "Vote helpful",
    params(("id" = i32, Path, description = "Review id")),
    responses(
        (status = 200, description = "New helpful count", body = ApiResponse<HelpfulCount>),
        (status = 404, description = "Review not found", body = crate::errors::ErrorResponse),
    ),
    tag = "reviews"
)]
pub async fn mark_helpful(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<HelpfulCount> {
    let helpful_count = state.services.reviews.mark_helpful(id).await?;
    Ok(success_response(HelpfulCount { helpful_count }))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/reviews",
    summary = "Search reviews",
    params(
        ("q" = Option<String>, Query, description = "Matches name, title or text"),
        ("verified" = Option<bool>, Query, description = "Filter on verification"),
        PaginationParams,
    ),
    responses((status = 200, description = "Matching reviews", body = ApiResponse<PaginatedResponse<review::Model>>)),
    security(("Bearer" = [])),
    tag = "reviews-admin"
)]
pub async fn search_reviews(
    State(state): State<AppState>,
    Query(search): Query<ReviewSearch>,
    Query(paging): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<review::Model>> {
    let (page, per_page) = paging.resolve(&state.config);
    let (reviews, total) = state
        .services
        .reviews
        .search(&search, page, per_page)
        .await?;
    Ok(success_response(PaginatedResponse::new(
        reviews, total, page, per_page,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/reviews/{id}/verify",
    summary = "Verify review",
    params(("id" = i32, Path, description = "Review id")),
    responses(
        (status = 200, description = "Review published", body = ApiResponse<review::Model>),
        (status = 404, description = "Review not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "reviews-admin"
)]
pub async fn verify_review(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<review::Model> {
    let review = state.services.reviews.verify(id).await?;
    Ok(success_response(review))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/reviews/{id}",
    summary = "Delete review",
    params(("id" = i32, Path, description = "Review id")),
    responses(
        (status = 204, description = "Review deleted"),
        (status = 404, description = "Review not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "reviews-admin"
)]
pub async fn delete_review(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.reviews.delete(id).await?;
    Ok(no_content_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/reviews/stats",
    summary = "Review statistics",
    responses((status = 200, description = "Average rating, total and pending counts", body = ApiResponse<ReviewStats>)),
    security(("Bearer" = [])),
    tag = "reviews-admin"
)]
pub async fn review_stats(State(state): State<AppState>) -> ApiResult<ReviewStats> {
    let stats = state.services.reviews.stats().await?;
    Ok(success_response(stats))
}
