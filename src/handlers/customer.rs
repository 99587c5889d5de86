//! Endpoints for the signed-in customer's own account, orders and reservations.

use axum::{
    extract::{Path, State},
    Json,
};

use super::common::success_response;
use crate::{
    auth::AuthUser,
    entities::reservation,
    services::{
        accounts::{UpdateProfileRequest, UserProfile},
        orders::{OrderDetail, OrderSummary},
        reports::CustomerOverview,
        reservations::ModifyReservationRequest,
        today,
    },
    ApiResponse, ApiResult, AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/me",
    summary = "Current profile",
    responses(
        (status = 200, description = "Profile", body = ApiResponse<UserProfile>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "customer"
)]
pub async fn get_profile(State(state): State<AppState>, user: AuthUser) -> ApiResult<UserProfile> {
    let profile = state.services.accounts.profile(user.id()?).await?;
    Ok(success_response(profile))
}

#[utoipa::path(
    put,
    path = "/api/v1/me",
    summary = "Update profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<UserProfile>),
        (status = 400, description = "Invalid profile data", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already in use", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "customer"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<UserProfile> {
    let profile = state
        .services
        .accounts
        .update_profile(user.id()?, request)
        .await?;
    Ok(success_response(profile))
}

#[utoipa::path(
    get,
    path = "/api/v1/me/overview",
    summary = "Customer dashboard",
    responses((status = 200, description = "Order and reservation counts with recent activity", body = ApiResponse<CustomerOverview>)),
    security(("Bearer" = [])),
    tag = "customer"
)]
pub async fn overview(State(state): State<AppState>, user: AuthUser) -> ApiResult<CustomerOverview> {
    let overview = state
        .services
        .reports
        .customer_overview(user.id()?, today())
        .await?;
    Ok(success_response(overview))
}

#[utoipa::path(
    get,
    path = "/api/v1/me/orders",
    summary = "My orders",
    responses((status = 200, description = "Orders, newest first", body = ApiResponse<Vec<OrderSummary>>)),
    security(("Bearer" = [])),
    tag = "customer"
)]
pub async fn my_orders(State(state): State<AppState>, user: AuthUser) -> ApiResult<Vec<OrderSummary>> {
    let orders = state.services.orders.list_for_user(user.id()?).await?;
    Ok(success_response(orders))
}

#[utoipa::path(
    get,
    path = "/api/v1/me/orders/{id}",
    summary = "My order",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with lines, fee and payment", body = ApiResponse<OrderDetail>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "customer"
)]
pub async fn my_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<OrderDetail> {
    let detail = state.services.orders.detail_for_user(user.id()?, id).await?;
    Ok(success_response(detail))
}

#[utoipa::path(
    get,
    path = "/api/v1/me/reservations",
    summary = "My reservations",
    responses((status = 200, description = "Reservations by date and time, latest first", body = ApiResponse<Vec<reservation::Model>>)),
    security(("Bearer" = [])),
    tag = "customer"
)]
pub async fn my_reservations(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Vec<reservation::Model>> {
    let reservations = state.services.reservations.list_for_user(user.id()?).await?;
    Ok(success_response(reservations))
}

#[utoipa::path(
    post,
    path = "/api/v1/me/reservations/{id}/cancel",
    summary = "Cancel my reservation",
    params(("id" = i32, Path, description = "Reservation id")),
    responses(
        (status = 200, description = "Reservation cancelled", body = ApiResponse<reservation::Model>),
        (status = 400, description = "Reservation already finished", body = crate::errors::ErrorResponse),
        (status = 404, description = "Reservation not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "customer"
)]
pub async fn cancel_reservation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> ApiResult<reservation::Model> {
    let cancelled = state
        .services
        .reservations
        .cancel_for_user(user.id()?, id)
        .await?;
    Ok(success_response(cancelled))
}

#[utoipa::path(
    put,
    path = "/api/v1/me/reservations/{id}",
    summary = "Modify my reservation",
    description = "Change date, time or party size. The slot is re-checked and the table may change.",
    params(("id" = i32, Path, description = "Reservation id")),
    request_body = ModifyReservationRequest,
    responses(
        (status = 200, description = "Reservation updated", body = ApiResponse<reservation::Model>),
        (status = 400, description = "Invalid slot", body = crate::errors::ErrorResponse),
        (status = 404, description = "Reservation not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "No table free for the new slot", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "customer"
)]
pub async fn modify_reservation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(request): Json<ModifyReservationRequest>,
) -> ApiResult<reservation::Model> {
    let updated = state
        .services
        .reservations
        .modify_for_user(user.id()?, id, request)
        .await?;
    Ok(success_response(updated))
}
