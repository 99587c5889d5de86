use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::common::{success_response, PaginationParams};
use crate::{
    auth::AuthUser,
    entities::{order, reservation, user::UserRole},
    services::{
        accounts::{AccountRow, RoleChangeRequest, UserProfile},
        orders::{OrderDetail, OrderSearch, OrderSummary},
        reports::AdminOverview,
        reservations::{ReservationAction, ReservationSearch},
        today,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AccountQuery {
    /// Matches first name, last name or email
    pub q: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ReservationActionRequest {
    pub action: ReservationAction,
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/overview",
    summary = "Admin dashboard",
    responses((status = 200, description = "Revenue, activity and popular items", body = ApiResponse<AdminOverview>)),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn overview(State(state): State<AppState>) -> ApiResult<AdminOverview> {
    let overview = state.services.reports.admin_overview(today()).await?;
    Ok(success_response(overview))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/orders",
    summary = "Search orders",
    params(
        ("q" = Option<String>, Query, description = "Order id, display number (ORD-007) or customer name"),
        ("status" = Option<String>, Query, description = "pending, preparing, completed or cancelled"),
        ("order_type" = Option<String>, Query, description = "delivery, takeout or dine-in"),
        PaginationParams,
    ),
    responses(
        (status = 200, description = "Matching orders", body = ApiResponse<PaginatedResponse<OrderSummary>>),
        (status = 400, description = "Unknown status or type", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn search_orders(
    State(state): State<AppState>,
    Query(search): Query<OrderSearch>,
    Query(paging): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<OrderSummary>> {
    let (page, per_page) = paging.resolve(&state.config);
    let (orders, total) = state
        .services
        .orders
        .search(&search, page, per_page)
        .await?;
    Ok(success_response(PaginatedResponse::new(
        orders, total, page, per_page,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/orders/{id}",
    summary = "Order detail",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with lines, fee and payment", body = ApiResponse<OrderDetail>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn get_order(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult<OrderDetail> {
    let detail = state.services.orders.detail(id).await?;
    Ok(success_response(detail))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/orders/{id}/advance",
    summary = "Advance order",
    description = "Moves the order to the next status: pending, preparing, completed",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order advanced", body = ApiResponse<order::Model>),
        (status = 400, description = "Order already finished", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn advance_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<order::Model> {
    let order = state.services.order_status.advance(id).await?;
    Ok(success_response(order))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/orders/{id}/cancel",
    summary = "Cancel order",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order cancelled", body = ApiResponse<order::Model>),
        (status = 400, description = "Order already finished", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<order::Model> {
    let order = state.services.order_status.cancel(id).await?;
    Ok(success_response(order))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/reservations",
    summary = "Search reservations",
    params(
        ("q" = Option<String>, Query, description = "Matches name, phone or email"),
        ("status" = Option<String>, Query, description = "Reservation status"),
        ("date" = Option<String>, Query, description = "Reservation date (YYYY-MM-DD)"),
        PaginationParams,
    ),
    responses((status = 200, description = "Matching reservations", body = ApiResponse<PaginatedResponse<reservation::Model>>)),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn search_reservations(
    State(state): State<AppState>,
    Query(search): Query<ReservationSearch>,
    Query(paging): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<reservation::Model>> {
    let (page, per_page) = paging.resolve(&state.config);
    let (reservations, total) = state
        .services
        .reservations
        .search(&search, page, per_page)
        .await?;
    Ok(success_response(PaginatedResponse::new(
        reservations,
        total,
        page,
        per_page,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/reservations/{id}/action",
    summary = "Apply reservation action",
    params(("id" = i32, Path, description = "Reservation id")),
    request_body = ReservationActionRequest,
    responses(
        (status = 200, description = "Reservation updated", body = ApiResponse<reservation::Model>),
        (status = 400, description = "Action not allowed from the current status", body = crate::errors::ErrorResponse),
        (status = 404, description = "Reservation not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn reservation_action(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<ReservationActionRequest>,
) -> ApiResult<reservation::Model> {
    let reservation = state
        .services
        .reservations
        .apply_action(id, request.action)
        .await?;
    Ok(success_response(reservation))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/customers",
    summary = "Customers",
    params(AccountQuery, PaginationParams),
    responses((status = 200, description = "Customers with spend and tier", body = ApiResponse<PaginatedResponse<AccountRow>>)),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn customers(
    State(state): State<AppState>,
    Query(query): Query<AccountQuery>,
    Query(paging): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<AccountRow>> {
    let (page, per_page) = paging.resolve(&state.config);
    let (rows, total) = state
        .services
        .accounts
        .list_accounts(&[UserRole::Customer], query.q.as_deref(), page, per_page)
        .await?;
    Ok(success_response(PaginatedResponse::new(
        rows, total, page, per_page,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/staff",
    summary = "Staff accounts",
    params(AccountQuery, PaginationParams),
    responses((status = 200, description = "Staff and admin accounts", body = ApiResponse<PaginatedResponse<AccountRow>>)),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn staff(
    State(state): State<AppState>,
    Query(query): Query<AccountQuery>,
    Query(paging): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<AccountRow>> {
    let (page, per_page) = paging.resolve(&state.config);
    let (rows, total) = state
        .services
        .accounts
        .list_accounts(
            &[UserRole::Staff, UserRole::Admin],
            query.q.as_deref(),
            page,
            per_page,
        )
        .await?;
    Ok(success_response(PaginatedResponse::new(
        rows, total, page, per_page,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/staff/{id}/role",
    summary = "Change account role",
    params(("id" = Uuid, Path, description = "Account id")),
    request_body = RoleChangeRequest,
    responses(
        (status = 200, description = "Role changed", body = ApiResponse<UserProfile>),
        (status = 403, description = "Admins cannot demote themselves", body = crate::errors::ErrorResponse),
        (status = 404, description = "Account not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn change_role(
    State(state): State<AppState>,
    admin: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<RoleChangeRequest>,
) -> ApiResult<UserProfile> {
    let profile = state
        .services
        .accounts
        .change_role(admin.id()?, id, request.action)
        .await?;
    Ok(success_response(profile))
}
