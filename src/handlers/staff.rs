use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;

use super::common::{success_response, StatusUpdate};
use crate::{
    entities::{order, reservation},
    services::{
        reports::{StaffOrders, StaffOverview, StaffReservations},
        today,
    },
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReservationDayQuery {
    /// Single day to show; upcoming reservations when omitted
    pub date: Option<NaiveDate>,
}

#[utoipa::path(
    get,
    path = "/api/v1/staff/overview",
    summary = "Staff dashboard",
    responses((status = 200, description = "Today's workload", body = ApiResponse<StaffOverview>)),
    security(("Bearer" = [])),
    tag = "staff"
)]
pub async fn overview(State(state): State<AppState>) -> ApiResult<StaffOverview> {
    let overview = state.services.reports.staff_overview(today()).await?;
    Ok(success_response(overview))
}

#[utoipa::path(
    get,
    path = "/api/v1/staff/orders",
    summary = "Today's orders",
    responses((status = 200, description = "Orders with counts by status and type", body = ApiResponse<StaffOrders>)),
    security(("Bearer" = [])),
    tag = "staff"
)]
pub async fn orders(State(state): State<AppState>) -> ApiResult<StaffOrders> {
    let orders = state.services.reports.staff_orders(today()).await?;
    Ok(success_response(orders))
}

#[utoipa::path(
    get,
    path = "/api/v1/staff/reservations",
    summary = "Reservations board",
    params(ReservationDayQuery),
    responses((status = 200, description = "Reservations with counts and guest total", body = ApiResponse<StaffReservations>)),
    security(("Bearer" = [])),
    tag = "staff"
)]
pub async fn reservations(
    State(state): State<AppState>,
    Query(query): Query<ReservationDayQuery>,
) -> ApiResult<StaffReservations> {
    let board = state
        .services
        .reports
        .staff_reservations(today(), query.date)
        .await?;
    Ok(success_response(board))
}

#[utoipa::path(
    put,
    path = "/api/v1/staff/orders/{id}/status",
    summary = "Set order status",
    params(("id" = i32, Path, description = "Order id")),
    request_body = StatusUpdate,
    responses(
        (status = 200, description = "Order updated", body = ApiResponse<order::Model>),
        (status = 400, description = "Unknown status or illegal transition", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "staff"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(update): Json<StatusUpdate>,
) -> ApiResult<order::Model> {
    let order = state
        .services
        .order_status
        .set_status(id, &update.status)
        .await?;
    Ok(success_response(order))
}

#[utoipa::path(
    put,
    path = "/api/v1/staff/reservations/{id}/status",
    summary = "Set reservation status",
    params(("id" = i32, Path, description = "Reservation id")),
    request_body = StatusUpdate,
    responses(
        (status = 200, description = "Reservation updated", body = ApiResponse<reservation::Model>),
        (status = 400, description = "Unknown status or illegal transition", body = crate::errors::ErrorResponse),
        (status = 404, description = "Reservation not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "staff"
)]
pub async fn update_reservation_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(update): Json<StatusUpdate>,
) -> ApiResult<reservation::Model> {
    let reservation = state
        .services
        .reservations
        .set_status(id, &update.status)
        .await?;
    Ok(success_response(reservation))
}
