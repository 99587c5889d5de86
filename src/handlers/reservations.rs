//! Booking flow: check availability, hold a slot in the session, confirm it.

use axum::{extract::State, response::IntoResponse, Json};

use super::common::{created_response, success_response};
use crate::{
    auth::AuthUser,
    entities::reservation,
    errors::ServiceError,
    services::reservations::{
        AvailabilityRequest, AvailabilityResponse, ConfirmReservationRequest, HoldRequest,
    },
    session::{PendingReservation, SessionId},
    ApiResponse, ApiResult, AppState,
};

#[utoipa::path(
    post,
    path = "/api/v1/reservations/availability",
    summary = "Check table availability",
    description = "Free tables of the party's seat class for a date and time. When no table of that class is free the request is rejected.",
    request_body = AvailabilityRequest,
    responses(
        (status = 200, description = "Free tables", body = ApiResponse<AvailabilityResponse>),
        (status = 400, description = "Date, time or party size rejected, or no table of the seat class is free", body = crate::errors::ErrorResponse),
    ),
    tag = "reservations"
)]
pub async fn check_availability(
    State(state): State<AppState>,
    Json(request): Json<AvailabilityRequest>,
) -> ApiResult<AvailabilityResponse> {
    let response = state
        .services
        .reservations
        .check_availability(&request)
        .await?;
    Ok(success_response(response))
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/hold",
    summary = "Hold a table",
    description = "Keeps the chosen slot in the caller's session until contact details are confirmed",
    request_body = HoldRequest,
    responses(
        (status = 200, description = "Slot held", body = ApiResponse<PendingReservation>),
        (status = 400, description = "Slot rejected", body = crate::errors::ErrorResponse),
        (status = 404, description = "Table not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Table already booked", body = crate::errors::ErrorResponse),
    ),
    params(("x-session-id" = Option<String>, Header, description = "Session id; issued when absent")),
    tag = "reservations"
)]
pub async fn hold(
    State(state): State<AppState>,
    session: SessionId,
    Json(request): Json<HoldRequest>,
) -> ApiResult<PendingReservation> {
    let pending = state
        .services
        .reservations
        .hold(session.as_str(), &request)
        .await?;
    Ok(success_response(pending))
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations/hold",
    summary = "Current hold",
    responses((status = 200, description = "Held slot, or null", body = ApiResponse<Option<PendingReservation>>)),
    params(("x-session-id" = String, Header, description = "Session id")),
    tag = "reservations"
)]
pub async fn current_hold(
    State(state): State<AppState>,
    session: SessionId,
) -> ApiResult<Option<PendingReservation>> {
    Ok(success_response(
        state.services.reservations.current_hold(session.as_str()),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/reservations/hold",
    summary = "Release hold",
    responses((status = 200, description = "Released slot, or null", body = ApiResponse<Option<PendingReservation>>)),
    params(("x-session-id" = String, Header, description = "Session id")),
    tag = "reservations"
)]
pub async fn release_hold(
    State(state): State<AppState>,
    session: SessionId,
) -> ApiResult<Option<PendingReservation>> {
    Ok(success_response(
        state.services.reservations.release_hold(session.as_str()),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/confirm",
    summary = "Confirm reservation",
    description = "Persists the held slot, or the slot given in the body, as a confirmed reservation",
    request_body = ConfirmReservationRequest,
    responses(
        (status = 201, description = "Reservation confirmed", body = ApiResponse<reservation::Model>),
        (status = 400, description = "Invalid contact details or no slot", body = crate::errors::ErrorResponse),
        (status = 409, description = "Slot taken in the meantime", body = crate::errors::ErrorResponse),
    ),
    params(("x-session-id" = Option<String>, Header, description = "Session id holding the slot")),
    tag = "reservations"
)]
pub async fn confirm(
    State(state): State<AppState>,
    session: SessionId,
    user: Option<AuthUser>,
    Json(request): Json<ConfirmReservationRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let user_id = user.map(|u| u.id()).transpose()?;
    let confirmed = state
        .services
        .reservations
        .confirm(session.as_str(), user_id, request)
        .await?;
    Ok(created_response(confirmed))
}
