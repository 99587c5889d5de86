use axum::{extract::State, Json};
use validator::Validate;

use super::common::success_response;
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::{
        cart::{SyncCartRequest, SyncOutcome},
        checkout::{CheckoutReceipt, CheckoutRequest},
        orders::{FulfilmentRequest, OrderDetail},
    },
    session::SessionId,
    ApiResponse, ApiResult, AppState,
};

fn caller(user: Option<AuthUser>) -> Result<Option<uuid::Uuid>, ServiceError> {
    user.map(|u| u.id()).transpose()
}

#[utoipa::path(
    get,
    path = "/api/v1/cart",
    summary = "Current cart",
    responses((status = 200, description = "The session's pending order, or null", body = ApiResponse<Option<OrderDetail>>)),
    params(("x-session-id" = String, Header, description = "Session id")),
    tag = "cart"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    session: SessionId,
) -> ApiResult<Option<OrderDetail>> {
    let detail = match state.services.cart.current_cart(session.as_str()).await? {
        Some(order) => Some(state.services.orders.detail(order.id).await?),
        None => None,
    };
    Ok(success_response(detail))
}

#[utoipa::path(
    put,
    path = "/api/v1/cart",
    summary = "Sync cart",
    description = "Replaces the persisted cart lines with the client's cart and recomputes the total",
    request_body = SyncCartRequest,
    responses(
        (status = 200, description = "Lines created, updated and removed", body = ApiResponse<SyncOutcome>),
        (status = 400, description = "Cart is no longer editable", body = crate::errors::ErrorResponse),
    ),
    params(("x-session-id" = Option<String>, Header, description = "Session id; issued when absent")),
    tag = "cart"
)]
pub async fn sync_cart(
    State(state): State<AppState>,
    session: SessionId,
    user: Option<AuthUser>,
    Json(request): Json<SyncCartRequest>,
) -> ApiResult<SyncOutcome> {
    let outcome = state
        .services
        .cart
        .sync_session_cart(caller(user)?, session.as_str(), &request.items)
        .await?;
    Ok(success_response(outcome))
}

#[utoipa::path(
    put,
    path = "/api/v1/cart/fulfilment",
    summary = "Choose delivery, takeout or dine-in",
    description = "Sets the order type and fee record of the session cart and recomputes its total",
    request_body = FulfilmentRequest,
    responses(
        (status = 200, description = "Cart with its fee applied", body = ApiResponse<OrderDetail>),
        (status = 400, description = "No open cart, or delivery without an address", body = crate::errors::ErrorResponse),
    ),
    params(("x-session-id" = String, Header, description = "Session id")),
    tag = "cart"
)]
pub async fn set_fulfilment(
    State(state): State<AppState>,
    session: SessionId,
    Json(request): Json<FulfilmentRequest>,
) -> ApiResult<OrderDetail> {
    request.validate()?;
    let fulfilment = request.fulfilment()?;
    let cart = state
        .services
        .cart
        .current_cart(session.as_str())
        .await?
        .ok_or_else(|| ServiceError::ValidationError("Your cart is empty".into()))?;

    let orders = &state.services.orders;
    orders.update_fulfilment(cart.id, fulfilment).await?;
    Ok(success_response(orders.detail(cart.id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/checkout",
    summary = "Checkout",
    description = "Records payment for the session cart and sends the order to the kitchen",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Order placed", body = ApiResponse<CheckoutReceipt>),
        (status = 400, description = "Empty cart or invalid payment details", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order already paid", body = crate::errors::ErrorResponse),
        (status = 500, description = "Checkout could not be recorded", body = crate::errors::ErrorResponse),
    ),
    params(("x-session-id" = String, Header, description = "Session id")),
    tag = "cart"
)]
pub async fn checkout(
    State(state): State<AppState>,
    session: SessionId,
    user: Option<AuthUser>,
    Json(request): Json<CheckoutRequest>,
) -> ApiResult<CheckoutReceipt> {
    let receipt = state
        .services
        .checkout
        .checkout_session(session.as_str(), caller(user)?, request)
        .await?;
    Ok(success_response(receipt))
}
