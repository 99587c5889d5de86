//! Restaurant API Library
//!
//! Order-ahead menu, table reservations, session carts and checkout,
//! reviews, and the staff and admin dashboards behind them.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod session;
pub mod tracing;

use axum::{
    extract::State,
    response::Json,
    routing::{delete, get, post, put},
    Extension, Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use tower_http::timeout::TimeoutLayer;
use utoipa::ToSchema;

use crate::auth::{AuthRouterExt, AuthService};
use crate::session::SessionStore;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: Arc<events::EventSender>,
    pub sessions: SessionStore,
    pub auth: Arc<AuthService>,
    pub services: handlers::AppServices,
}

impl AppState {
    /// Wires every service over one connection, session store and event channel.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        let event_sender = Arc::new(event_sender);
        let sessions = SessionStore::new(Duration::from_secs(config.restaurant.session_ttl_secs));
        let auth = Arc::new(AuthService::new(
            auth::AuthConfig::new(
                config.jwt_secret.clone(),
                config.auth_audience.clone(),
                config.auth_issuer.clone(),
                Duration::from_secs(config.jwt_expiration as u64),
                Duration::from_secs(config.refresh_token_expiration as u64),
            ),
            db.clone(),
        ));
        let services = handlers::AppServices::new(
            db.clone(),
            event_sender.clone(),
            sessions.clone(),
            auth.clone(),
            &config,
        );

        Self {
            db,
            config,
            event_sender,
            sessions,
            auth,
            services,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[tokio::test]
    async fn error_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-err"), async {
                ApiResponse::<()>::error("oops".into())
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-err"));
        assert!(!meta.timestamp.is_empty());
    }

    #[tokio::test]
    async fn validation_errors_response_includes_metadata() {
        let response = crate::tracing::scope_request_id(
            crate::tracing::RequestId::new("meta-validation"),
            async { ApiResponse::<()>::validation_errors(vec!["missing".into()]) },
        )
        .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-validation"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    use handlers::{admin, auth, cart, customer, home, menu, reservations, reviews, staff, tables};

    let public = Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/home", get(home::home))
        .route("/tables", get(tables::list_tables))
        .route("/menu/categories", get(menu::list_categories))
        .route("/menu/categories/:slug/sections", get(menu::category_sections))
        .route("/menu/items/:id", get(menu::get_item))
        .route("/menu/promotions", get(menu::active_promotions))
        .route(
            "/reviews",
            get(reviews::list_reviews).post(reviews::submit_review),
        )
        .route("/reviews/:id/helpful", post(reviews::mark_helpful));

    // Session flows; a bearer token, when present, ties the work to an account
    let session_flows = Router::new()
        .route(
            "/reservations/availability",
            post(reservations::check_availability),
        )
        .route(
            "/reservations/available",
            post(reservations::check_availability),
        )
        .route(
            "/reservations/hold",
            post(reservations::hold)
                .get(reservations::current_hold)
                .delete(reservations::release_hold),
        )
        .route("/reservations/confirm", post(reservations::confirm))
        .route("/cart", get(cart::get_cart).put(cart::sync_cart))
        .route("/cart/fulfilment", put(cart::set_fulfilment))
        .route("/checkout", post(cart::checkout))
        .with_optional_auth();

    let signed_in = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/me", get(customer::get_profile).put(customer::update_profile))
        .route("/me/overview", get(customer::overview))
        .route("/me/orders", get(customer::my_orders))
        .route("/me/orders/:id", get(customer::my_order))
        .route("/me/reservations", get(customer::my_reservations))
        .route("/me/reservations/:id", put(customer::modify_reservation))
        .route(
            "/me/reservations/:id/cancel",
            post(customer::cancel_reservation),
        )
        .with_auth();

    let staff_only = Router::new()
        .route("/staff/overview", get(staff::overview))
        .route("/staff/orders", get(staff::orders))
        .route("/staff/reservations", get(staff::reservations))
        .route("/staff/orders/:id/status", put(staff::update_order_status))
        .route(
            "/staff/reservations/:id/status",
            put(staff::update_reservation_status),
        )
        .with_role("staff");

    let admin_only = Router::new()
        .route("/admin/overview", get(admin::overview))
        .route("/admin/orders", get(admin::search_orders))
        .route("/admin/orders/:id", get(admin::get_order))
        .route("/admin/orders/:id/advance", post(admin::advance_order))
        .route("/admin/orders/:id/cancel", post(admin::cancel_order))
        .route("/admin/reservations", get(admin::search_reservations))
        .route(
            "/admin/reservations/:id/action",
            post(admin::reservation_action),
        )
        .route("/admin/customers", get(admin::customers))
        .route("/admin/staff", get(admin::staff))
        .route("/admin/staff/:id/role", post(admin::change_role))
        .route("/admin/tables", post(tables::create_table))
        .route("/admin/tables/:id/qr", post(tables::regenerate_qr))
        .route(
            "/admin/menu/items",
            get(menu::search_items).post(menu::create_item),
        )
        .route(
            "/admin/menu/items/:id",
            put(menu::update_item).delete(menu::delete_item),
        )
        .route("/admin/menu/items/:id/toggle", post(menu::toggle_item))
        .route("/admin/menu/categories", post(menu::create_category))
        .route("/admin/menu/subcategories", post(menu::create_subcategory))
        .route(
            "/admin/promotions",
            get(menu::list_promotions).post(menu::create_promotion),
        )
        .route("/admin/promotions/:id", delete(menu::delete_promotion))
        .route("/admin/reviews", get(reviews::search_reviews))
        .route("/admin/reviews/stats", get(reviews::review_stats))
        .route("/admin/reviews/:id", delete(reviews::delete_review))
        .route("/admin/reviews/:id/verify", post(reviews::verify_review))
        .with_role("admin");

    Router::new()
        .merge(public)
        .merge(session_flows)
        .merge(signed_in)
        .merge(staff_only)
        .merge(admin_only)
}

/// Full HTTP application: v1 API, Swagger UI and the shared middleware stack.
///
/// CORS and compression are left to the binary so tests can drive the router directly.
pub fn app(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    Router::new()
        .route("/", get(|| async { "restaurant-api up" }))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        .layer(crate::tracing::configure_http_tracing())
        .layer(TimeoutLayer::new(timeout))
        .layer(axum::middleware::from_fn_with_state(
            state.sessions.clone(),
            session::session_middleware,
        ))
        // Auth middleware reads the service from request extensions
        .layer(Extension(state.auth.clone()))
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

async fn api_status(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "restaurant-api",
        "timestamp": Utc::now().to_rfc3339(),
        "environment": state.config.environment,
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match db::check_connection(&state.db).await {
        Ok(()) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
            "sessions": state.sessions.len(),
        },
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}

pub mod prelude {
    pub use crate::db::*;
    pub use crate::errors::*;
    pub use crate::events::*;
    pub use crate::openapi::*;
    pub use crate::tracing::*;
    pub use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};
}
