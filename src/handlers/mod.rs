pub mod admin;
pub mod auth;
pub mod cart;
pub mod common;
pub mod customer;
pub mod home;
pub mod menu;
pub mod reservations;
pub mod reviews;
pub mod staff;
pub mod tables;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::{
    auth::AuthService,
    config::AppConfig,
    events::EventSender,
    services::{
        accounts::AccountService, availability::AvailabilityService, cart::CartService,
        checkout::CheckoutService, menu::MenuService, order_status::OrderStatusService,
        orders::{FeeSettings, OrderService}, reports::ReportService,
        reservations::ReservationService, reviews::ReviewService, tables::TableService,
    },
    session::SessionStore,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub accounts: Arc<AccountService>,
    pub reservations: Arc<ReservationService>,
    pub tables: Arc<TableService>,
    pub menu: Arc<MenuService>,
    pub cart: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
    pub orders: Arc<OrderService>,
    pub order_status: Arc<OrderStatusService>,
    pub reviews: Arc<ReviewService>,
    pub reports: Arc<ReportService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        sessions: SessionStore,
        auth_service: Arc<AuthService>,
        config: &AppConfig,
    ) -> Self {
        let fees = FeeSettings::from(&config.restaurant);
        let availability = AvailabilityService::new(db.clone(), config.restaurant.service_hours());

        Self {
            accounts: Arc::new(AccountService::new(
                db.clone(),
                auth_service,
                event_sender.clone(),
            )),
            reservations: Arc::new(ReservationService::new(
                db.clone(),
                availability,
                sessions.clone(),
                event_sender.clone(),
            )),
            tables: Arc::new(TableService::new(db.clone())),
            menu: Arc::new(MenuService::new(db.clone())),
            cart: Arc::new(CartService::new(
                db.clone(),
                sessions.clone(),
                event_sender.clone(),
            )),
            checkout: Arc::new(CheckoutService::new(
                db.clone(),
                sessions,
                fees,
                event_sender.clone(),
            )),
            orders: Arc::new(OrderService::new(db.clone(), fees)),
            order_status: Arc::new(OrderStatusService::new(db.clone(), event_sender.clone())),
            reviews: Arc::new(ReviewService::new(db.clone(), event_sender)),
            reports: Arc::new(ReportService::new(db)),
        }
    }
}
