//! Checkout: turns the session cart into a paid order.

use chrono::{Datelike, NaiveDate, NaiveTime};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        order::{self, OrderStatus, OrderType},
        order_item,
        transaction::{self, PaymentMethod, TransactionStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        clock,
        orders::{self, FeeSettings, Fulfilment},
        pricing, today,
    },
    session::SessionStore,
};

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CardDetails {
    #[validate(length(min = 1, max = 100, message = "Cardholder name is required"))]
    pub name: String,
    /// 13 to 19 digits; spaces and dashes are ignored
    pub number: String,
    /// `MM/YY`
    pub expiry: String,
    pub cvv: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    pub order_type: OrderType,
    #[validate(length(max = 300, message = "Address is limited to 300 characters"))]
    pub address: Option<String>,
    #[serde(default, with = "clock::option")]
    #[schema(value_type = Option<String>, example = "18:30")]
    pub pickup_time: Option<NaiveTime>,
    pub payment_method: PaymentMethod,
    #[validate]
    pub card: Option<CardDetails>,
}

/// What is kept of a card after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardOnFile {
    pub name: String,
    pub last4: String,
}

fn only_digits(value: &str) -> Option<String> {
    let digits: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        Some(digits)
    } else {
        None
    }
}

/// Checks number, expiry and cvv; an expiry month before `today`'s is rejected.
pub fn validate_card(card: &CardDetails, today: NaiveDate) -> Result<CardOnFile, ServiceError> {
    let name = card.name.trim();
    if name.is_empty() {
        return Err(ServiceError::ValidationError("Cardholder name is required".into()));
    }

    let number = only_digits(&card.number)
        .filter(|n| (13..=19).contains(&n.len()))
        .ok_or_else(|| ServiceError::ValidationError("Card number must be 13 to 19 digits".into()))?;

    let (month, year) = card
        .expiry
        .trim()
        .split_once('/')
        .filter(|(m, y)| m.len() == 2 && y.len() == 2)
        .and_then(|(m, y)| Some((m.parse::<u32>().ok()?, y.parse::<i32>().ok()?)))
        .filter(|(m, _)| (1..=12).contains(m))
        .ok_or_else(|| ServiceError::ValidationError("Expiry must be in MM/YY format".into()))?;
    let year = 2000 + year;
    if (year, month) < (today.year(), today.month()) {
        return Err(ServiceError::ValidationError("Card has expired".into()));
    }

    let cvv = card.cvv.trim();
    if !(3..=4).contains(&cvv.len()) || !cvv.chars().all(|c| c.is_ascii_digit()) {
        return Err(ServiceError::ValidationError("CVV must be 3 or 4 digits".into()));
    }

    Ok(CardOnFile {
        name: name.to_string(),
        last4: number[number.len() - 4..].to_string(),
    })
}

impl CheckoutRequest {
    fn fulfilment(&self) -> Result<Fulfilment, ServiceError> {
        orders::fulfilment_for(self.order_type, self.address.as_deref(), self.pickup_time)
    }

    fn card_on_file(&self, today: NaiveDate) -> Result<Option<CardOnFile>, ServiceError> {
        match (self.payment_method, &self.card) {
            (PaymentMethod::CreditCard, Some(card)) => validate_card(card, today).map(Some),
            (PaymentMethod::CreditCard, None) => Err(ServiceError::ValidationError(
                "Card details are required for credit card payments".into(),
            )),
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckoutReceipt {
    pub display_number: String,
    pub order: order::Model,
    pub transaction: transaction::Model,
}

#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    sessions: SessionStore,
    fees: FeeSettings,
    event_sender: Arc<EventSender>,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        sessions: SessionStore,
        fees: FeeSettings,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db,
            sessions,
            fees,
            event_sender,
        }
    }

    /// Checks out the session's cart and clears it from the session on success.
    #[instrument(skip(self, request))]
    pub async fn checkout_session(
        &self,
        session_id: &str,
        user_id: Option<Uuid>,
        request: CheckoutRequest,
    ) -> Result<CheckoutReceipt, ServiceError> {
        let order_id = self
            .sessions
            .get(session_id)
            .cart_order_id
            .ok_or_else(|| ServiceError::ValidationError("Your cart is empty".into()))?;

        let receipt = self.checkout_order(order_id, user_id, request).await?;
        self.sessions.set_cart_order_id(session_id, None);
        Ok(receipt)
    }

    /// Sets the fee record, recomputes the total, records the payment and
    /// moves the order to preparing, all in one transaction.
    #[instrument(skip(self, request), fields(order_type = %request.order_type, payment_method = %request.payment_method))]
    pub async fn checkout_order(
        &self,
        order_id: i32,
        user_id: Option<Uuid>,
        request: CheckoutRequest,
    ) -> Result<CheckoutReceipt, ServiceError> {
        request.validate()?;
        let fulfilment = request.fulfilment()?;
        let card = request.card_on_file(today())?;

        let txn = self.db.begin().await.map_err(|e| {
            error!(order_id, error = %e, "Failed to start checkout transaction");
            ServiceError::DatabaseError(e)
        })?;

        let order = order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let already_paid = transaction::Entity::find()
            .filter(transaction::Column::OrderId.eq(order_id))
            .count(&txn)
            .await?
            > 0;
        if already_paid {
            warn!(order_id, "Duplicate checkout attempt");
            return Err(ServiceError::Conflict(format!(
                "Order {} has already been paid",
                order.display_number()
            )));
        }
        if order.status != OrderStatus::Pending {
            return Err(ServiceError::InvalidOperation(format!(
                "Order {} is {} and cannot be checked out",
                order.display_number(),
                order.status
            )));
        }

        let line_count = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .count(&txn)
            .await?;
        if line_count == 0 {
            return Err(ServiceError::ValidationError("Your cart is empty".into()));
        }

        let priced = orders::set_fulfilment(&txn, order_id, &fulfilment, &self.fees)
            .await
            .map_err(|e| {
                error!(order_id, error = %e, "Failed to apply fulfilment at checkout");
                e
            })?;

        let payment = transaction::ActiveModel {
            order_id: Set(order_id),
            amount: Set(pricing::round_money(priced.total)),
            payment_method: Set(request.payment_method),
            card_name: Set(card.as_ref().map(|c| c.name.clone())),
            card_last4: Set(card.as_ref().map(|c| c.last4.clone())),
            status: Set(TransactionStatus::Completed),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(order_id, error = %e, "Failed to record payment");
            ServiceError::DatabaseError(e)
        })?;

        let mut active: order::ActiveModel = priced.into();
        active.status = Set(OrderStatus::Preparing);
        if let Some(user_id) = user_id {
            active.user_id = Set(Some(user_id));
        }
        let placed = active.update(&txn).await.map_err(|e| {
            error!(order_id, error = %e, "Failed to place order");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!(order_id, error = %e, "Failed to commit checkout");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            order_id,
            transaction_id = payment.id,
            amount = %payment.amount,
            "Checkout completed"
        );
        self.event_sender
            .send_or_log(Event::CheckoutCompleted {
                order_id,
                transaction_id: payment.id,
                amount: payment.amount,
            })
            .await;

        Ok(CheckoutReceipt {
            display_number: placed.display_number(),
            order: placed,
            transaction: payment,
        })
    }
}
