use std::str::FromStr;
use std::sync::Arc;

use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection, EntityTrait, TransactionTrait};
use tracing::{error, info, instrument, warn};

use crate::{
    entities::order::{
        ActiveModel as OrderActiveModel, Entity as OrderEntity, Model as OrderModel, OrderStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Parses an order status name, case-insensitively.
pub fn parse_status(value: &str) -> Result<OrderStatus, ServiceError> {
    OrderStatus::from_str(value.trim()).map_err(|_| {
        ServiceError::ValidationError(format!(
            "Invalid status: {}. Valid statuses are: pending, preparing, completed, cancelled",
            value
        ))
    })
}

/// Whether an order may move from `from` to `to`.
pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
        (from, to),
        (Pending, Preparing) | (Pending, Cancelled) | (Preparing, Completed) | (Preparing, Cancelled)
    )
}

/// Next step of the kitchen flow; `None` once the order is completed or cancelled.
pub fn next_status(current: OrderStatus) -> Option<OrderStatus> {
    match current {
        OrderStatus::Pending => Some(OrderStatus::Preparing),
        OrderStatus::Preparing => Some(OrderStatus::Completed),
        OrderStatus::Completed | OrderStatus::Cancelled => None,
    }
}

#[derive(Clone)]
pub struct OrderStatusService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl OrderStatusService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Staff update to an explicit status name
    #[instrument(skip(self))]
    pub async fn set_status(&self, order_id: i32, status: &str) -> Result<OrderModel, ServiceError> {
        let next = parse_status(status)?;
        self.update_status(order_id, next).await
    }

    /// Advances the order one step along pending -> preparing -> completed
    #[instrument(skip(self))]
    pub async fn advance(&self, order_id: i32) -> Result<OrderModel, ServiceError> {
        let order = self.load(order_id).await?;
        let next = next_status(order.status).ok_or_else(|| {
            warn!(order_id, status = %order.status, "Advance requested on a finished order");
            ServiceError::InvalidOperation(format!(
                "Order {} is already {}",
                order.display_number(),
                order.status
            ))
        })?;
        self.update_status(order_id, next).await
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, order_id: i32) -> Result<OrderModel, ServiceError> {
        let order = self.load(order_id).await?;
        if matches!(order.status, OrderStatus::Completed | OrderStatus::Cancelled) {
            warn!(order_id, status = %order.status, "Cancel requested on a finished order");
            return Err(ServiceError::InvalidOperation(format!(
                "Order {} is already {} and cannot be cancelled",
                order.display_number(),
                order.status
            )));
        }
        self.update_status(order_id, OrderStatus::Cancelled).await
    }

    async fn load(&self, order_id: i32) -> Result<OrderModel, ServiceError> {
        OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }

    /// Updates the status of an order with transition validation
    #[instrument(skip(self), fields(new_status = %new_status))]
    pub async fn update_status(
        &self,
        order_id: i32,
        new_status: OrderStatus,
    ) -> Result<OrderModel, ServiceError> {
        let txn = self.db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let order = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await
            .map_err(|e| {
                error!("Failed to fetch order {}: {}", order_id, e);
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let old_status = order.status;
        if !is_valid_transition(old_status, new_status) {
            warn!("Invalid status transition from {} to {}", old_status, new_status);
            return Err(ServiceError::ValidationError(format!(
                "Cannot transition from status '{}' to '{}'",
                old_status, new_status
            )));
        }

        let mut active: OrderActiveModel = order.into();
        active.status = Set(new_status);
        let updated = active.update(&txn).await.map_err(|e| {
            error!("Failed to update order {} status: {}", order_id, e);
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction for order {}: {}", order_id, e);
            ServiceError::DatabaseError(e)
        })?;

        info!(
            "Order {} status updated from '{}' to '{}'",
            updated.display_number(),
            old_status,
            new_status
        );
        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: old_status.to_string(),
                new_status: new_status.to_string(),
            })
            .await;

        Ok(updated)
    }
}
