use chrono::{DateTime, Duration, Local, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::RestaurantConfig,
    entities::{
        delivery::{self, DeliveryStatus},
        menu_item,
        order::{self, OrderStatus, OrderType},
        order_item, takeout, transaction, user,
    },
    errors::ServiceError,
    services::{clock, icontains, pricing},
};

/// Fee defaults applied when a fee record is created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeSettings {
    pub delivery_fee: Decimal,
    pub delivery_eta_minutes: i64,
    pub takeout_fee: Decimal,
}

impl From<&RestaurantConfig> for FeeSettings {
    fn from(config: &RestaurantConfig) -> Self {
        Self {
            delivery_fee: config.delivery_fee,
            delivery_eta_minutes: config.delivery_eta_minutes,
            takeout_fee: config.takeout_fee,
        }
    }
}

/// How an order leaves the kitchen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fulfilment {
    Delivery { address: String },
    Takeout { pickup_time: Option<NaiveTime> },
    DineIn,
}

impl Fulfilment {
    pub fn order_type(&self) -> OrderType {
        match self {
            Fulfilment::Delivery { .. } => OrderType::Delivery,
            Fulfilment::Takeout { .. } => OrderType::Takeout,
            Fulfilment::DineIn => OrderType::DineIn,
        }
    }
}

/// Builds the fulfilment for `order_type`. Delivery needs a non-blank address.
pub fn fulfilment_for(
    order_type: OrderType,
    address: Option<&str>,
    pickup_time: Option<NaiveTime>,
) -> Result<Fulfilment, ServiceError> {
    match order_type {
        OrderType::Delivery => {
            let address = address
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .ok_or_else(|| {
                    ServiceError::ValidationError(
                        "A delivery address is required for delivery orders".into(),
                    )
                })?;
            Ok(Fulfilment::Delivery {
                address: address.to_string(),
            })
        }
        OrderType::Takeout => Ok(Fulfilment::Takeout { pickup_time }),
        OrderType::DineIn => Ok(Fulfilment::DineIn),
    }
}

/// How an open cart should be fulfilled; lets the client preview the fee before paying.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct FulfilmentRequest {
    pub order_type: OrderType,
    #[validate(length(max = 300, message = "Address is limited to 300 characters"))]
    pub address: Option<String>,
    #[serde(default, with = "clock::option")]
    #[schema(value_type = Option<String>, example = "18:30")]
    pub pickup_time: Option<NaiveTime>,
}

impl FulfilmentRequest {
    pub fn fulfilment(&self) -> Result<Fulfilment, ServiceError> {
        fulfilment_for(self.order_type, self.address.as_deref(), self.pickup_time)
    }
}

/// `"2x Margherita, 1x Cola"`, or `"No items"` for an empty order.
pub fn item_summary<'a, I>(lines: I) -> String
where
    I: IntoIterator<Item = (i32, &'a str)>,
{
    let parts: Vec<String> = lines
        .into_iter()
        .map(|(quantity, name)| format!("{}x {}", quantity, name))
        .collect();
    if parts.is_empty() {
        "No items".to_string()
    } else {
        parts.join(", ")
    }
}

/// Sets the order type and its fee record, keeping at most one of
/// delivery/takeout, then recomputes the total.
pub async fn set_fulfilment<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
    fulfilment: &Fulfilment,
    fees: &FeeSettings,
) -> Result<order::Model, ServiceError> {
    let order = order::Entity::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

    let existing_delivery = delivery::Entity::find()
        .filter(delivery::Column::OrderId.eq(order_id))
        .one(conn)
        .await?;
    let existing_takeout = takeout::Entity::find()
        .filter(takeout::Column::OrderId.eq(order_id))
        .one(conn)
        .await?;

    match fulfilment {
        Fulfilment::Delivery { address } => {
            let address = address.trim().to_string();
            if address.is_empty() {
                return Err(ServiceError::ValidationError(
                    "A delivery address is required".into(),
                ));
            }
            match existing_delivery {
                Some(current) => {
                    let mut active: delivery::ActiveModel = current.into();
                    active.address = Set(address);
                    active.update(conn).await?;
                }
                None => {
                    let eta = Local::now().time() + Duration::minutes(fees.delivery_eta_minutes);
                    delivery::ActiveModel {
                        order_id: Set(order_id),
                        address: Set(address),
                        fee: Set(pricing::round_money(fees.delivery_fee)),
                        delivery_status: Set(DeliveryStatus::PreparingOrder),
                        arrival_time: Set(Some(eta)),
                        ..Default::default()
                    }
                    .insert(conn)
                    .await?;
                }
            }
            if let Some(stale) = existing_takeout {
                takeout::Entity::delete_by_id(stale.id).exec(conn).await?;
            }
        }
        Fulfilment::Takeout { pickup_time } => {
            match existing_takeout {
                Some(current) => {
                    let mut active: takeout::ActiveModel = current.into();
                    active.pickup_time = Set(*pickup_time);
                    active.update(conn).await?;
                }
                None => {
                    takeout::ActiveModel {
                        order_id: Set(order_id),
                        fee: Set(pricing::round_money(fees.takeout_fee)),
                        pickup_time: Set(*pickup_time),
                        ..Default::default()
                    }
                    .insert(conn)
                    .await?;
                }
            }
            if let Some(stale) = existing_delivery {
                delivery::Entity::delete_by_id(stale.id).exec(conn).await?;
            }
        }
        Fulfilment::DineIn => {
            if let Some(stale) = existing_delivery {
                delivery::Entity::delete_by_id(stale.id).exec(conn).await?;
            }
            if let Some(stale) = existing_takeout {
                takeout::Entity::delete_by_id(stale.id).exec(conn).await?;
            }
        }
    }

    if order.order_type != fulfilment.order_type() {
        let mut active: order::ActiveModel = order.into();
        active.order_type = Set(fulfilment.order_type());
        active.update(conn).await?;
    }

    pricing::recompute_order_total(conn, order_id).await
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderLineView {
    pub id: i32,
    pub item_id: i32,
    pub name: String,
    pub quantity: i32,
    #[serde(serialize_with = "crate::entities::money::serialize")]
    pub price: Decimal,
    #[serde(serialize_with = "crate::entities::money::serialize")]
    pub subtotal: Decimal,
    pub promotion_id: Option<i32>,
    pub meat_topping: String,
    pub extra_toppings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderDetail {
    pub order: order::Model,
    pub display_number: String,
    pub items: Vec<OrderLineView>,
    pub summary: String,
    #[serde(serialize_with = "crate::entities::money::serialize")]
    pub subtotal: Decimal,
    #[serde(serialize_with = "crate::entities::money::serialize")]
    pub fee: Decimal,
    pub delivery: Option<delivery::Model>,
    pub takeout: Option<takeout::Model>,
    pub transaction: Option<transaction::Model>,
}

/// Row shape for order lists and dashboards.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderSummary {
    pub id: i32,
    pub display_number: String,
    pub status: OrderStatus,
    pub order_type: OrderType,
    #[serde(serialize_with = "crate::entities::money::serialize")]
    pub total: Decimal,
    pub summary: String,
    pub customer_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct OrderSearch {
    /// Order id, display number (`ORD-007`) or customer name
    pub q: Option<String>,
    pub status: Option<String>,
    pub order_type: Option<String>,
}

/// Builds list rows for `orders`, loading line names and customers in two queries.
pub async fn summarize<C: ConnectionTrait>(
    conn: &C,
    orders: Vec<order::Model>,
) -> Result<Vec<OrderSummary>, ServiceError> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i32> = orders.iter().map(|o| o.id).collect();
    let lines = order_item::Entity::find()
        .filter(order_item::Column::OrderId.is_in(ids))
        .order_by_asc(order_item::Column::Id)
        .find_also_related(menu_item::Entity)
        .all(conn)
        .await?;

    let mut names: HashMap<i32, Vec<(i32, String)>> = HashMap::new();
    for (line, item) in lines {
        let name = item.map(|i| i.name).unwrap_or_else(|| "Unknown item".into());
        names.entry(line.order_id).or_default().push((line.quantity, name));
    }

    let user_ids: Vec<Uuid> = orders.iter().filter_map(|o| o.user_id).collect();
    let customers: HashMap<Uuid, String> = if user_ids.is_empty() {
        HashMap::new()
    } else {
        user::Entity::find()
            .filter(user::Column::Id.is_in(user_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|u| (u.id, u.full_name()))
            .collect()
    };

    Ok(orders
        .into_iter()
        .map(|o| {
            let summary = item_summary(
                names
                    .get(&o.id)
                    .map(|v| v.iter().map(|(q, n)| (*q, n.as_str())).collect::<Vec<_>>())
                    .unwrap_or_default(),
            );
            OrderSummary {
                id: o.id,
                display_number: o.display_number(),
                status: o.status,
                order_type: o.order_type,
                total: o.total,
                summary,
                customer_name: o.user_id.and_then(|id| customers.get(&id).cloned()),
                created_at: o.created_at,
            }
        })
        .collect())
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    fees: FeeSettings,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, fees: FeeSettings) -> Self {
        Self { db, fees }
    }

    /// Order with its lines, fee record and payment
    #[instrument(skip(self))]
    pub async fn detail(&self, order_id: i32) -> Result<OrderDetail, ServiceError> {
        let db = &*self.db;
        let order = order::Entity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let lines = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::Id)
            .find_also_related(menu_item::Entity)
            .all(db)
            .await?;
        let delivery = delivery::Entity::find()
            .filter(delivery::Column::OrderId.eq(order_id))
            .one(db)
            .await?;
        let takeout = takeout::Entity::find()
            .filter(takeout::Column::OrderId.eq(order_id))
            .one(db)
            .await?;
        let transaction = transaction::Entity::find()
            .filter(transaction::Column::OrderId.eq(order_id))
            .one(db)
            .await?;

        let items: Vec<OrderLineView> = lines
            .into_iter()
            .map(|(line, item)| OrderLineView {
                id: line.id,
                item_id: line.item_id,
                name: item.map(|i| i.name).unwrap_or_else(|| "Unknown item".into()),
                quantity: line.quantity,
                price: line.price,
                subtotal: line.subtotal,
                promotion_id: line.promotion_id,
                extra_toppings: line.extras(),
                meat_topping: line.meat_topping,
            })
            .collect();

        let subtotal = pricing::round_money(items.iter().map(|l| l.subtotal).sum());
        let fee = pricing::applicable_fee(
            order.order_type,
            delivery.as_ref().map(|d| d.fee),
            takeout.as_ref().map(|t| t.fee),
        );
        let summary = item_summary(items.iter().map(|l| (l.quantity, l.name.as_str())));

        Ok(OrderDetail {
            display_number: order.display_number(),
            order,
            items,
            summary,
            subtotal,
            fee,
            delivery,
            takeout,
            transaction,
        })
    }

    /// Owner-scoped detail; other customers' orders read as missing
    pub async fn detail_for_user(&self, user_id: Uuid, order_id: i32) -> Result<OrderDetail, ServiceError> {
        let detail = self.detail(order_id).await?;
        if detail.order.user_id != Some(user_id) {
            return Err(ServiceError::NotFound(format!("Order {} not found", order_id)));
        }
        Ok(detail)
    }

    /// Changes the order type and fee record of an unpaid order in one transaction.
    #[instrument(skip(self))]
    pub async fn update_fulfilment(
        &self,
        order_id: i32,
        fulfilment: Fulfilment,
    ) -> Result<order::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for fulfilment change");
            ServiceError::DatabaseError(e)
        })?;
        let current = order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        if current.status != OrderStatus::Pending {
            return Err(ServiceError::InvalidOperation(format!(
                "A {} order can no longer change how it is fulfilled",
                current.status
            )));
        }
        let order = set_fulfilment(&txn, order_id, &fulfilment, &self.fees).await?;
        txn.commit().await.map_err(|e| {
            error!(order_id, error = %e, "Failed to commit fulfilment change");
            ServiceError::DatabaseError(e)
        })?;
        info!(order_id, order_type = %order.order_type, total = %order.total, "Order fulfilment updated");
        Ok(order)
    }

    /// A customer's orders, newest first
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderSummary>, ServiceError> {
        let orders = order::Entity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .all(&*self.db)
            .await?;
        summarize(&*self.db, orders).await
    }

    /// Admin search by id, display number or customer name with status/type filters.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        params: &OrderSearch,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<OrderSummary>, u64), ServiceError> {
        let db = &*self.db;
        let mut query = order::Entity::find();

        if let Some(q) = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let customer_ids: Vec<Uuid> = user::Entity::find()
                .filter(
                    Condition::any()
                        .add(icontains(user::Column::FirstName, q))
                        .add(icontains(user::Column::LastName, q)),
                )
                .all(db)
                .await?
                .into_iter()
                .map(|u| u.id)
                .collect();

            let mut matches = Condition::any();
            if let Some(id) = order::parse_display_number(q) {
                matches = matches.add(order::Column::Id.eq(id));
            }
            if !customer_ids.is_empty() {
                matches = matches.add(order::Column::UserId.is_in(customer_ids));
            }
            if matches.is_empty() {
                return Ok((Vec::new(), 0));
            }
            query = query.filter(matches);
        }
        if let Some(status) = params.status.as_deref().filter(|s| !s.trim().is_empty()) {
            let status = OrderStatus::from_str(status.trim()).map_err(|_| {
                ServiceError::ValidationError(format!("Unknown order status '{}'", status))
            })?;
            query = query.filter(order::Column::Status.eq(status));
        }
        if let Some(kind) = params.order_type.as_deref().filter(|s| !s.trim().is_empty()) {
            let kind = OrderType::from_str(kind.trim()).map_err(|_| {
                ServiceError::ValidationError(format!("Unknown order type '{}'", kind))
            })?;
            query = query.filter(order::Column::OrderType.eq(kind));
        }

        let paginator = query
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .paginate(db, per_page.max(1));
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((summarize(db, orders).await?, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lists_quantities_and_names() {
        assert_eq!(
            item_summary(vec![(2, "Margherita"), (1, "Cola")]),
            "2x Margherita, 1x Cola"
        );
        assert_eq!(item_summary(Vec::<(i32, &str)>::new()), "No items");
    }

    #[test]
    fn fulfilment_maps_to_order_type() {
        assert_eq!(
            Fulfilment::Delivery {
                address: "1 Royal Rd".into()
            }
            .order_type(),
            OrderType::Delivery
        );
        assert_eq!(
            Fulfilment::Takeout { pickup_time: None }.order_type(),
            OrderType::Takeout
        );
        assert_eq!(Fulfilment::DineIn.order_type(), OrderType::DineIn);
    }
}
