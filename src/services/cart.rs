//! Cart reconciliation.
//!
//! The client holds the authoritative cart. Each sync diffs it against the
//! persisted order lines by signature (`item|meat|sorted extras`) and applies
//! the minimal set of creates, quantity updates and deletes in one transaction.

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::{
        menu_item,
        order::{self, OrderStatus, OrderType},
        order_item,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{pricing, today},
    session::SessionStore,
};

/// One entry of the client cart. Loosely typed on the wire: ids and
/// quantities may arrive as numbers or numeric strings, and anything other
/// than a list of strings for `extra_toppings` counts as no extras.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartEntry {
    #[serde(default, deserialize_with = "lenient_int")]
    #[schema(value_type = Option<i32>)]
    pub item_id: Option<i32>,
    #[serde(default, deserialize_with = "lenient_int")]
    #[schema(value_type = Option<i32>)]
    pub quantity: Option<i32>,
    #[serde(default)]
    pub meat_topping: Option<String>,
    #[serde(default, deserialize_with = "list_or_empty")]
    pub extra_toppings: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SyncCartRequest {
    #[serde(default)]
    pub items: Vec<CartEntry>,
}

fn lenient_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i32>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn list_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// A cart entry after normalisation: trimmed, sorted extras and a positive quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub item_id: i32,
    pub quantity: i32,
    pub meat_topping: String,
    pub extras: Vec<String>,
}

impl CartLine {
    pub fn signature(&self) -> String {
        signature(self.item_id, &self.meat_topping, &self.extras)
    }

    pub fn extras_text(&self) -> String {
        self.extras.join(",")
    }
}

fn normalize_extras<S: AsRef<str>>(extras: &[S]) -> Vec<String> {
    let mut cleaned: Vec<String> = extras
        .iter()
        .map(|e| e.as_ref().trim())
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect();
    cleaned.sort();
    cleaned
}

/// `"{item_id}|{meat}|{sorted extras joined by ','}"`
pub fn signature<S: AsRef<str>>(item_id: i32, meat_topping: &str, extras: &[S]) -> String {
    format!(
        "{}|{}|{}",
        item_id,
        meat_topping.trim(),
        normalize_extras(extras).join(",")
    )
}

/// Drops entries without an item id and merges duplicate signatures by summing quantities.
pub fn normalize_entries(entries: &[CartEntry]) -> Vec<CartLine> {
    let mut lines: Vec<CartLine> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        let item_id = match entry.item_id {
            Some(id) if id > 0 => id,
            _ => continue,
        };
        let line = CartLine {
            item_id,
            quantity: entry.quantity.unwrap_or(1).max(1),
            meat_topping: entry
                .meat_topping
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
            extras: normalize_extras(&entry.extra_toppings),
        };
        match index.get(&line.signature()) {
            Some(&pos) => lines[pos].quantity = lines[pos].quantity.saturating_add(line.quantity),
            None => {
                index.insert(line.signature(), lines.len());
                lines.push(line);
            }
        }
    }

    lines
}

/// Writes needed to make the persisted lines match the incoming cart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub create: Vec<CartLine>,
    /// `(order_item id, new quantity)`
    pub update: Vec<(i32, i32)>,
    /// order_item ids
    pub remove: Vec<i32>,
}

impl ReconcilePlan {
    pub fn is_noop(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.remove.is_empty()
    }
}

pub fn plan_reconciliation(
    incoming: &[CartEntry],
    existing: &[order_item::Model],
) -> ReconcilePlan {
    let wanted = normalize_entries(incoming);
    let mut plan = ReconcilePlan::default();

    let mut existing_by_sig: HashMap<String, &order_item::Model> = HashMap::new();
    for line in existing {
        let sig = signature(line.item_id, &line.meat_topping, &line.extras());
        if existing_by_sig.contains_key(&sig) {
            // a second persisted line with the same signature is redundant
            plan.remove.push(line.id);
        } else {
            existing_by_sig.insert(sig, line);
        }
    }

    let mut matched: Vec<i32> = Vec::new();
    for line in wanted {
        match existing_by_sig.get(&line.signature()) {
            Some(current) => {
                matched.push(current.id);
                if current.quantity != line.quantity {
                    plan.update.push((current.id, line.quantity));
                }
            }
            None => plan.create.push(line),
        }
    }

    let mut stale: Vec<i32> = existing_by_sig
        .values()
        .map(|l| l.id)
        .filter(|id| !matched.contains(id))
        .collect();
    stale.sort_unstable();
    plan.remove.extend(stale);

    plan
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SyncOutcome {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    /// Entries dropped because the menu item is unknown or unavailable
    pub skipped: usize,
    pub order: order::Model,
}

async fn priced_line<C: ConnectionTrait>(
    conn: &C,
    item: &menu_item::Model,
    quantity: i32,
) -> Result<(Decimal, Decimal, Option<i32>), ServiceError> {
    let promotions = pricing::item_promotions(conn, item.id).await?;
    let (unit, promotion_id) =
        pricing::resolve_unit_price(item.price, &promotions, today());
    Ok((unit, pricing::line_subtotal(unit, quantity), promotion_id))
}

#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    sessions: SessionStore,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        sessions: SessionStore,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db,
            sessions,
            event_sender,
        }
    }

    /// The session's pending cart order, if it still exists and is pending.
    pub async fn current_cart(&self, session_id: &str) -> Result<Option<order::Model>, ServiceError> {
        let Some(order_id) = self.sessions.get(session_id).cart_order_id else {
            return Ok(None);
        };
        let order = order::Entity::find_by_id(order_id).one(&*self.db).await?;
        Ok(order.filter(|o| o.status == OrderStatus::Pending))
    }

    /// Reuses the session's pending cart order or opens a new pending delivery order.
    #[instrument(skip(self))]
    pub async fn get_or_create_cart(
        &self,
        user_id: Option<Uuid>,
        session_id: &str,
    ) -> Result<order::Model, ServiceError> {
        if let Some(order) = self.current_cart(session_id).await? {
            if order.user_id.is_none() && user_id.is_some() {
                let mut active: order::ActiveModel = order.into();
                active.user_id = Set(user_id);
                return Ok(active.update(&*self.db).await?);
            }
            return Ok(order);
        }

        let order = order::ActiveModel {
            user_id: Set(user_id),
            session_id: Set(Some(session_id.to_string())),
            order_type: Set(OrderType::Delivery),
            status: Set(OrderStatus::Pending),
            total: Set(Decimal::ZERO),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to open cart order");
            ServiceError::DatabaseError(e)
        })?;

        self.sessions.set_cart_order_id(session_id, Some(order.id));
        info!(order_id = order.id, "Cart order opened");
        Ok(order)
    }

    /// Syncs the session cart, opening one when needed
    pub async fn sync_session_cart(
        &self,
        user_id: Option<Uuid>,
        session_id: &str,
        entries: &[CartEntry],
    ) -> Result<SyncOutcome, ServiceError> {
        let cart = self.get_or_create_cart(user_id, session_id).await?;
        self.sync_cart(cart.id, entries).await
    }

    /// Applies the client cart to a pending order in one transaction and recomputes its total.
    #[instrument(skip(self, entries), fields(entries = entries.len()))]
    pub async fn sync_cart(
        &self,
        order_id: i32,
        entries: &[CartEntry],
    ) -> Result<SyncOutcome, ServiceError> {
        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for cart sync");
            ServiceError::DatabaseError(e)
        })?;

        let order = order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        if order.status != OrderStatus::Pending {
            warn!(order_id, status = %order.status, "Cart sync on a closed order");
            return Err(ServiceError::InvalidOperation(format!(
                "Order {} is {} and can no longer be edited",
                order.display_number(),
                order.status
            )));
        }

        let existing = order
            .find_related(order_item::Entity)
            .order_by_asc(order_item::Column::Id)
            .all(&txn)
            .await?;
        let plan = plan_reconciliation(entries, &existing);
        let requested_creates = plan.create.len();

        let mut created = 0;
        for line in &plan.create {
            let item = menu_item::Entity::find_by_id(line.item_id).one(&txn).await?;
            let Some(item) = item.filter(|i| i.is_available) else {
                debug!(item_id = line.item_id, "Skipping unknown or unavailable menu item");
                continue;
            };
            let (price, subtotal, promotion_id) = priced_line(&txn, &item, line.quantity).await?;
            order_item::ActiveModel {
                order_id: Set(order_id),
                item_id: Set(item.id),
                quantity: Set(line.quantity),
                price: Set(price),
                subtotal: Set(subtotal),
                promotion_id: Set(promotion_id),
                meat_topping: Set(line.meat_topping.clone()),
                extra_toppings: Set(line.extras_text()),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(|e| {
                error!(order_id, item_id = item.id, error = %e, "Failed to add cart line");
                ServiceError::DatabaseError(e)
            })?;
            created += 1;
        }

        let by_id: HashMap<i32, &order_item::Model> = existing.iter().map(|l| (l.id, l)).collect();
        for (line_id, quantity) in &plan.update {
            let Some(current) = by_id.get(line_id) else {
                continue;
            };
            let (price, subtotal, promotion_id) =
                match menu_item::Entity::find_by_id(current.item_id).one(&txn).await? {
                    Some(item) => priced_line(&txn, &item, *quantity).await?,
                    None => (
                        current.price,
                        pricing::line_subtotal(current.price, *quantity),
                        current.promotion_id,
                    ),
                };
            let mut active: order_item::ActiveModel = (*current).clone().into();
            active.quantity = Set(*quantity);
            active.price = Set(price);
            active.subtotal = Set(subtotal);
            active.promotion_id = Set(promotion_id);
            active.update(&txn).await.map_err(|e| {
                error!(order_id, line_id, error = %e, "Failed to update cart line");
                ServiceError::DatabaseError(e)
            })?;
        }

        if !plan.remove.is_empty() {
            order_item::Entity::delete_many()
                .filter(order_item::Column::Id.is_in(plan.remove.clone()))
                .exec(&txn)
                .await
                .map_err(|e| {
                    error!(order_id, error = %e, "Failed to remove cart lines");
                    ServiceError::DatabaseError(e)
                })?;
        }

        let order = pricing::recompute_order_total(&txn, order_id).await?;

        txn.commit().await.map_err(|e| {
            error!(order_id, error = %e, "Failed to commit cart sync");
            ServiceError::DatabaseError(e)
        })?;

        let outcome = SyncOutcome {
            created,
            updated: plan.update.len(),
            removed: plan.remove.len(),
            skipped: requested_creates - created,
            order,
        };

        if !plan.is_noop() {
            info!(
                order_id,
                created = outcome.created,
                updated = outcome.updated,
                removed = outcome.removed,
                total = %outcome.order.total,
                "Cart synchronized"
            );
            self.event_sender
                .send_or_log(Event::CartSynced {
                    order_id,
                    created: outcome.created,
                    updated: outcome.updated,
                    removed: outcome.removed,
                })
                .await;
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry(item_id: i32, quantity: i32, meat: &str, extras: &[&str]) -> CartEntry {
        CartEntry {
            item_id: Some(item_id),
            quantity: Some(quantity),
            meat_topping: Some(meat.to_string()),
            extra_toppings: extras.iter().map(|e| e.to_string()).collect(),
        }
    }

    fn persisted(id: i32, item_id: i32, quantity: i32, meat: &str, extras: &str) -> order_item::Model {
        order_item::Model {
            id,
            order_id: 1,
            item_id,
            quantity,
            price: dec!(10.00),
            subtotal: dec!(10.00) * Decimal::from(quantity),
            promotion_id: None,
            meat_topping: meat.to_string(),
            extra_toppings: extras.to_string(),
        }
    }

    #[test]
    fn signature_sorts_extras() {
        assert_eq!(signature(3, "beef", &["olives", "cheese"]), "3|beef|cheese,olives");
        assert_eq!(signature(3, "", &["", " egg "]), "3||egg");
    }

    #[test]
    fn duplicates_merge_by_summing() {
        let lines = normalize_entries(&[
            entry(1, 2, "", &["b", "a"]),
            entry(1, 3, "", &["a", "b"]),
            entry(2, 1, "", &[]),
        ]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].quantity, 5);
        assert_eq!(lines[0].extras_text(), "a,b");
    }

    #[test]
    fn entries_without_item_are_skipped_and_quantity_defaults() {
        let lines = normalize_entries(&[
            CartEntry::default(),
            CartEntry {
                item_id: Some(4),
                ..Default::default()
            },
        ]);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 1);
    }

    #[test]
    fn lenient_wire_format() {
        let entries: Vec<CartEntry> = serde_json::from_str(
            r#"[{"item_id": "7", "quantity": "2", "extra_toppings": "cheese"},
                {"item_id": 8, "extra_toppings": ["egg", 3]},
                {"quantity": 4}]"#,
        )
        .unwrap();
        assert_eq!(entries[0].item_id, Some(7));
        assert_eq!(entries[0].quantity, Some(2));
        assert!(entries[0].extra_toppings.is_empty());
        assert_eq!(entries[1].extra_toppings, vec!["egg".to_string()]);
        assert_eq!(entries[2].item_id, None);
    }

    #[test]
    fn plan_diffs_by_signature() {
        let existing = vec![
            persisted(10, 1, 1, "beef", "cheese"),
            persisted(11, 2, 2, "", ""),
            persisted(12, 3, 1, "", ""),
        ];
        let incoming = vec![
            entry(1, 1, "beef", &["cheese"]),
            entry(2, 5, "", &[]),
            entry(1, 1, "chicken", &["cheese"]),
        ];
        let plan = plan_reconciliation(&incoming, &existing);
        assert_eq!(plan.create.len(), 1);
        assert_eq!(plan.create[0].meat_topping, "chicken");
        assert_eq!(plan.update, vec![(11, 5)]);
        assert_eq!(plan.remove, vec![12]);
    }

    #[test]
    fn same_cart_twice_plans_nothing() {
        let existing = vec![persisted(10, 1, 2, "", "a,b")];
        let plan = plan_reconciliation(&[entry(1, 2, "", &["b", "a"])], &existing);
        assert!(plan.is_noop());
    }

    #[test]
    fn empty_cart_removes_everything() {
        let existing = vec![persisted(10, 1, 2, "", ""), persisted(11, 2, 1, "", "")];
        let plan = plan_reconciliation(&[], &existing);
        assert_eq!(plan.remove, vec![10, 11]);
    }
}
