//! Order total engine.
//!
//! Money is rounded half-up to two decimal places at every stage: the resolved
//! unit price, each line subtotal and the final order total.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
};
use tracing::{debug, error};

use crate::{
    entities::{
        delivery,
        order::{self, OrderType},
        order_item, promotion, takeout,
    },
    errors::ServiceError,
};

/// Rounds half away from zero to two decimal places.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Unit price after the best promotion active on `today`, with the id of the applied promotion.
///
/// Discounts are clamped to `[0, 1]`; a zero discount is not reported as applied.
pub fn resolve_unit_price(
    base_price: Decimal,
    promotions: &[promotion::Model],
    today: NaiveDate,
) -> (Decimal, Option<i32>) {
    let best = promotions
        .iter()
        .filter(|p| p.is_active_on(today))
        .map(|p| (p.discount_percent.clamp(Decimal::ZERO, Decimal::ONE), p.id))
        .filter(|(discount, _)| !discount.is_zero())
        .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

    match best {
        Some((discount, id)) => (round_money(base_price * (Decimal::ONE - discount)), Some(id)),
        None => (round_money(base_price), None),
    }
}

pub fn line_subtotal(unit_price: Decimal, quantity: i32) -> Decimal {
    round_money(unit_price * Decimal::from(quantity))
}

/// Fee charged for the order type: the delivery fee, the takeout fee or nothing for dine-in.
pub fn applicable_fee(
    order_type: OrderType,
    delivery_fee: Option<Decimal>,
    takeout_fee: Option<Decimal>,
) -> Decimal {
    let fee = match order_type {
        OrderType::Delivery => delivery_fee,
        OrderType::Takeout => takeout_fee,
        OrderType::DineIn => None,
    };
    round_money(fee.unwrap_or(Decimal::ZERO))
}

/// `round(sum(subtotals) + fee)`
pub fn order_total<I>(subtotals: I, fee: Decimal) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    let items: Decimal = subtotals.into_iter().map(round_money).sum();
    round_money(items + round_money(fee))
}

/// Promotions attached to `item_id`.
pub async fn item_promotions<C: ConnectionTrait>(
    conn: &C,
    item_id: i32,
) -> Result<Vec<promotion::Model>, ServiceError> {
    Ok(promotion::Entity::find()
        .filter(promotion::Column::ItemId.eq(item_id))
        .all(conn)
        .await?)
}

/// Recomputes and persists an order's total from its lines and active fee record.
///
/// Runs on whatever connection it is given, so callers inside a transaction
/// see their own uncommitted line writes.
pub async fn recompute_order_total<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
) -> Result<order::Model, ServiceError> {
    let order = order::Entity::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

    let lines = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .all(conn)
        .await?;

    let delivery_fee = match order.order_type {
        OrderType::Delivery => delivery::Entity::find()
            .filter(delivery::Column::OrderId.eq(order_id))
            .one(conn)
            .await?
            .map(|d| d.fee),
        _ => None,
    };
    let takeout_fee = match order.order_type {
        OrderType::Takeout => takeout::Entity::find()
            .filter(takeout::Column::OrderId.eq(order_id))
            .one(conn)
            .await?
            .map(|t| t.fee),
        _ => None,
    };

    let fee = applicable_fee(order.order_type, delivery_fee, takeout_fee);
    let total = order_total(lines.iter().map(|l| l.subtotal), fee);

    if total == order.total {
        return Ok(order);
    }

    debug!(order_id, %total, %fee, lines = lines.len(), "Order total recomputed");

    let mut active: order::ActiveModel = order.into();
    active.total = Set(total);
    active.update(conn).await.map_err(|e| {
        error!(order_id, error = %e, "Failed to persist order total");
        ServiceError::DatabaseError(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 3, d).unwrap()
    }

    fn promo(id: i32, discount: Decimal, start: u32, end: u32) -> promotion::Model {
        promotion::Model {
            id,
            item_id: 1,
            title: format!("Promo {}", id),
            description: String::new(),
            start_date: day(start),
            end_date: day(end),
            discount_percent: discount,
        }
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(round_money(dec!(2.345)), dec!(2.35));
        assert_eq!(round_money(dec!(2.344)), dec!(2.34));
        assert_eq!(round_money(dec!(0.005)), dec!(0.01));
    }

    #[test]
    fn active_promotion_discounts_unit_price() {
        let promos = vec![promo(1, dec!(0.10), 1, 5)];
        assert_eq!(
            resolve_unit_price(dec!(10.00), &promos, day(3)),
            (dec!(9.00), Some(1))
        );
        assert_eq!(
            resolve_unit_price(dec!(10.00), &promos, day(6)),
            (dec!(10.00), None)
        );
    }

    #[test]
    fn promotion_bounds_are_inclusive() {
        let promos = vec![promo(1, dec!(0.25), 2, 4)];
        assert_eq!(resolve_unit_price(dec!(8.00), &promos, day(2)).1, Some(1));
        assert_eq!(resolve_unit_price(dec!(8.00), &promos, day(4)).1, Some(1));
        assert_eq!(resolve_unit_price(dec!(8.00), &promos, day(1)).1, None);
    }

    #[test]
    fn highest_discount_wins() {
        let promos = vec![
            promo(1, dec!(0.10), 1, 9),
            promo(2, dec!(0.30), 1, 9),
            promo(3, dec!(0.20), 1, 9),
        ];
        assert_eq!(
            resolve_unit_price(dec!(100.00), &promos, day(5)),
            (dec!(70.00), Some(2))
        );
    }

    #[test]
    fn discount_result_is_rounded() {
        let promos = vec![promo(1, dec!(0.15), 1, 9)];
        // 9.99 * 0.85 = 8.4915
        assert_eq!(resolve_unit_price(dec!(9.99), &promos, day(5)).0, dec!(8.49));
    }

    #[test]
    fn fee_follows_order_type() {
        let d = Some(dec!(50.00));
        let t = Some(dec!(5.00));
        assert_eq!(applicable_fee(OrderType::Delivery, d, t), dec!(50.00));
        assert_eq!(applicable_fee(OrderType::Takeout, d, t), dec!(5.00));
        assert_eq!(applicable_fee(OrderType::DineIn, d, t), Decimal::ZERO);
        assert_eq!(applicable_fee(OrderType::Delivery, None, t), Decimal::ZERO);
    }

    #[test]
    fn total_sums_lines_and_fee() {
        let subtotals = vec![line_subtotal(dec!(12.50), 2), line_subtotal(dec!(3.33), 3)];
        assert_eq!(subtotals, vec![dec!(25.00), dec!(9.99)]);
        assert_eq!(order_total(subtotals, dec!(50.00)), dec!(84.99));
        assert_eq!(order_total(Vec::new(), Decimal::ZERO), Decimal::ZERO);
    }
}
