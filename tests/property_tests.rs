//! Property-based tests for the pricing, cart and availability rules.
//!
//! These use proptest to check invariants over wide input ranges that the
//! example-based unit tests only sample.

use chrono::{Duration, NaiveDate, NaiveTime};
use proptest::prelude::*;
use rust_decimal::Decimal;

use restaurant_api::{
    entities::{order, promotion},
    services::{
        accounts::{customer_tier, CustomerTier},
        availability::{seat_class, validate_request, windows_overlap, ServiceHours},
        cart::{normalize_entries, signature, CartEntry},
        pricing::{order_total, resolve_unit_price, round_money},
    },
};

fn money_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000, 0u32..5).prop_map(|(units, scale)| Decimal::new(units, scale))
}

fn discount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=100).prop_map(|pct| Decimal::new(pct, 2))
}

fn slot_strategy() -> impl Strategy<Value = NaiveTime> {
    (15u32..23, prop_oneof![Just(0u32), Just(15), Just(30), Just(45)])
        .prop_map(|(h, m)| NaiveTime::from_hms_opt(h, m, 0).expect("valid slot"))
}

fn any_time_strategy() -> impl Strategy<Value = NaiveTime> {
    (0u32..24, 0u32..60).prop_map(|(h, m)| NaiveTime::from_hms_opt(h, m, 0).expect("valid time"))
}

fn entry_strategy() -> impl Strategy<Value = CartEntry> {
    (
        prop::option::of(-2i32..6),
        prop::option::of(-3i32..5),
        prop::option::of(prop_oneof![Just("beef"), Just(" chicken "), Just("")]),
        prop::collection::vec(prop_oneof![Just("cheese"), Just(" olives"), Just("")], 0..3),
    )
        .prop_map(|(item_id, quantity, meat, extras)| CartEntry {
            item_id,
            quantity,
            meat_topping: meat.map(str::to_string),
            extra_toppings: extras.into_iter().map(str::to_string).collect(),
        })
}

fn promo(id: i32, discount: Decimal, day: NaiveDate) -> promotion::Model {
    promotion::Model {
        id,
        item_id: 1,
        title: format!("promo {}", id),
        description: String::new(),
        start_date: day - Duration::days(1),
        end_date: day + Duration::days(1),
        discount_percent: discount,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn rounding_is_idempotent_and_close(value in money_strategy()) {
        let once = round_money(value);
        prop_assert_eq!(round_money(once), once);
        prop_assert!(once.scale() <= 2);
        prop_assert!((once - value).abs() <= Decimal::new(5, 3));
    }

    #[test]
    fn discounted_price_never_exceeds_base(
        base in money_strategy(),
        discounts in prop::collection::vec(discount_strategy(), 0..4),
    ) {
        let day = NaiveDate::from_ymd_opt(2025, 6, 1).expect("date");
        let promos: Vec<_> = discounts
            .iter()
            .enumerate()
            .map(|(i, d)| promo(i as i32 + 1, *d, day))
            .collect();

        let (price, applied) = resolve_unit_price(base, &promos, day);
        prop_assert!(price <= round_money(base));
        prop_assert!(price >= Decimal::ZERO);
        if discounts.iter().all(|d| d.is_zero()) {
            prop_assert!(applied.is_none());
        }
    }

    #[test]
    fn expired_promotions_do_not_apply(base in money_strategy(), discount in discount_strategy()) {
        let day = NaiveDate::from_ymd_opt(2025, 6, 1).expect("date");
        let promos = vec![promo(1, discount, day - Duration::days(10))];

        prop_assert_eq!(resolve_unit_price(base, &promos, day), (round_money(base), None));
    }

    #[test]
    fn total_is_subtotals_plus_fee(
        subtotals in prop::collection::vec(money_strategy(), 0..6),
        fee in money_strategy(),
    ) {
        let total = order_total(subtotals.clone(), fee);
        let expected: Decimal = subtotals.iter().copied().map(round_money).sum::<Decimal>() + round_money(fee);
        prop_assert_eq!(total, round_money(expected));
    }

    #[test]
    fn normalized_lines_are_unique_and_positive(entries in prop::collection::vec(entry_strategy(), 0..12)) {
        let lines = normalize_entries(&entries);

        let mut signatures: Vec<String> = lines.iter().map(|l| l.signature()).collect();
        signatures.sort();
        signatures.dedup();
        prop_assert_eq!(signatures.len(), lines.len());

        for line in &lines {
            prop_assert!(line.item_id > 0);
            prop_assert!(line.quantity >= 1);
            prop_assert!(line.extras.windows(2).all(|w| w[0] <= w[1]));
        }

        // Every kept entry contributes at least one unit
        let kept = entries.iter().filter(|e| e.item_id.is_some_and(|id| id > 0)).count();
        let units: i32 = lines.iter().map(|l| l.quantity).sum();
        prop_assert!(units as usize >= kept);
    }

    #[test]
    fn signature_ignores_extra_order(a in "[a-z]{1,6}", b in "[a-z]{1,6}") {
        prop_assert_eq!(
            signature(3, "beef", &[a.as_str(), b.as_str()]),
            signature(3, " beef ", &[b.as_str(), a.as_str()])
        );
    }

    #[test]
    fn overlap_is_symmetric_and_bounded(a in slot_strategy(), b in slot_strategy()) {
        let window = Duration::minutes(120);
        prop_assert_eq!(windows_overlap(a, b, window), windows_overlap(b, a, window));
        prop_assert!(windows_overlap(a, a, window));

        let gap = (a - b).num_minutes().abs();
        prop_assert_eq!(windows_overlap(a, b, window), gap < 120);
    }

    #[test]
    fn times_outside_hours_or_off_grid_are_rejected(
        time in any_time_strategy(),
        party in 1i32..=20,
        days_ahead in 0i64..60,
    ) {
        use chrono::Timelike;
        prop_assume!(time.hour() < 15 || time.hour() >= 23 || time.minute() % 15 != 0);

        let today = NaiveDate::from_ymd_opt(2030, 6, 10).expect("date");
        let date = today + Duration::days(days_ahead);
        prop_assert!(validate_request(date, time, party, today, &ServiceHours::default()).is_err());
    }

    #[test]
    fn aligned_times_inside_hours_are_accepted(
        time in slot_strategy(),
        party in 1i32..=20,
        days_ahead in 0i64..60,
    ) {
        let today = NaiveDate::from_ymd_opt(2030, 6, 10).expect("date");
        let date = today + Duration::days(days_ahead);
        let slot = validate_request(date, time, party, today, &ServiceHours::default());
        prop_assert!(slot.is_ok(), "{:?} at {} rejected", slot, time);
        if let Ok(slot) = slot {
            prop_assert_eq!(slot.seats, i32::from(seat_class(party)));
        }
    }

    #[test]
    fn seat_class_covers_every_party(party in 1i32..=4) {
        let seats = seat_class(party);
        prop_assert!(i32::from(seats) >= party);
        prop_assert!(seats == 2 || seats == 4);
    }

    #[test]
    fn tiers_only_go_up(n in 0u64..100) {
        let rank = |t: CustomerTier| match t {
            CustomerTier::Regular => 0,
            CustomerTier::Active => 1,
            CustomerTier::Vip => 2,
        };
        prop_assert!(rank(customer_tier(n)) <= rank(customer_tier(n + 1)));
    }

    #[test]
    fn display_numbers_parse_back(id in 1i32..100_000) {
        prop_assert_eq!(order::parse_display_number(&order::display_number(id)), Some(id));
        prop_assert_eq!(order::parse_display_number(&id.to_string()), Some(id));
    }
}
