pub mod delivery;
pub mod menu_category;
pub mod menu_item;
pub mod menu_subcategory;
pub mod order;
pub mod order_item;
pub mod promotion;
pub mod reservation;
pub mod review;
pub mod table;
pub mod takeout;
pub mod transaction;
pub mod user;

/// Money fields render with exactly two decimal places, whatever scale the
/// store hands back (SQLite returns `580` for a saved `580.00`).
pub mod money {
    use rust_decimal::{Decimal, RoundingStrategy};
    use serde::{Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        let mut amount = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        amount.rescale(2);
        Serialize::serialize(&amount, serializer)
    }

    #[cfg(test)]
    mod tests {
        use rust_decimal_macros::dec;
        use serde::Serialize;

        #[derive(Serialize)]
        struct Price {
            #[serde(serialize_with = "super::serialize")]
            amount: rust_decimal::Decimal,
        }

        fn render(amount: rust_decimal::Decimal) -> String {
            serde_json::to_value(Price { amount }).unwrap()["amount"]
                .as_str()
                .unwrap()
                .to_string()
        }

        #[test]
        fn always_two_places() {
            assert_eq!(render(dec!(580)), "580.00");
            assert_eq!(render(dec!(12.5)), "12.50");
            assert_eq!(render(dec!(169.9915)), "169.99");
            assert_eq!(render(dec!(0.005)), "0.01");
        }
    }
}
