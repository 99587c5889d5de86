// Reservations
pub mod availability;
pub mod reservations;
pub mod tables;

// Ordering
pub mod cart;
pub mod checkout;
pub mod order_status;
pub mod orders;
pub mod pricing;

// Catalog
pub mod menu;

// Customers and feedback
pub mod accounts;
pub mod reviews;

// Dashboards
pub mod reports;

use chrono::{Local, NaiveDate, NaiveTime};
use sea_orm::sea_query::{Expr, Func, IntoColumnRef, SimpleExpr};

/// Calendar date in the restaurant's local time zone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Case-insensitive substring match on a text column.
pub(crate) fn icontains<C: IntoColumnRef>(column: C, needle: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).like(format!("%{}%", needle.trim().to_lowercase()))
}

/// Parses `HH:MM` or `HH:MM:SS`.
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

/// Serde adapters for wall-clock times written as `HH:MM` or `HH:MM:SS`.
pub mod clock {
    use chrono::NaiveTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_time(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid time '{}', expected HH:MM", raw)))
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::{de::Error, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            time: &Option<NaiveTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(t) => serializer.serialize_str(&t.format("%H:%M").to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveTime>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(raw) if raw.trim().is_empty() => Ok(None),
                Some(raw) => super::super::parse_time(&raw).map(Some).ok_or_else(|| {
                    D::Error::custom(format!("invalid time '{}', expected HH:MM", raw))
                }),
            }
        }
    }
}
