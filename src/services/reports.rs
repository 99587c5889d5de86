//! Dashboard read models for the home page, staff, admins and customers.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, Iterable, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::{
        menu_item,
        order::{self, OrderStatus, OrderType},
        order_item,
        reservation::{self, ReservationStatus},
        review,
        user::{self, UserRole},
    },
    errors::ServiceError,
    services::{
        orders::{summarize, OrderSummary},
        pricing,
    },
};

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Sorts `(item_id, score)` pairs by score descending, ties to the lower id.
pub fn rank_popular(mut scores: Vec<(i32, i64)>, limit: usize) -> Vec<(i32, i64)> {
    scores.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    scores.truncate(limit);
    scores
}

/// Monday through Sunday of the week containing `day`.
pub fn week_of(day: NaiveDate) -> [NaiveDate; 7] {
    let monday = day - Duration::days(i64::from(day.weekday().num_days_from_monday()));
    let mut days = [monday; 7];
    for (offset, slot) in days.iter_mut().enumerate() {
        *slot = monday + Duration::days(offset as i64);
    }
    days
}

/// Counts `values` per label, listing every label of `all` even at zero.
pub fn count_by<T, A, V>(all: A, values: V) -> BTreeMap<String, u64>
where
    T: Display,
    A: IntoIterator<Item = T>,
    V: IntoIterator<Item = T>,
{
    let mut counts: BTreeMap<String, u64> = all.into_iter().map(|k| (k.to_string(), 0)).collect();
    for value in values {
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }
    counts
}

fn local_midnight(day: NaiveDate) -> DateTime<Utc> {
    let naive = day.and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}

fn local_date(at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&Local).date_naive()
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PopularDish {
    #[serde(flatten)]
    pub item: menu_item::Model,
    pub sold: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HomeView {
    pub featured_dishes: Vec<PopularDish>,
    pub reviews: Vec<review::Model>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StaffOverview {
    pub date: NaiveDate,
    pub todays_orders: u64,
    pub preparing_orders: u64,
    pub pending_orders: u64,
    pub active_reservations: u64,
    pub confirmed_reservations: u64,
    pub pending_reservations: u64,
    pub active_orders: Vec<OrderSummary>,
    pub upcoming_reservations: Vec<reservation::Model>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StaffOrders {
    pub date: NaiveDate,
    pub total: u64,
    pub by_status: BTreeMap<String, u64>,
    pub by_type: BTreeMap<String, u64>,
    pub orders: Vec<OrderSummary>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StaffReservations {
    /// Set when a single day was requested
    pub date: Option<NaiveDate>,
    pub total: u64,
    pub by_status: BTreeMap<String, u64>,
    pub total_guests: i64,
    pub reservations: Vec<reservation::Model>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PopularItem {
    pub id: i32,
    pub name: String,
    pub order_count: i64,
    #[serde(serialize_with = "crate::entities::money::serialize")]
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailyRevenue {
    pub day: String,
    pub date: NaiveDate,
    #[serde(serialize_with = "crate::entities::money::serialize")]
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdminOverview {
    #[serde(serialize_with = "crate::entities::money::serialize")]
    pub total_revenue: Decimal,
    pub active_orders: u64,
    pub pending_reservations: u64,
    pub total_customers: u64,
    pub recent_orders: Vec<OrderSummary>,
    pub popular_items: Vec<PopularItem>,
    pub weekly_revenue: Vec<DailyRevenue>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CustomerOverview {
    pub total_orders: u64,
    pub pending_orders: u64,
    pub preparing_orders: u64,
    pub total_reservations: u64,
    pub upcoming_reservations: u64,
    pub recent_orders: Vec<OrderSummary>,
    pub recent_reservations: Vec<reservation::Model>,
}

/// Buckets order totals into the seven days of `week`.
pub fn weekly_revenue(week: [NaiveDate; 7], orders: &[(NaiveDate, Decimal)]) -> Vec<DailyRevenue> {
    week.iter()
        .zip(WEEKDAYS)
        .map(|(date, day)| {
            let revenue = orders
                .iter()
                .filter(|(d, _)| d == date)
                .map(|(_, total)| *total)
                .sum::<Decimal>();
            DailyRevenue {
                day: day.to_string(),
                date: *date,
                revenue: pricing::round_money(revenue),
            }
        })
        .collect()
}

#[derive(Clone)]
pub struct ReportService {
    db: Arc<DatabaseConnection>,
}

impl ReportService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Top three dishes by quantity sold and the three latest verified reviews
    #[instrument(skip(self))]
    pub async fn home(&self) -> Result<HomeView, ServiceError> {
        let db = &*self.db;
        let sold: Vec<(i32, Option<i64>)> = order_item::Entity::find()
            .select_only()
            .column(order_item::Column::ItemId)
            .column_as(order_item::Column::Quantity.sum(), "sold")
            .group_by(order_item::Column::ItemId)
            .into_tuple()
            .all(db)
            .await?;
        let sold: HashMap<i32, i64> = sold
            .into_iter()
            .map(|(id, qty)| (id, qty.unwrap_or(0)))
            .collect();

        let items = menu_item::Entity::find().all(db).await?;
        let scores = items
            .iter()
            .map(|i| (i.id, sold.get(&i.id).copied().unwrap_or(0)))
            .collect();
        let ranked = rank_popular(scores, 3);

        let mut by_id: HashMap<i32, menu_item::Model> = items.into_iter().map(|i| (i.id, i)).collect();
        let featured_dishes = ranked
            .into_iter()
            .filter_map(|(id, sold)| by_id.remove(&id).map(|item| PopularDish { item, sold }))
            .collect();

        let reviews = review::Entity::find()
            .filter(review::Column::IsVerified.eq(true))
            .order_by_desc(review::Column::SubmittedAt)
            .order_by_desc(review::Column::Id)
            .limit(3)
            .all(db)
            .await?;

        Ok(HomeView {
            featured_dishes,
            reviews,
        })
    }

    #[instrument(skip(self))]
    pub async fn staff_overview(&self, today: NaiveDate) -> Result<StaffOverview, ServiceError> {
        let db = &*self.db;
        let todays_orders = order::Entity::find()
            .filter(order::Column::CreatedAt.gte(local_midnight(today)))
            .filter(order::Column::CreatedAt.lt(local_midnight(today + Duration::days(1))))
            .count(db)
            .await?;
        let preparing_orders = order::Entity::find()
            .filter(order::Column::Status.eq(OrderStatus::Preparing))
            .count(db)
            .await?;
        let pending_orders = order::Entity::find()
            .filter(order::Column::Status.eq(OrderStatus::Pending))
            .count(db)
            .await?;

        let active = || {
            reservation::Entity::find()
                .filter(reservation::Column::Date.gte(today))
                .filter(reservation::Column::Status.ne(ReservationStatus::Cancelled))
        };
        let active_reservations = active().count(db).await?;
        let confirmed_reservations = active()
            .filter(reservation::Column::Status.eq(ReservationStatus::Confirmed))
            .count(db)
            .await?;
        let pending_reservations = active()
            .filter(reservation::Column::Status.eq(ReservationStatus::Pending))
            .count(db)
            .await?;

        let latest = order::Entity::find()
            .filter(order::Column::Status.is_in([OrderStatus::Pending, OrderStatus::Preparing]))
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .limit(5)
            .all(db)
            .await?;
        let upcoming_reservations = reservation::Entity::find()
            .filter(reservation::Column::Date.eq(today))
            .filter(
                reservation::Column::Status
                    .is_in([ReservationStatus::Pending, ReservationStatus::Confirmed]),
            )
            .order_by_asc(reservation::Column::Time)
            .limit(5)
            .all(db)
            .await?;

        Ok(StaffOverview {
            date: today,
            todays_orders,
            preparing_orders,
            pending_orders,
            active_reservations,
            confirmed_reservations,
            pending_reservations,
            active_orders: summarize(db, latest).await?,
            upcoming_reservations,
        })
    }

    /// Orders placed today with counts by status and type
    #[instrument(skip(self))]
    pub async fn staff_orders(&self, today: NaiveDate) -> Result<StaffOrders, ServiceError> {
        let db = &*self.db;
        let orders = order::Entity::find()
            .filter(order::Column::CreatedAt.gte(local_midnight(today)))
            .filter(order::Column::CreatedAt.lt(local_midnight(today + Duration::days(1))))
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .all(db)
            .await?;

        let by_status = count_by(OrderStatus::iter(), orders.iter().map(|o| o.status));
        let by_type = count_by(OrderType::iter(), orders.iter().map(|o| o.order_type));
        Ok(StaffOrders {
            date: today,
            total: orders.len() as u64,
            by_status,
            by_type,
            orders: summarize(db, orders).await?,
        })
    }

    /// Reservations on `date`, or from `today` onwards when no date is given.
    #[instrument(skip(self))]
    pub async fn staff_reservations(
        &self,
        today: NaiveDate,
        date: Option<NaiveDate>,
    ) -> Result<StaffReservations, ServiceError> {
        let query = match date {
            Some(day) => reservation::Entity::find()
                .filter(reservation::Column::Date.eq(day))
                .order_by_asc(reservation::Column::Time),
            None => reservation::Entity::find()
                .filter(reservation::Column::Date.gte(today))
                .order_by_asc(reservation::Column::Date)
                .order_by_asc(reservation::Column::Time),
        };
        let reservations = query.all(&*self.db).await?;

        let by_status = count_by(
            ReservationStatus::iter(),
            reservations.iter().map(|r| r.status),
        );
        let total_guests = reservations.iter().map(|r| i64::from(r.party_size)).sum();
        Ok(StaffReservations {
            date,
            total: reservations.len() as u64,
            by_status,
            total_guests,
            reservations,
        })
    }

    #[instrument(skip(self))]
    pub async fn admin_overview(&self, today: NaiveDate) -> Result<AdminOverview, ServiceError> {
        let db = &*self.db;
        let completed: Vec<Decimal> = order::Entity::find()
            .select_only()
            .column(order::Column::Total)
            .filter(order::Column::Status.eq(OrderStatus::Completed))
            .into_tuple()
            .all(db)
            .await?;
        let total_revenue = pricing::round_money(completed.into_iter().sum());

        let active_orders = order::Entity::find()
            .filter(order::Column::Status.eq(OrderStatus::Preparing))
            .count(db)
            .await?;
        let pending_reservations = reservation::Entity::find()
            .filter(reservation::Column::Status.eq(ReservationStatus::Pending))
            .count(db)
            .await?;
        let total_customers = user::Entity::find()
            .filter(user::Column::Role.eq(UserRole::Customer))
            .count(db)
            .await?;

        let recent = order::Entity::find()
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .limit(5)
            .all(db)
            .await?;

        let line_counts: Vec<(i32, i64)> = order_item::Entity::find()
            .select_only()
            .column(order_item::Column::ItemId)
            .column_as(order_item::Column::Id.count(), "lines")
            .group_by(order_item::Column::ItemId)
            .into_tuple()
            .all(db)
            .await?;
        let ranked = rank_popular(line_counts, 5);
        let items: HashMap<i32, menu_item::Model> = menu_item::Entity::find()
            .filter(menu_item::Column::Id.is_in(ranked.iter().map(|(id, _)| *id)))
            .all(db)
            .await?
            .into_iter()
            .map(|i| (i.id, i))
            .collect();
        let popular_items = ranked
            .into_iter()
            .filter_map(|(id, order_count)| {
                items.get(&id).map(|item| PopularItem {
                    id,
                    name: item.name.clone(),
                    order_count,
                    revenue: pricing::round_money(item.price * Decimal::from(order_count)),
                })
            })
            .collect();

        let week = week_of(today);
        let paid: Vec<(DateTime<Utc>, Decimal)> = order::Entity::find()
            .select_only()
            .column(order::Column::CreatedAt)
            .column(order::Column::Total)
            .filter(order::Column::Status.is_in([OrderStatus::Preparing, OrderStatus::Completed]))
            .filter(order::Column::CreatedAt.gte(local_midnight(week[0])))
            .filter(order::Column::CreatedAt.lt(local_midnight(week[6] + Duration::days(1))))
            .into_tuple()
            .all(db)
            .await?;
        let paid: Vec<(NaiveDate, Decimal)> = paid
            .into_iter()
            .map(|(at, total)| (local_date(at), total))
            .collect();

        Ok(AdminOverview {
            total_revenue,
            active_orders,
            pending_reservations,
            total_customers,
            recent_orders: summarize(db, recent).await?,
            popular_items,
            weekly_revenue: weekly_revenue(week, &paid),
        })
    }

    #[instrument(skip(self))]
    pub async fn customer_overview(
        &self,
        user_id: Uuid,
        today: NaiveDate,
    ) -> Result<CustomerOverview, ServiceError> {
        let db = &*self.db;
        let orders = || order::Entity::find().filter(order::Column::UserId.eq(user_id));
        let total_orders = orders().count(db).await?;
        let pending_orders = orders()
            .filter(order::Column::Status.eq(OrderStatus::Pending))
            .count(db)
            .await?;
        let preparing_orders = orders()
            .filter(order::Column::Status.eq(OrderStatus::Preparing))
            .count(db)
            .await?;
        let recent = orders()
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .limit(3)
            .all(db)
            .await?;

        let reservations =
            || reservation::Entity::find().filter(reservation::Column::UserId.eq(user_id));
        let total_reservations = reservations().count(db).await?;
        let upcoming_reservations = reservations()
            .filter(reservation::Column::Status.eq(ReservationStatus::Confirmed))
            .filter(reservation::Column::Date.gte(today))
            .count(db)
            .await?;
        let recent_reservations = reservations()
            .order_by_desc(reservation::Column::Date)
            .order_by_desc(reservation::Column::Time)
            .limit(3)
            .all(db)
            .await?;

        Ok(CustomerOverview {
            total_orders,
            pending_orders,
            preparing_orders,
            total_reservations,
            upcoming_reservations,
            recent_orders: summarize(db, recent).await?,
            recent_reservations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn popularity_ties_go_to_the_lower_id() {
        let ranked = rank_popular(vec![(4, 2), (2, 5), (9, 5), (1, 0)], 3);
        assert_eq!(ranked, vec![(2, 5), (9, 5), (4, 2)]);
    }

    #[test]
    fn week_runs_monday_to_sunday() {
        // 2024-05-15 is a Wednesday
        let week = week_of(day(2024, 5, 15));
        assert_eq!(week[0], day(2024, 5, 13));
        assert_eq!(week[6], day(2024, 5, 19));
        assert_eq!(week_of(day(2024, 5, 13))[0], day(2024, 5, 13));
    }

    #[test]
    fn revenue_is_bucketed_per_day() {
        let week = week_of(day(2024, 5, 15));
        let orders = vec![
            (day(2024, 5, 13), dec!(10.50)),
            (day(2024, 5, 13), dec!(4.25)),
            (day(2024, 5, 19), dec!(20.00)),
        ];
        let chart = weekly_revenue(week, &orders);
        assert_eq!(chart.len(), 7);
        assert_eq!(chart[0].day, "Mon");
        assert_eq!(chart[0].revenue, dec!(14.75));
        assert_eq!(chart[3].revenue, Decimal::ZERO);
        assert_eq!(chart[6].revenue, dec!(20.00));
    }

    #[test]
    fn counts_include_zero_buckets() {
        let counts = count_by(
            OrderStatus::iter(),
            [OrderStatus::Pending, OrderStatus::Pending, OrderStatus::Completed],
        );
        assert_eq!(counts.len(), 4);
        assert_eq!(counts[&OrderStatus::Pending.to_string()], 2);
        assert_eq!(counts[&OrderStatus::Cancelled.to_string()], 0);
    }
}
