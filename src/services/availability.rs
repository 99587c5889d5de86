//! Table availability.
//!
//! A booking occupies its table for a fixed service window starting at the
//! booked time. Requests are validated against the service hours and the
//! booking grid before any table is considered, and tables are matched on
//! seat class only (2-seat tables for couples, 4-seat tables otherwise).

use chrono::{Duration, NaiveDate, NaiveTime, Timelike};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{instrument, warn};

use crate::{
    entities::{
        reservation::{self, ReservationStatus},
        table,
    },
    errors::ServiceError,
};

/// Bookable hours and grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceHours {
    pub opening: NaiveTime,
    pub closing: NaiveTime,
    pub last_seating: NaiveTime,
    pub slot_minutes: u32,
    pub window_minutes: u32,
    pub max_party_size: i32,
}

fn clock(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default()
}

impl Default for ServiceHours {
    fn default() -> Self {
        Self {
            opening: clock(15, 0),
            closing: clock(23, 0),
            last_seating: clock(23, 0),
            slot_minutes: 15,
            window_minutes: 120,
            max_party_size: 20,
        }
    }
}

impl ServiceHours {
    pub fn window(&self) -> Duration {
        Duration::minutes(i64::from(self.window_minutes))
    }
}

/// A validated booking request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SlotRequest {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub party_size: i32,
    /// Seat class the party needs
    pub seats: i32,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AvailabilityError {
    #[error("Party size must be between 1 and {0}, the maximum party size we take bookings for")]
    PartySize(i32),

    #[error("Reservations cannot be made for a past date")]
    PastDate,

    #[error("Reservations are available between {opening} and {closing}")]
    OutsideServiceHours { opening: String, closing: String },

    #[error("The last seating is at {0}")]
    AfterLastSeating(String),

    #[error("Reservations are taken in {0}-minute steps")]
    OffGrid(u32),

    #[error("Table {table_number} seats {seats}, which does not suit a party of {party_size}")]
    WrongSeatClass {
        table_number: i32,
        seats: i32,
        party_size: i32,
    },

    #[error("No {seats}-seat table is free at {time} on {date}")]
    NoTableFree {
        seats: i32,
        date: NaiveDate,
        time: String,
    },

    #[error("Table {table_number} is already booked around {time} on {date}")]
    TableTaken {
        table_number: i32,
        date: NaiveDate,
        time: String,
    },
}

impl From<AvailabilityError> for ServiceError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::TableTaken { .. } => ServiceError::Conflict(err.to_string()),
            other => ServiceError::ValidationError(other.to_string()),
        }
    }
}

fn hhmm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Seat class required by a party: 2-seat tables for one or two guests, 4-seat tables otherwise.
pub fn seat_class(party_size: i32) -> u8 {
    if party_size <= 2 {
        2
    } else {
        4
    }
}

/// Whether two bookings starting at `a_start` and `b_start` share any part of
/// their `[start, start + window)` intervals.
pub fn windows_overlap(a_start: NaiveTime, b_start: NaiveTime, window: Duration) -> bool {
    let gap = a_start.signed_duration_since(b_start).num_seconds().abs();
    gap < window.num_seconds()
}

/// Checks a booking request against the party limits, the calendar and the service hours.
pub fn validate_request(
    date: NaiveDate,
    time: NaiveTime,
    party_size: i32,
    today: NaiveDate,
    hours: &ServiceHours,
) -> Result<SlotRequest, AvailabilityError> {
    if party_size < 1 || party_size > hours.max_party_size {
        return Err(AvailabilityError::PartySize(hours.max_party_size));
    }
    if date < today {
        return Err(AvailabilityError::PastDate);
    }
    if time < hours.opening || time >= hours.closing {
        return Err(AvailabilityError::OutsideServiceHours {
            opening: hhmm(hours.opening),
            closing: hhmm(hours.closing),
        });
    }
    if time > hours.last_seating {
        return Err(AvailabilityError::AfterLastSeating(hhmm(hours.last_seating)));
    }

    let minute_of_day = time.hour() * 60 + time.minute();
    let slot = hours.slot_minutes.max(1);
    if minute_of_day % slot != 0 || time.second() != 0 || time.nanosecond() != 0 {
        return Err(AvailabilityError::OffGrid(slot));
    }

    Ok(SlotRequest {
        date,
        time,
        party_size,
        seats: i32::from(seat_class(party_size)),
    })
}

async fn blocking_reservations<C: ConnectionTrait>(
    conn: &C,
    date: NaiveDate,
    table_ids: Vec<i32>,
    exclude_reservation: Option<i32>,
) -> Result<Vec<reservation::Model>, ServiceError> {
    let mut query = reservation::Entity::find()
        .filter(reservation::Column::Date.eq(date))
        .filter(reservation::Column::TableId.is_in(table_ids))
        .filter(reservation::Column::Status.ne(ReservationStatus::Cancelled));
    if let Some(id) = exclude_reservation {
        query = query.filter(reservation::Column::Id.ne(id));
    }
    Ok(query.all(conn).await?)
}

/// Tables of the requested seat class with no overlapping booking, ordered by seats then number.
pub async fn available_tables<C: ConnectionTrait>(
    conn: &C,
    request: &SlotRequest,
    hours: &ServiceHours,
) -> Result<Vec<table::Model>, ServiceError> {
    let candidates = table::Entity::find()
        .filter(table::Column::Seats.eq(request.seats))
        .order_by_asc(table::Column::Seats)
        .order_by_asc(table::Column::TableNumber)
        .all(conn)
        .await?;
    if candidates.is_empty() {
        return Ok(candidates);
    }

    let ids = candidates.iter().map(|t| t.id).collect();
    let booked = blocking_reservations(conn, request.date, ids, None).await?;
    let window = hours.window();

    Ok(candidates
        .into_iter()
        .filter(|t| {
            !booked
                .iter()
                .any(|r| r.table_id == t.id && windows_overlap(r.time, request.time, window))
        })
        .collect())
}

/// Fails unless `table_id` exists, suits the party and is free for the requested window.
/// `exclude_reservation` lets a booking being modified ignore itself.
pub async fn ensure_table_free<C: ConnectionTrait>(
    conn: &C,
    table_id: i32,
    request: &SlotRequest,
    exclude_reservation: Option<i32>,
    hours: &ServiceHours,
) -> Result<table::Model, ServiceError> {
    let table = table::Entity::find_by_id(table_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Table {} not found", table_id)))?;

    if table.seats != request.seats {
        return Err(AvailabilityError::WrongSeatClass {
            table_number: table.table_number,
            seats: table.seats,
            party_size: request.party_size,
        }
        .into());
    }

    let booked =
        blocking_reservations(conn, request.date, vec![table_id], exclude_reservation).await?;
    let window = hours.window();
    if booked
        .iter()
        .any(|r| windows_overlap(r.time, request.time, window))
    {
        warn!(
            table_id,
            date = %request.date,
            time = %request.time,
            "Slot conflict on table"
        );
        return Err(AvailabilityError::TableTaken {
            table_number: table.table_number,
            date: request.date,
            time: hhmm(request.time),
        }
        .into());
    }

    Ok(table)
}

/// Availability checks bound to a connection pool and the configured hours.
#[derive(Clone)]
pub struct AvailabilityService {
    db: Arc<DatabaseConnection>,
    hours: ServiceHours,
}

impl AvailabilityService {
    pub fn new(db: Arc<DatabaseConnection>, hours: ServiceHours) -> Self {
        Self { db, hours }
    }

    pub fn hours(&self) -> &ServiceHours {
        &self.hours
    }

    pub fn validate(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        party_size: i32,
        today: NaiveDate,
    ) -> Result<SlotRequest, ServiceError> {
        validate_request(date, time, party_size, today, &self.hours).map_err(|e| {
            warn!(%date, %time, party_size, "Availability request rejected: {}", e);
            ServiceError::from(e)
        })
    }

    /// Validates the request and lists the free tables for it. A request no
    /// table of its seat class can take is rejected.
    #[instrument(skip(self))]
    pub async fn check(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        party_size: i32,
        today: NaiveDate,
    ) -> Result<(SlotRequest, Vec<table::Model>), ServiceError> {
        let request = self.validate(date, time, party_size, today)?;
        let tables = available_tables(&*self.db, &request, &self.hours).await?;
        if tables.is_empty() {
            warn!(%date, %time, seats = request.seats, "No table free for availability request");
            return Err(AvailabilityError::NoTableFree {
                seats: request.seats,
                date,
                time: hhmm(time),
            }
            .into());
        }
        Ok((request, tables))
    }

    pub async fn ensure_free(
        &self,
        table_id: i32,
        request: &SlotRequest,
        exclude_reservation: Option<i32>,
    ) -> Result<table::Model, ServiceError> {
        ensure_table_free(&*self.db, table_id, request, exclude_reservation, &self.hours).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 6, 10).unwrap()
    }

    fn tomorrow() -> NaiveDate {
        today().succ_opt().unwrap()
    }

    #[test]
    fn couple_tomorrow_evening_is_accepted() {
        let req = validate_request(tomorrow(), clock(18, 0), 2, today(), &ServiceHours::default())
            .unwrap();
        assert_eq!(req.seats, 2);
        assert_eq!(req.party_size, 2);
    }

    #[test]
    fn off_grid_time_is_rejected() {
        let err = validate_request(
            tomorrow(),
            clock(18, 7),
            2,
            today(),
            &ServiceHours::default(),
        )
        .unwrap_err();
        assert_eq!(err, AvailabilityError::OffGrid(15));
    }

    #[test]
    fn before_opening_is_rejected() {
        let err = validate_request(
            tomorrow(),
            clock(14, 0),
            2,
            today(),
            &ServiceHours::default(),
        )
        .unwrap_err();
        assert_matches!(err, AvailabilityError::OutsideServiceHours { .. });
    }

    #[test]
    fn closing_time_boundary() {
        let hours = ServiceHours::default();
        assert!(validate_request(tomorrow(), clock(22, 0), 4, today(), &hours).is_ok());
        assert!(validate_request(tomorrow(), clock(22, 45), 4, today(), &hours).is_ok());
        assert_matches!(
            validate_request(tomorrow(), clock(23, 0), 4, today(), &hours),
            Err(AvailabilityError::OutsideServiceHours { .. })
        );
    }

    #[test]
    fn an_earlier_last_seating_can_be_configured() {
        let hours = ServiceHours {
            last_seating: clock(21, 30),
            ..ServiceHours::default()
        };
        assert!(validate_request(tomorrow(), clock(21, 30), 2, today(), &hours).is_ok());
        assert_eq!(
            validate_request(tomorrow(), clock(21, 45), 2, today(), &hours).unwrap_err(),
            AvailabilityError::AfterLastSeating("21:30".into())
        );
    }

    #[test]
    fn party_cap_message_names_the_maximum() {
        let err = validate_request(tomorrow(), clock(18, 0), 25, today(), &ServiceHours::default())
            .unwrap_err();
        assert!(err.to_string().contains("maximum party size"));
        assert!(!AvailabilityError::NoTableFree {
            seats: 4,
            date: tomorrow(),
            time: "19:00".into(),
        }
        .to_string()
        .contains("maximum"));
    }

    #[test]
    fn past_dates_and_party_limits() {
        let hours = ServiceHours::default();
        let yesterday = today().pred_opt().unwrap();
        assert_eq!(
            validate_request(yesterday, clock(18, 0), 2, today(), &hours).unwrap_err(),
            AvailabilityError::PastDate
        );
        assert!(validate_request(today(), clock(18, 0), 2, today(), &hours).is_ok());
        assert_eq!(
            validate_request(tomorrow(), clock(18, 0), 0, today(), &hours).unwrap_err(),
            AvailabilityError::PartySize(20)
        );
        assert_eq!(
            validate_request(tomorrow(), clock(18, 0), 21, today(), &hours).unwrap_err(),
            AvailabilityError::PartySize(20)
        );
    }

    #[test]
    fn seat_classes() {
        assert_eq!(seat_class(1), 2);
        assert_eq!(seat_class(2), 2);
        assert_eq!(seat_class(3), 4);
        assert_eq!(seat_class(4), 4);
        assert_eq!(seat_class(12), 4);
    }

    #[test]
    fn overlap_is_half_open() {
        let window = Duration::minutes(120);
        assert!(windows_overlap(clock(18, 0), clock(19, 45), window));
        assert!(windows_overlap(clock(19, 45), clock(18, 0), window));
        assert!(!windows_overlap(clock(18, 0), clock(20, 0), window));
        assert!(windows_overlap(clock(18, 0), clock(18, 0), window));
    }

    #[test]
    fn conflicts_map_to_409_and_rules_to_400() {
        let taken: ServiceError = AvailabilityError::TableTaken {
            table_number: 4,
            date: tomorrow(),
            time: "19:00".into(),
        }
        .into();
        assert_eq!(taken.status_code(), axum::http::StatusCode::CONFLICT);

        let grid: ServiceError = AvailabilityError::OffGrid(15).into();
        assert_eq!(grid.status_code(), axum::http::StatusCode::BAD_REQUEST);

        let full: ServiceError = AvailabilityError::NoTableFree {
            seats: 2,
            date: tomorrow(),
            time: "19:00".into(),
        }
        .into();
        assert_eq!(full.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }
}
