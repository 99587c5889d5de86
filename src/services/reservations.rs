use chrono::{NaiveDate, NaiveTime};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        reservation::{self, ReservationStatus},
        table,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        availability::{self, AvailabilityService, SlotRequest},
        clock, icontains, today,
    },
    session::{PendingReservation, SessionStore},
};

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct AvailabilityRequest {
    pub date: NaiveDate,
    #[serde(with = "clock")]
    #[schema(value_type = String, example = "19:00")]
    pub time: NaiveTime,
    pub party_size: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AvailabilityResponse {
    pub date: NaiveDate,
    #[serde(with = "clock")]
    #[schema(value_type = String, example = "19:00")]
    pub time: NaiveTime,
    pub party_size: i32,
    /// Seat class searched
    pub seats: i32,
    pub tables: Vec<table::Model>,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct HoldRequest {
    pub date: NaiveDate,
    #[serde(with = "clock")]
    #[schema(value_type = String, example = "19:00")]
    pub time: NaiveTime,
    pub party_size: i32,
    pub table_id: i32,
}

/// Contact details that turn a held slot into a booking. The slot fields are
/// only needed when no hold exists in the session.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct ConfirmReservationRequest {
    #[validate(length(min = 1, max = 100, message = "Full name is required"))]
    pub full_name: String,
    #[validate(length(min = 5, max = 20, message = "Phone number must be 5 to 20 characters"))]
    pub phone: String,
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(max = 500, message = "Special requests are limited to 500 characters"))]
    pub special_requests: Option<String>,

    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default, with = "clock::option")]
    #[schema(value_type = Option<String>, example = "19:00")]
    pub time: Option<NaiveTime>,
    #[serde(default)]
    pub party_size: Option<i32>,
    #[serde(default)]
    pub table_id: Option<i32>,
}

impl ConfirmReservationRequest {
    fn inline_slot(&self) -> Option<PendingReservation> {
        Some(PendingReservation {
            date: self.date?,
            time: self.time?,
            party_size: self.party_size?,
            table_id: self.table_id?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct ModifyReservationRequest {
    pub date: Option<NaiveDate>,
    #[serde(default, with = "clock::option")]
    #[schema(value_type = Option<String>, example = "20:00")]
    pub time: Option<NaiveTime>,
    pub party_size: Option<i32>,
    #[validate(length(max = 500))]
    pub special_requests: Option<String>,
}

/// Admin shortcut actions over the reservation lifecycle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema, strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ReservationAction {
    Confirm,
    Seat,
    Complete,
    Cancel,
    #[serde(alias = "noshow", alias = "no_show")]
    #[strum(serialize = "no-show", serialize = "noshow", serialize = "no_show")]
    NoShow,
}

impl ReservationAction {
    pub fn target(self) -> ReservationStatus {
        match self {
            ReservationAction::Confirm => ReservationStatus::Confirmed,
            ReservationAction::Seat => ReservationStatus::Seated,
            ReservationAction::Complete => ReservationStatus::Completed,
            ReservationAction::Cancel => ReservationStatus::Cancelled,
            ReservationAction::NoShow => ReservationStatus::NoShow,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ReservationSearch {
    /// Matches name, phone or email
    pub q: Option<String>,
    pub status: Option<String>,
    pub date: Option<NaiveDate>,
}

/// Parses a reservation status, case-insensitively.
pub fn parse_status(value: &str) -> Result<ReservationStatus, ServiceError> {
    ReservationStatus::from_str(value.trim())
        .map_err(|_| ServiceError::ValidationError(format!("Unknown reservation status '{}'", value)))
}

/// Rejects `current -> next` unless the lifecycle allows it.
pub fn check_transition(
    current: ReservationStatus,
    next: ReservationStatus,
) -> Result<(), ServiceError> {
    if current.is_final() {
        return Err(ServiceError::InvalidOperation(format!(
            "Reservation is already {}",
            current
        )));
    }
    if !current.can_transition_to(next) {
        return Err(ServiceError::InvalidOperation(format!(
            "Cannot move a {} reservation to {}",
            current, next
        )));
    }
    Ok(())
}

/// Reservation workflow: availability, session holds, confirmation and lifecycle changes.
#[derive(Clone)]
pub struct ReservationService {
    db: Arc<DatabaseConnection>,
    availability: AvailabilityService,
    sessions: SessionStore,
    event_sender: Arc<EventSender>,
}

impl ReservationService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        availability: AvailabilityService,
        sessions: SessionStore,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db,
            availability,
            sessions,
            event_sender,
        }
    }

    pub fn availability(&self) -> &AvailabilityService {
        &self.availability
    }

    #[instrument(skip(self))]
    pub async fn check_availability(
        &self,
        request: &AvailabilityRequest,
    ) -> Result<AvailabilityResponse, ServiceError> {
        let (slot, tables) = self
            .availability
            .check(request.date, request.time, request.party_size, today())
            .await?;
        let message = format!("{} table(s) available", tables.len());
        Ok(AvailabilityResponse {
            date: slot.date,
            time: slot.time,
            party_size: slot.party_size,
            seats: slot.seats,
            tables,
            message,
        })
    }

    /// Validates the slot and stores it in the session. Nothing is persisted.
    #[instrument(skip(self))]
    pub async fn hold(
        &self,
        session_id: &str,
        request: &HoldRequest,
    ) -> Result<PendingReservation, ServiceError> {
        let slot = self
            .availability
            .validate(request.date, request.time, request.party_size, today())?;
        self.availability
            .ensure_free(request.table_id, &slot, None)
            .await?;

        let pending = PendingReservation {
            date: slot.date,
            time: slot.time,
            party_size: slot.party_size,
            table_id: request.table_id,
        };
        self.sessions
            .set_pending_reservation(session_id, pending.clone());
        info!(table_id = request.table_id, "Reservation slot held");
        Ok(pending)
    }

    pub fn current_hold(&self, session_id: &str) -> Option<PendingReservation> {
        self.sessions.get(session_id).pending_reservation
    }

    pub fn release_hold(&self, session_id: &str) -> Option<PendingReservation> {
        self.sessions.take_pending_reservation(session_id)
    }

    /// Persists a confirmed reservation for the held slot (or the slot in the
    /// body), re-checking availability inside the write transaction.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn confirm(
        &self,
        session_id: &str,
        user_id: Option<Uuid>,
        request: ConfirmReservationRequest,
    ) -> Result<reservation::Model, ServiceError> {
        request.validate()?;

        let pending = match self.current_hold(session_id) {
            Some(pending) => pending,
            None => request.inline_slot().ok_or_else(|| {
                ServiceError::ValidationError(
                    "No reservation is held; choose a date, time and table first".into(),
                )
            })?,
        };

        let slot = self.availability.validate(
            pending.date,
            pending.time,
            pending.party_size,
            today(),
        )?;

        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for reservation");
            ServiceError::DatabaseError(e)
        })?;

        availability::ensure_table_free(
            &txn,
            pending.table_id,
            &slot,
            None,
            self.availability.hours(),
        )
        .await?;

        let saved = reservation::ActiveModel {
            user_id: Set(user_id),
            table_id: Set(pending.table_id),
            date: Set(slot.date),
            time: Set(slot.time),
            party_size: Set(slot.party_size),
            full_name: Set(request.full_name.trim().to_string()),
            phone: Set(request.phone.trim().to_string()),
            email: Set(request.email.trim().to_lowercase()),
            special_requests: Set(request
                .special_requests
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())),
            status: Set(ReservationStatus::Confirmed),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, table_id = pending.table_id, "Failed to save reservation");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit reservation");
            ServiceError::DatabaseError(e)
        })?;

        self.sessions.take_pending_reservation(session_id);

        info!(
            reservation_id = saved.id,
            table_id = saved.table_id,
            date = %saved.date,
            time = %saved.time,
            "Reservation confirmed"
        );
        self.event_sender
            .send_or_log(Event::ReservationConfirmed {
                reservation_id: saved.id,
                table_id: saved.table_id,
                date: saved.date,
                time: saved.time,
                party_size: saved.party_size,
            })
            .await;

        Ok(saved)
    }

    pub async fn get(&self, id: i32) -> Result<reservation::Model, ServiceError> {
        reservation::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Reservation {} not found", id)))
    }

    async fn get_owned(&self, user_id: Uuid, id: i32) -> Result<reservation::Model, ServiceError> {
        let found = self.get(id).await?;
        if found.user_id != Some(user_id) {
            // other customers' bookings are indistinguishable from missing ones
            return Err(ServiceError::NotFound(format!("Reservation {} not found", id)));
        }
        Ok(found)
    }

    /// Moves a reservation along its lifecycle.
    #[instrument(skip(self))]
    pub async fn transition(
        &self,
        id: i32,
        next: ReservationStatus,
    ) -> Result<reservation::Model, ServiceError> {
        let current = self.get(id).await?;
        if let Err(e) = check_transition(current.status, next) {
            warn!(reservation_id = id, from = %current.status, to = %next, "Rejected reservation transition");
            return Err(e);
        }

        let old_status = current.status;
        let mut active: reservation::ActiveModel = current.into();
        active.status = Set(next);
        let updated = active.update(&*self.db).await.map_err(|e| {
            error!(reservation_id = id, error = %e, "Failed to update reservation status");
            ServiceError::DatabaseError(e)
        })?;

        info!(reservation_id = id, from = %old_status, to = %next, "Reservation status changed");
        self.event_sender
            .send_or_log(Event::ReservationStatusChanged {
                reservation_id: id,
                old_status: old_status.to_string(),
                new_status: next.to_string(),
            })
            .await;
        if next == ReservationStatus::Cancelled {
            self.event_sender
                .send_or_log(Event::ReservationCancelled(id))
                .await;
        }

        Ok(updated)
    }

    /// Staff status update from a free-form status name.
    pub async fn set_status(&self, id: i32, status: &str) -> Result<reservation::Model, ServiceError> {
        let next = parse_status(status)?;
        self.transition(id, next).await
    }

    pub async fn apply_action(
        &self,
        id: i32,
        action: ReservationAction,
    ) -> Result<reservation::Model, ServiceError> {
        self.transition(id, action.target()).await
    }

    /// A customer's reservations, newest slot first.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<reservation::Model>, ServiceError> {
        Ok(reservation::Entity::find()
            .filter(reservation::Column::UserId.eq(user_id))
            .order_by_desc(reservation::Column::Date)
            .order_by_desc(reservation::Column::Time)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn cancel_for_user(
        &self,
        user_id: Uuid,
        id: i32,
    ) -> Result<reservation::Model, ServiceError> {
        let owned = self.get_owned(user_id, id).await?;
        if owned.status.is_final() {
            return Err(ServiceError::InvalidOperation(format!(
                "Reservation is already {}",
                owned.status
            )));
        }
        self.transition(id, ReservationStatus::Cancelled).await
    }

    /// Changes date, time or party size. The current table is kept when it is
    /// still free and suitable; otherwise the first free table is assigned.
    #[instrument(skip(self, request))]
    pub async fn modify_for_user(
        &self,
        user_id: Uuid,
        id: i32,
        request: ModifyReservationRequest,
    ) -> Result<reservation::Model, ServiceError> {
        request.validate()?;
        let owned = self.get_owned(user_id, id).await?;
        if owned.status.is_final() || owned.status == ReservationStatus::Seated {
            return Err(ServiceError::InvalidOperation(format!(
                "A {} reservation cannot be modified",
                owned.status
            )));
        }

        let slot = self.availability.validate(
            request.date.unwrap_or(owned.date),
            request.time.unwrap_or(owned.time),
            request.party_size.unwrap_or(owned.party_size),
            today(),
        )?;

        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for reservation change");
            ServiceError::DatabaseError(e)
        })?;

        let hours = self.availability.hours();
        let table_id =
            match availability::ensure_table_free(&txn, owned.table_id, &slot, Some(id), hours)
                .await
            {
                Ok(table) => table.id,
                Err(ServiceError::NotFound(_))
                | Err(ServiceError::ValidationError(_))
                | Err(ServiceError::Conflict(_)) => {
                    self.reassign_table(&txn, &slot, id).await?
                }
                Err(e) => return Err(e),
            };

        let changed_table = table_id != owned.table_id;
        let mut active: reservation::ActiveModel = owned.clone().into();
        active.table_id = Set(table_id);
        active.date = Set(slot.date);
        active.time = Set(slot.time);
        active.party_size = Set(slot.party_size);
        if let Some(requests) = request.special_requests {
            let trimmed = requests.trim().to_string();
            active.special_requests = Set(Some(trimmed).filter(|s| !s.is_empty()));
        }
        let updated = active.update(&txn).await.map_err(|e| {
            error!(reservation_id = id, error = %e, "Failed to modify reservation");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!(reservation_id = id, error = %e, "Failed to commit reservation change");
            ServiceError::DatabaseError(e)
        })?;

        info!(reservation_id = id, table_id, changed_table, "Reservation modified");
        self.event_sender
            .send_or_log(Event::ReservationModified(id))
            .await;
        Ok(updated)
    }

    async fn reassign_table<C: sea_orm::ConnectionTrait>(
        &self,
        conn: &C,
        slot: &SlotRequest,
        reservation_id: i32,
    ) -> Result<i32, ServiceError> {
        let hours = self.availability.hours();
        let candidates = table::Entity::find()
            .filter(table::Column::Seats.eq(slot.seats))
            .order_by_asc(table::Column::TableNumber)
            .all(conn)
            .await?;
        for candidate in candidates {
            if availability::ensure_table_free(conn, candidate.id, slot, Some(reservation_id), hours)
                .await
                .is_ok()
            {
                return Ok(candidate.id);
            }
        }
        warn!(reservation_id, date = %slot.date, time = %slot.time, "No table free for modified reservation");
        Err(ServiceError::Conflict(
            "No table is available for the requested time".into(),
        ))
    }

    /// Admin search over name, phone or email with an optional status and date filter.
    pub async fn search(
        &self,
        params: &ReservationSearch,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<reservation::Model>, u64), ServiceError> {
        let mut query = reservation::Entity::find();

        if let Some(q) = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(icontains(reservation::Column::FullName, q))
                    .add(reservation::Column::Phone.contains(q))
                    .add(icontains(reservation::Column::Email, q)),
            );
        }
        if let Some(status) = params.status.as_deref().filter(|s| !s.trim().is_empty()) {
            query = query.filter(reservation::Column::Status.eq(parse_status(status)?));
        }
        if let Some(date) = params.date {
            query = query.filter(reservation::Column::Date.eq(date));
        }

        let paginator = query
            .order_by_desc(reservation::Column::Date)
            .order_by_desc(reservation::Column::Time)
            .paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn actions_map_to_lifecycle_states() {
        assert_eq!(ReservationAction::Seat.target(), ReservationStatus::Seated);
        assert_eq!(
            ReservationAction::from_str("No-Show").unwrap(),
            ReservationAction::NoShow
        );
        assert_eq!(
            serde_json::from_str::<ReservationAction>("\"no-show\"").unwrap(),
            ReservationAction::NoShow
        );
    }

    #[test]
    fn final_states_reject_every_transition() {
        assert_matches!(
            check_transition(ReservationStatus::Cancelled, ReservationStatus::Confirmed),
            Err(ServiceError::InvalidOperation(_))
        );
        assert_matches!(
            check_transition(ReservationStatus::Seated, ReservationStatus::NoShow),
            Err(ServiceError::InvalidOperation(_))
        );
        assert!(check_transition(ReservationStatus::Confirmed, ReservationStatus::Seated).is_ok());
    }

    #[test]
    fn status_names_are_case_insensitive() {
        assert_eq!(parse_status("SEATED").unwrap(), ReservationStatus::Seated);
        assert_matches!(parse_status("lost"), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn confirm_body_may_carry_the_slot() {
        let body: ConfirmReservationRequest = serde_json::from_str(
            r#"{"full_name": "Ana Lee", "phone": "57001234", "email": "ana@gmail.com",
                "date": "2030-01-02", "time": "19:00", "party_size": 2, "table_id": 1}"#,
        )
        .unwrap();
        let slot = body.inline_slot().unwrap();
        assert_eq!(slot.table_id, 1);
        assert_eq!(slot.time, NaiveTime::from_hms_opt(19, 0, 0).unwrap());

        let partial: ConfirmReservationRequest = serde_json::from_str(
            r#"{"full_name": "Ana Lee", "phone": "57001234", "email": "ana@gmail.com", "date": "2030-01-02"}"#,
        )
        .unwrap();
        assert!(partial.inline_slot().is_none());
    }

    #[test]
    fn contact_details_are_validated() {
        let body = ConfirmReservationRequest {
            full_name: String::new(),
            phone: "1".into(),
            email: "nope".into(),
            special_requests: None,
            date: None,
            time: None,
            party_size: None,
            table_id: None,
        };
        let errors = body.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("full_name"));
        assert!(fields.contains_key("phone"));
        assert!(fields.contains_key("email"));
    }
}
