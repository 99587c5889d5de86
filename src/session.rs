//! Server-side session state keyed by the `x-session-id` header.
//!
//! Holds the per-visitor reservation hold and the id of the open cart order.
//! Entries idle for longer than the configured TTL are discarded on access
//! and swept whenever a new session is issued.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use chrono::{NaiveDate, NaiveTime};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ServiceError;

pub const SESSION_HEADER: &str = "x-session-id";

/// A slot the visitor has picked but not yet confirmed with contact details.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PendingReservation {
    pub date: NaiveDate,
    #[schema(value_type = String, example = "19:30")]
    pub time: NaiveTime,
    pub party_size: i32,
    pub table_id: i32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionData {
    pub pending_reservation: Option<PendingReservation>,
    pub cart_order_id: Option<i32>,
}

#[derive(Debug)]
struct SessionEntry {
    data: SessionData,
    touched: Instant,
}

#[derive(Clone, Debug)]
pub struct SessionStore {
    inner: Arc<DashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Snapshot of the session; empty when unknown or expired
    pub fn get(&self, session_id: &str) -> SessionData {
        let expired = match self.inner.get(session_id) {
            Some(entry) if entry.touched.elapsed() <= self.ttl => return entry.data.clone(),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.inner.remove(session_id);
        }
        SessionData::default()
    }

    /// Applies `f` to the session, creating it when absent, and returns the result
    pub fn update<R>(&self, session_id: &str, f: impl FnOnce(&mut SessionData) -> R) -> R {
        let mut entry = self
            .inner
            .entry(session_id.to_string())
            .or_insert_with(|| SessionEntry {
                data: SessionData::default(),
                touched: Instant::now(),
            });
        if entry.touched.elapsed() > self.ttl {
            entry.data = SessionData::default();
        }
        entry.touched = Instant::now();
        f(&mut entry.data)
    }

    pub fn set_pending_reservation(&self, session_id: &str, pending: PendingReservation) {
        self.update(session_id, |data| data.pending_reservation = Some(pending));
    }

    pub fn take_pending_reservation(&self, session_id: &str) -> Option<PendingReservation> {
        self.update(session_id, |data| data.pending_reservation.take())
    }

    pub fn set_cart_order_id(&self, session_id: &str, order_id: Option<i32>) {
        self.update(session_id, |data| data.cart_order_id = order_id);
    }

    /// Drops every entry idle past the TTL; returns how many were removed
    pub fn sweep_expired(&self) -> usize {
        let before = self.inner.len();
        let ttl = self.ttl;
        self.inner.retain(|_, entry| entry.touched.elapsed() <= ttl);
        before.saturating_sub(self.inner.len())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Identifier of the caller's server-side session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_valid_session_id(value: &str) -> bool {
    (8..=128).contains(&value.len())
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Resolves the session id from the request header, issuing a new one when
/// absent or malformed, and echoes it on the response.
pub async fn session_middleware(
    State(store): State<SessionStore>,
    mut request: Request,
    next: Next,
) -> Response {
    let inbound = request
        .headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| is_valid_session_id(v))
        .map(str::to_string);

    let session_id = match inbound {
        Some(id) => id,
        None => {
            let swept = store.sweep_expired();
            if swept > 0 {
                debug!(swept, "Expired sessions removed");
            }
            Uuid::new_v4().simple().to_string()
        }
    };

    request
        .extensions_mut()
        .insert(SessionId(session_id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&session_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(SESSION_HEADER), value);
    }
    response
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionId
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionId>()
            .cloned()
            .ok_or_else(|| ServiceError::InternalError("Session layer not installed".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request as HttpRequest, routing::get, Router};
    use tower::ServiceExt;

    fn pending() -> PendingReservation {
        PendingReservation {
            date: NaiveDate::from_ymd_opt(2030, 5, 1).unwrap(),
            time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            party_size: 2,
            table_id: 3,
        }
    }

    #[test]
    fn hold_round_trips_and_take_clears_it() {
        let store = SessionStore::new(Duration::from_secs(60));
        store.set_pending_reservation("visitor-1", pending());
        assert_eq!(store.get("visitor-1").pending_reservation, Some(pending()));

        assert_eq!(store.take_pending_reservation("visitor-1"), Some(pending()));
        assert_eq!(store.get("visitor-1").pending_reservation, None);
    }

    #[test]
    fn sessions_are_isolated() {
        let store = SessionStore::new(Duration::from_secs(60));
        store.set_cart_order_id("visitor-a", Some(4));
        assert_eq!(store.get("visitor-a").cart_order_id, Some(4));
        assert_eq!(store.get("visitor-b").cart_order_id, None);
    }

    #[test]
    fn expired_sessions_are_dropped() {
        let store = SessionStore::new(Duration::ZERO);
        store.set_cart_order_id("visitor-a", Some(4));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(store.get("visitor-a"), SessionData::default());

        store.set_cart_order_id("visitor-b", Some(5));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(store.sweep_expired(), 1);
        assert!(store.is_empty());
    }

    async fn echo(session: SessionId) -> String {
        session.0
    }

    #[tokio::test]
    async fn middleware_issues_and_preserves_ids() {
        let store = SessionStore::new(Duration::from_secs(60));
        let app = Router::new()
            .route("/", get(echo))
            .layer(axum::middleware::from_fn_with_state(
                store,
                session_middleware,
            ));

        let issued = app
            .clone()
            .oneshot(HttpRequest::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let issued_id = issued.headers().get(SESSION_HEADER).unwrap().clone();
        assert_eq!(issued_id.len(), 32);

        let reused = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/")
                    .header(SESSION_HEADER, "visitor-session-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            reused.headers().get(SESSION_HEADER).unwrap(),
            "visitor-session-1"
        );
    }
}
