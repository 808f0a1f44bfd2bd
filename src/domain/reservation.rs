//! Reservations
//!
//! Status moves forward only: confirmed to cancelled or completed.
//! Cancellation is rejected inside the 2-hour lead window and on
//! already-terminal reservations. Contact fields are a denormalized copy of
//! the session profile taken at creation time.

use crate::error::AgentError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Minimum hours before the reservation start at which cancellation is
/// still allowed.
pub const CANCELLATION_LEAD_HOURS: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Confirmed,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: String,
    pub session_id: String,
    pub restaurant_id: String,
    /// YYYY-MM-DD
    pub date: String,
    /// HH:MM, 24-hour
    pub time: String,
    pub guests: u32,
    pub customer_name: String,
    pub customer_phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Reservation {
    /// Reservation start, interpreted as UTC.
    pub fn starts_at(&self) -> Result<NaiveDateTime, AgentError> {
        parse_start(&self.date, &self.time)
    }
}

pub fn parse_start(date: &str, time: &str) -> Result<NaiveDateTime, AgentError> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AgentError::Validation(format!("invalid date '{}', expected YYYY-MM-DD", date)))?;
    let time = NaiveTime::parse_from_str(time, "%H:%M")
        .map_err(|_| AgentError::Validation(format!("invalid time '{}', expected HH:MM", time)))?;
    Ok(NaiveDateTime::new(date, time))
}

#[derive(Debug, Clone)]
pub struct NewReservation {
    pub session_id: String,
    pub restaurant_id: String,
    pub date: String,
    pub time: String,
    pub guests: u32,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub special_requests: Option<String>,
}

#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn create(&self, request: NewReservation) -> Result<Reservation, AgentError>;

    async fn get(&self, reservation_id: &str) -> Result<Reservation, AgentError>;

    /// All reservations owned by the session, in creation order.
    async fn list_for_session(&self, session_id: &str) -> Result<Vec<Reservation>, AgentError>;

    /// Transition to cancelled. `now` is passed in so the lead-time rule is
    /// checked against the caller's clock.
    async fn cancel(
        &self,
        reservation_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Reservation, AgentError>;
}

/// In-memory store with a session reverse index for listing.
pub struct InMemoryReservationStore {
    reservations: Arc<RwLock<HashMap<String, Reservation>>>,
    by_session: Arc<RwLock<HashMap<String, Vec<String>>>>,
    next_id: AtomicU64,
}

impl InMemoryReservationStore {
    pub fn new() -> Self {
        Self {
            reservations: Arc::new(RwLock::new(HashMap::new())),
            by_session: Arc::new(RwLock::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for InMemoryReservationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn create(&self, request: NewReservation) -> Result<Reservation, AgentError> {
        // Reject malformed date/time up front rather than at cancel time.
        parse_start(&request.date, &request.time)?;
        if request.guests == 0 {
            return Err(AgentError::Validation("guests must be at least 1".into()));
        }

        let id = format!("rsv-{:06}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let now = Utc::now();
        let reservation = Reservation {
            id: id.clone(),
            session_id: request.session_id.clone(),
            restaurant_id: request.restaurant_id,
            date: request.date,
            time: request.time,
            guests: request.guests,
            customer_name: request.customer_name,
            customer_phone: request.customer_phone,
            customer_email: request.customer_email,
            special_requests: request.special_requests,
            status: ReservationStatus::Confirmed,
            created_at: now,
            updated_at: now,
            cancelled_at: None,
        };

        let mut reservations = self.reservations.write().await;
        let mut by_session = self.by_session.write().await;
        reservations.insert(id.clone(), reservation.clone());
        by_session
            .entry(request.session_id)
            .or_default()
            .push(id.clone());

        tracing::info!("Created reservation {}", id);
        Ok(reservation)
    }

    async fn get(&self, reservation_id: &str) -> Result<Reservation, AgentError> {
        let reservations = self.reservations.read().await;
        reservations
            .get(reservation_id)
            .cloned()
            .ok_or_else(|| AgentError::not_found("reservation", reservation_id))
    }

    async fn list_for_session(&self, session_id: &str) -> Result<Vec<Reservation>, AgentError> {
        let by_session = self.by_session.read().await;
        let reservations = self.reservations.read().await;
        let ids = by_session.get(session_id).cloned().unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| reservations.get(id).cloned())
            .collect())
    }

    async fn cancel(
        &self,
        reservation_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Reservation, AgentError> {
        let mut reservations = self.reservations.write().await;
        let reservation = reservations
            .get_mut(reservation_id)
            .ok_or_else(|| AgentError::not_found("reservation", reservation_id))?;

        match reservation.status {
            ReservationStatus::Cancelled => {
                return Err(AgentError::PolicyViolation(format!(
                    "reservation {} is already cancelled",
                    reservation_id
                )));
            }
            ReservationStatus::Completed => {
                return Err(AgentError::PolicyViolation(format!(
                    "reservation {} is already completed",
                    reservation_id
                )));
            }
            ReservationStatus::Confirmed => {}
        }

        let starts_at = reservation.starts_at()?;
        if starts_at - now.naive_utc() < Duration::hours(CANCELLATION_LEAD_HOURS) {
            return Err(AgentError::PolicyViolation(format!(
                "reservation {} starts within {} hours and can no longer be cancelled",
                reservation_id, CANCELLATION_LEAD_HOURS
            )));
        }

        reservation.status = ReservationStatus::Cancelled;
        reservation.cancelled_at = Some(now);
        reservation.updated_at = now;
        tracing::info!("Cancelled reservation {}", reservation_id);
        Ok(reservation.clone())
    }
}

/// Roll-up returned alongside list-reservations output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationSummary {
    pub total: usize,
    pub confirmed: usize,
    pub cancelled: usize,
    pub completed: usize,
    pub total_guests: u32,
}

impl ReservationSummary {
    pub fn from_reservations(reservations: &[Reservation]) -> Self {
        let mut summary = Self {
            total: reservations.len(),
            confirmed: 0,
            cancelled: 0,
            completed: 0,
            total_guests: 0,
        };
        for reservation in reservations {
            match reservation.status {
                ReservationStatus::Confirmed => {
                    summary.confirmed += 1;
                    summary.total_guests += reservation.guests;
                }
                ReservationStatus::Cancelled => summary.cancelled += 1,
                ReservationStatus::Completed => summary.completed += 1,
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_for(session: &str, date: String) -> NewReservation {
        NewReservation {
            session_id: session.to_string(),
            restaurant_id: "rest-1".to_string(),
            date,
            time: "19:30".to_string(),
            guests: 2,
            customer_name: "Alice".to_string(),
            customer_phone: "+91-9999999999".to_string(),
            customer_email: None,
            special_requests: None,
        }
    }

    fn days_from_now(days: i64) -> String {
        (Utc::now() + Duration::days(days)).format("%Y-%m-%d").to_string()
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let store = InMemoryReservationStore::new();
        let created = store.create(request_for("alice", days_from_now(5))).await.unwrap();
        assert_eq!(created.status, ReservationStatus::Confirmed);

        let listed = store.list_for_session("alice").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
        assert!(store.list_for_session("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_with_enough_lead_time() {
        let store = InMemoryReservationStore::new();
        let created = store.create(request_for("alice", days_from_now(5))).await.unwrap();

        let cancelled = store.cancel(&created.id, Utc::now()).await.unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
        assert!(cancelled.cancelled_at.is_some());
    }

    #[tokio::test]
    async fn test_cancel_twice_is_rejected() {
        let store = InMemoryReservationStore::new();
        let created = store.create(request_for("alice", days_from_now(5))).await.unwrap();

        store.cancel(&created.id, Utc::now()).await.unwrap();
        let second = store.cancel(&created.id, Utc::now()).await;
        assert!(matches!(second, Err(AgentError::PolicyViolation(_))));
    }

    #[tokio::test]
    async fn test_cancel_inside_lead_window_is_rejected() {
        let store = InMemoryReservationStore::new();
        let mut request = request_for("alice", days_from_now(3));
        request.time = "19:30".to_string();
        let created = store.create(request).await.unwrap();

        // Pretend "now" is 30 minutes before the reservation start.
        let starts_at = created.starts_at().unwrap();
        let now = DateTime::<Utc>::from_naive_utc_and_offset(starts_at - Duration::minutes(30), Utc);
        let result = store.cancel(&created.id, now).await;
        assert!(matches!(result, Err(AgentError::PolicyViolation(_))));
    }

    #[tokio::test]
    async fn test_cancel_unknown_reservation() {
        let store = InMemoryReservationStore::new();
        let result = store.cancel("rsv-404", Utc::now()).await;
        assert!(matches!(result, Err(AgentError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_date() {
        let store = InMemoryReservationStore::new();
        let result = store.create(request_for("alice", "tomorrow".to_string())).await;
        assert!(matches!(result, Err(AgentError::Validation(_))));
    }

    #[test]
    fn test_summary_counts() {
        let base = Reservation {
            id: "rsv-000001".into(),
            session_id: "alice".into(),
            restaurant_id: "rest-1".into(),
            date: "2030-01-01".into(),
            time: "20:00".into(),
            guests: 4,
            customer_name: "Alice".into(),
            customer_phone: "1".into(),
            customer_email: None,
            special_requests: None,
            status: ReservationStatus::Confirmed,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            cancelled_at: None,
        };
        let mut cancelled = base.clone();
        cancelled.status = ReservationStatus::Cancelled;

        let summary = ReservationSummary::from_reservations(&[base, cancelled]);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.confirmed, 1);
        assert_eq!(summary.cancelled, 1);
        assert_eq!(summary.total_guests, 4);
    }
}
