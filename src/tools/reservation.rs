//! Reservation tools: create, list, cancel
//!
//! The session id argument is injected by the orchestrator, never taken
//! from the model. Contact fields come from the session profile only,
//! so a caller cannot reserve under someone else's identity.

use super::{arg_str, arg_u64, names, Tool, ToolMetadata, ToolParameter, ToolResult};
use crate::domain::reservation::{NewReservation, ReservationStore, ReservationSummary};
use crate::domain::session::SessionStore;
use crate::error::AgentError;
use crate::index::RestaurantIndex;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

fn failure_from(error: AgentError) -> ToolResult {
    ToolResult::failure(error.to_string())
}

pub struct CreateReservationTool {
    reservations: Arc<dyn ReservationStore>,
    sessions: Arc<dyn SessionStore>,
    index: Arc<dyn RestaurantIndex>,
}

impl CreateReservationTool {
    pub fn new(
        reservations: Arc<dyn ReservationStore>,
        sessions: Arc<dyn SessionStore>,
        index: Arc<dyn RestaurantIndex>,
    ) -> Self {
        Self {
            reservations,
            sessions,
            index,
        }
    }
}

#[async_trait]
impl Tool for CreateReservationTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: names::CREATE_RESERVATION.to_string(),
            description: "Book a table. Contact details are taken from the user's profile."
                .to_string(),
            parameters: vec![
                ToolParameter::required("restaurant_id", "string", "Restaurant id from a search"),
                ToolParameter::required("date", "string", "Reservation date, YYYY-MM-DD"),
                ToolParameter::required("time", "string", "Reservation time, HH:MM 24-hour"),
                ToolParameter::required("guests", "integer", "Number of guests"),
                ToolParameter::optional("special_requests", "string", "Free-text special requests"),
            ],
            requires_session: true,
        }
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let session_id = match arg_str(&args, "session_id") {
            Some(id) => id,
            None => return Ok(ToolResult::failure("missing session context")),
        };
        let restaurant_id = match arg_str(&args, "restaurant_id") {
            Some(id) => id,
            None => return Ok(ToolResult::failure("missing required argument 'restaurant_id'")),
        };
        let (date, time) = match (arg_str(&args, "date"), arg_str(&args, "time")) {
            (Some(d), Some(t)) => (d, t),
            _ => return Ok(ToolResult::failure("missing required arguments 'date' and 'time'")),
        };
        let guests = match arg_u64(&args, "guests") {
            Some(g) if g > 0 => g as u32,
            _ => return Ok(ToolResult::failure("'guests' must be a positive integer")),
        };

        let restaurant = match self.index.get(&restaurant_id).await {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                return Ok(failure_from(AgentError::not_found(
                    "restaurant",
                    restaurant_id,
                )))
            }
            Err(e) => {
                tracing::error!("create_reservation index lookup failed: {}", e);
                return Ok(ToolResult::failure(format!(
                    "The restaurant index is unavailable right now: {}",
                    e
                )));
            }
        };

        // Contact fields come from the profile, never from the caller.
        let profile = self
            .sessions
            .profile(&session_id)
            .await
            .unwrap_or_default()
            .unwrap_or_default();
        let customer_name = profile
            .display_name
            .unwrap_or_else(|| session_id.clone());
        let customer_phone = match profile.phone {
            Some(phone) => phone,
            None => {
                return Ok(ToolResult::failure(
                    "no phone number on the user's profile; ask the user to add one before booking",
                ))
            }
        };

        let request = NewReservation {
            session_id,
            restaurant_id: restaurant.id.clone(),
            date,
            time,
            guests,
            customer_name,
            customer_phone,
            customer_email: profile.email,
            special_requests: arg_str(&args, "special_requests"),
        };

        match self.reservations.create(request).await {
            Ok(reservation) => Ok(ToolResult::success(
                json!({
                    "reservation": reservation,
                    "restaurant": restaurant.summary(),
                })
                .to_string(),
            )
            .with_restaurants(vec![restaurant.id])),
            Err(e) => Ok(failure_from(e)),
        }
    }
}

pub struct ListReservationsTool {
    reservations: Arc<dyn ReservationStore>,
}

impl ListReservationsTool {
    pub fn new(reservations: Arc<dyn ReservationStore>) -> Self {
        Self { reservations }
    }
}

#[async_trait]
impl Tool for ListReservationsTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: names::LIST_RESERVATIONS.to_string(),
            description: "List all of the user's reservations with a status summary. \
                          Call this before cancelling to obtain real reservation ids."
                .to_string(),
            parameters: vec![],
            requires_session: true,
        }
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let session_id = match arg_str(&args, "session_id") {
            Some(id) => id,
            None => return Ok(ToolResult::failure("missing session context")),
        };

        let reservations = match self.reservations.list_for_session(&session_id).await {
            Ok(list) => list,
            Err(e) => return Ok(failure_from(e)),
        };
        let summary = ReservationSummary::from_reservations(&reservations);

        Ok(ToolResult::success(
            json!({
                "reservations": reservations,
                "summary": summary,
            })
            .to_string(),
        ))
    }
}

pub struct CancelReservationTool {
    reservations: Arc<dyn ReservationStore>,
}

impl CancelReservationTool {
    pub fn new(reservations: Arc<dyn ReservationStore>) -> Self {
        Self { reservations }
    }
}

#[async_trait]
impl Tool for CancelReservationTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: names::CANCEL_RESERVATION.to_string(),
            description: "Cancel a reservation by id. Ids are opaque; always call \
                          list_reservations first and use an id from its output."
                .to_string(),
            parameters: vec![ToolParameter::required(
                "reservation_id",
                "string",
                "Reservation id from list_reservations",
            )],
            requires_session: true,
        }
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let session_id = match arg_str(&args, "session_id") {
            Some(id) => id,
            None => return Ok(ToolResult::failure("missing session context")),
        };
        let reservation_id = match arg_str(&args, "reservation_id") {
            Some(id) => id,
            None => return Ok(ToolResult::failure("missing required argument 'reservation_id'")),
        };

        // Only the session that created a reservation may cancel it.
        let reservation = match self.reservations.get(&reservation_id).await {
            Ok(reservation) => reservation,
            Err(e) => return Ok(failure_from(e)),
        };
        if reservation.session_id != session_id {
            return Ok(failure_from(AgentError::Authorization(format!(
                "reservation '{}' does not belong to this session",
                reservation_id
            ))));
        }

        match self.reservations.cancel(&reservation_id, Utc::now()).await {
            Ok(reservation) => Ok(ToolResult::success(
                json!({ "reservation": reservation }).to_string(),
            )),
            Err(e) => Ok(failure_from(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reservation::InMemoryReservationStore;
    use crate::domain::restaurant::{Coordinate, RestaurantDocument};
    use crate::domain::session::{InMemorySessionStore, UserProfile};
    use crate::index::InMemoryIndex;
    use chrono::Duration;
    use serde_json::json;

    fn restaurant() -> RestaurantDocument {
        RestaurantDocument {
            id: "rest-1".to_string(),
            name: "Trattoria".to_string(),
            cuisines: vec!["Italian".to_string()],
            city: "Delhi".to_string(),
            locality: "Khan Market".to_string(),
            address: "12 Khan Market".to_string(),
            coordinate: Coordinate { lat: 28.6, lon: 77.22 },
            rating: 4.4,
            price_for_two: 1800,
            kind: "casual dining".to_string(),
            description: "Handmade pasta".to_string(),
            review_count: 220,
            embedding: vec![],
        }
    }

    async fn stack() -> (
        Arc<InMemoryReservationStore>,
        Arc<InMemorySessionStore>,
        Arc<InMemoryIndex>,
    ) {
        let reservations = Arc::new(InMemoryReservationStore::new());
        let sessions = Arc::new(InMemorySessionStore::new());
        let index = Arc::new(InMemoryIndex::new());
        index.upsert(restaurant()).await.unwrap();
        sessions
            .update_profile(
                "alice",
                UserProfile {
                    display_name: Some("Alice".to_string()),
                    phone: Some("+91-9999999999".to_string()),
                    email: Some("alice@example.com".to_string()),
                    coordinate: None,
                    preferences: vec![],
                },
            )
            .await
            .unwrap();
        (reservations, sessions, index)
    }

    fn future_date() -> String {
        (Utc::now() + Duration::days(5)).format("%Y-%m-%d").to_string()
    }

    #[tokio::test]
    async fn test_create_uses_profile_contact_fields() {
        let (reservations, sessions, index) = stack().await;
        let tool = CreateReservationTool::new(reservations.clone(), sessions, index);

        let result = tool
            .execute(json!({
                "session_id": "alice",
                "restaurant_id": "rest-1",
                "date": future_date(),
                "time": "19:30",
                "guests": 2,
                // Impersonation attempt; must be ignored.
                "customer_name": "Mallory",
            }))
            .await
            .unwrap();

        assert!(result.success, "{:?}", result.error);
        let created = &reservations.list_for_session("alice").await.unwrap()[0];
        assert_eq!(created.customer_name, "Alice");
        assert_eq!(created.customer_phone, "+91-9999999999");
    }

    #[tokio::test]
    async fn test_create_unknown_restaurant_fails() {
        let (reservations, sessions, index) = stack().await;
        let tool = CreateReservationTool::new(reservations, sessions, index);

        let result = tool
            .execute(json!({
                "session_id": "alice",
                "restaurant_id": "rest-404",
                "date": future_date(),
                "time": "19:30",
                "guests": 2,
            }))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.error.unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_create_without_profile_phone_fails() {
        let (reservations, sessions, index) = stack().await;
        let tool = CreateReservationTool::new(reservations, sessions, index);

        let result = tool
            .execute(json!({
                "session_id": "bob",
                "restaurant_id": "rest-1",
                "date": future_date(),
                "time": "19:30",
                "guests": 2,
            }))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.error.unwrap().contains("phone"));
    }

    #[tokio::test]
    async fn test_list_is_empty_for_new_session() {
        let (reservations, _, _) = stack().await;
        let tool = ListReservationsTool::new(reservations);

        let result = tool.execute(json!({"session_id": "alice"})).await.unwrap();
        assert!(result.success);
        let parsed: Value = serde_json::from_str(&result.output).unwrap();
        assert_eq!(parsed["summary"]["total"], 0);
    }

    #[tokio::test]
    async fn test_cancel_round_trip() {
        let (reservations, sessions, index) = stack().await;
        let create = CreateReservationTool::new(reservations.clone(), sessions, index);
        create
            .execute(json!({
                "session_id": "alice",
                "restaurant_id": "rest-1",
                "date": future_date(),
                "time": "19:30",
                "guests": 2,
            }))
            .await
            .unwrap();

        let id = reservations.list_for_session("alice").await.unwrap()[0]
            .id
            .clone();
        let cancel = CancelReservationTool::new(reservations);

        let first = cancel
            .execute(json!({"session_id": "alice", "reservation_id": id}))
            .await
            .unwrap();
        assert!(first.success);

        let second = cancel
            .execute(json!({"session_id": "alice", "reservation_id": id}))
            .await
            .unwrap();
        assert!(!second.success);
        assert!(second.error.unwrap().contains("already cancelled"));
    }

    #[tokio::test]
    async fn test_cancel_foreign_reservation_is_refused() {
        let (reservations, sessions, index) = stack().await;
        let create = CreateReservationTool::new(reservations.clone(), sessions, index);
        create
            .execute(json!({
                "session_id": "alice",
                "restaurant_id": "rest-1",
                "date": future_date(),
                "time": "19:30",
                "guests": 2,
            }))
            .await
            .unwrap();

        let id = reservations.list_for_session("alice").await.unwrap()[0]
            .id
            .clone();
        let cancel = CancelReservationTool::new(reservations.clone());

        let result = cancel
            .execute(json!({"session_id": "mallory", "reservation_id": id}))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("does not belong"));
        // The reservation is untouched.
        let kept = &reservations.list_for_session("alice").await.unwrap()[0];
        assert_eq!(kept.status, crate::domain::reservation::ReservationStatus::Confirmed);
    }
}
