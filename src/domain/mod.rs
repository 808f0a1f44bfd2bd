//! Domain model: restaurants, reservations, sessions

pub mod reservation;
pub mod restaurant;
pub mod session;

pub use reservation::{
    InMemoryReservationStore, NewReservation, Reservation, ReservationStatus, ReservationStore,
    ReservationSummary, CANCELLATION_LEAD_HOURS,
};
pub use restaurant::{Coordinate, RestaurantDocument};
pub use session::{ChatMessage, InMemorySessionStore, SessionStore, UserProfile};
