//! Cache TTL policy
//!
//! Pure, total function from the tools invoked during a turn to a cache
//! lifetime. Evaluated on the exact tool-name list, never on answer text:
//! text parsing for cache decisions is unreliable and deliberately absent.

use crate::tools::names;
use std::time::Duration;

const HOUR: u64 = 60 * 60;
const DAY: u64 = 24 * HOUR;

/// Decision ladder, first match wins:
/// 1. any reservation tool        -> 0 (never cache personal/dynamic turns)
/// 2. popular or free-form answer -> 7 days
/// 3. unified search              -> 24 hours
/// 4. detail lookup               -> 6 hours
/// 5. anything else               -> 12 hours
pub fn ttl_for_tools(tools_used: &[String]) -> Duration {
    let used = |name: &str| tools_used.iter().any(|t| t == name);

    if used(names::CREATE_RESERVATION)
        || used(names::LIST_RESERVATIONS)
        || used(names::CANCEL_RESERVATION)
    {
        Duration::ZERO
    } else if used(names::POPULAR_RESTAURANTS) || used(names::FREE_FORM_ANSWER) {
        Duration::from_secs(7 * DAY)
    } else if used(names::UNIFIED_SEARCH) {
        Duration::from_secs(DAY)
    } else if used(names::RESTAURANT_DETAIL) {
        Duration::from_secs(6 * HOUR)
    } else {
        Duration::from_secs(12 * HOUR)
    }
}
