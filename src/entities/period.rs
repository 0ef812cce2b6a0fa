use serde::{Deserialize, Serialize};

/// One row of the append-only ownership history.
///
/// Dates are stored as ISO `YYYY-MM-DD` text, exactly as the storage layer
/// holds them; the resolver parses them and decides what to do with rows
/// that don't parse. A `None` end date means the period is open: the owner
/// holds the vehicle now.
///
/// Periods are created when a vehicle changes hands and closed (end date
/// set) when superseded; they are never deleted, so history is an audit
/// trail. Non-overlap per vehicle is assumed, not enforced here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnershipPeriod {
    pub id: i64,
    pub vehicle_id: i64,
    pub owner_id: i64,
    pub start_date: String,
    pub end_date: Option<String>,
}
