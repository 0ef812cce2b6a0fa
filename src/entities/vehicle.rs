use serde::{Deserialize, Serialize};

/// A registered vehicle.
///
/// The plate is a natural key: unique, compared case-insensitively, and
/// usable as an unambiguous lookup for the exact-match search path.
/// Rows are immutable once created apart from administrative correction;
/// nothing in this crate deletes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: i64,
    pub plate: String,
    pub make: String,
    pub model: String,
    pub year: Option<i32>,
    pub color: Option<String>,
}

impl Vehicle {
    /// "Make Model" as shown in tenure listings.
    pub fn description(&self) -> String {
        format!("{} {}", self.make, self.model)
    }
}
