//! Temporal ownership resolution over the append-only history table.
//!
//! "Current owner" is a date-range question, not a flag: a period is a
//! candidate when its end date is null (open) or still in the future at the
//! evaluation date. Data entry mistakes can leave a vehicle with several
//! open periods at once; resolution must degrade gracefully, so candidates
//! are ordered by start date descending and the most recently started one
//! wins. That rule lives here, once, in Rust — not in per-dialect SQL.
//!
//! All listing operations are tolerant of single corrupt rows: a period
//! whose date does not parse as `YYYY-MM-DD` is logged and skipped, and the
//! rest of the result set stays usable.

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::entities::{Owner, OwnershipPeriod, Vehicle};
use crate::error::{RegistryError, Result};
use crate::store;

/// A history row with parsed dates and its resolved owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnershipRecord {
    pub period_id: i64,
    pub owner: Owner,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

impl OwnershipRecord {
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }
}

/// A history row seen from the owner's side: which vehicle, and when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleTenure {
    pub period_id: i64,
    pub vehicle: Vehicle,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

pub fn parse_iso_date(period_id: i64, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| RegistryError::MalformedDate {
        period_id,
        value: value.to_string(),
    })
}

/// Parse both dates of a period. Row-scoped: an error here condemns only
/// this row.
fn parse_period_dates(period: &OwnershipPeriod) -> Result<(NaiveDate, Option<NaiveDate>)> {
    let start = parse_iso_date(period.id, &period.start_date)?;
    let end = match &period.end_date {
        Some(value) => Some(parse_iso_date(period.id, value)?),
        None => None,
    };
    Ok((start, end))
}

/// Parse each period's dates, dropping rows that fail with a warning.
fn parse_tolerant(periods: Vec<OwnershipPeriod>) -> Vec<(OwnershipPeriod, NaiveDate, Option<NaiveDate>)> {
    periods
        .into_iter()
        .filter_map(|period| match parse_period_dates(&period) {
            Ok((start, end)) => Some((period, start, end)),
            Err(err) => {
                warn!(period_id = period.id, %err, "skipping unparseable history row");
                None
            }
        })
        .collect()
}

/// The ownership record in force at `as_of`, if any.
///
/// Candidates are periods with a null end date or an end date strictly
/// after `as_of`; the latest start date wins, period id breaking exact
/// ties. Zero candidates is a normal answer (the vehicle is currently
/// owned by nobody on record), not an error.
pub fn current_ownership_as_of(
    conn: &Connection,
    vehicle_id: i64,
    as_of: NaiveDate,
) -> Result<Option<OwnershipRecord>> {
    let periods = store::get_ownership_periods(conn, Some(vehicle_id), None)?;

    let mut candidates: Vec<(OwnershipPeriod, NaiveDate, Option<NaiveDate>)> =
        parse_tolerant(periods)
            .into_iter()
            .filter(|(_, _, end)| end.map_or(true, |end| end > as_of))
            .collect();
    candidates.sort_by(|a, b| b.1.cmp(&a.1).then(b.0.id.cmp(&a.0.id)));

    let Some((period, start, end)) = candidates.into_iter().next() else {
        return Ok(None);
    };

    match store::get_owner(conn, period.owner_id)? {
        Some(owner) => Ok(Some(OwnershipRecord {
            period_id: period.id,
            owner,
            start,
            end,
        })),
        None => {
            // Dangling owner reference: treat like a corrupt row.
            warn!(
                period_id = period.id,
                owner_id = period.owner_id,
                "current period references a missing owner"
            );
            Ok(None)
        }
    }
}

/// Convenience wrapper evaluating at today's date.
pub fn current_owner_of(conn: &Connection, vehicle_id: i64) -> Result<Option<Owner>> {
    Ok(current_ownership_as_of(conn, vehicle_id, Utc::now().date_naive())?.map(|r| r.owner))
}

/// Full ownership history of a vehicle, most recent first. Corrupt rows and
/// rows whose owner no longer resolves are skipped, not fatal.
pub fn history_of(conn: &Connection, vehicle_id: i64) -> Result<Vec<OwnershipRecord>> {
    let periods = store::get_ownership_periods(conn, Some(vehicle_id), None)?;

    let mut records = Vec::new();
    for (period, start, end) in parse_tolerant(periods) {
        match store::get_owner(conn, period.owner_id)? {
            Some(owner) => records.push(OwnershipRecord {
                period_id: period.id,
                owner,
                start,
                end,
            }),
            None => warn!(
                period_id = period.id,
                owner_id = period.owner_id,
                "skipping history row with missing owner"
            ),
        }
    }

    records.sort_by(|a, b| b.start.cmp(&a.start).then(b.period_id.cmp(&a.period_id)));
    Ok(records)
}

/// All vehicles an owner has held, most recent tenure first. Symmetric to
/// [`history_of`].
pub fn vehicles_of(conn: &Connection, owner_id: i64) -> Result<Vec<VehicleTenure>> {
    let periods = store::get_ownership_periods(conn, None, Some(owner_id))?;

    let mut tenures = Vec::new();
    for (period, start, end) in parse_tolerant(periods) {
        match store::get_vehicle(conn, period.vehicle_id)? {
            Some(vehicle) => tenures.push(VehicleTenure {
                period_id: period.id,
                vehicle,
                start,
                end,
            }),
            None => warn!(
                period_id = period.id,
                vehicle_id = period.vehicle_id,
                "skipping tenure row with missing vehicle"
            ),
        }
    }

    tenures.sort_by(|a, b| b.start.cmp(&a.start).then(b.period_id.cmp(&a.period_id)));
    Ok(tenures)
}
