//! Storage accessor: the read-only query surface the search engine and
//! ownership resolver are built on.
//!
//! Every function here takes a live connection, runs exactly one
//! parameterized query, and maps rows onto named-field entities. Raw
//! rusqlite errors are translated into [`RegistryError::StorageUnavailable`]
//! at this boundary (via the `From` impl); nothing above this module sees a
//! driver error type. "Not found" is `None` or an empty vec, never an error.

use rusqlite::{params, Connection, Row};

use crate::entities::{Owner, OwnerKind, OwnershipPeriod, Vehicle};
use crate::error::{RegistryError, Result};

fn vehicle_from_row(row: &Row) -> rusqlite::Result<Vehicle> {
    Ok(Vehicle {
        id: row.get("id")?,
        plate: row.get("plate")?,
        make: row.get("make")?,
        model: row.get("model")?,
        year: row.get("year")?,
        color: row.get("color")?,
    })
}

fn owner_from_row(row: &Row) -> rusqlite::Result<Owner> {
    let tag: String = row.get("kind")?;
    let kind = if tag == "ORGANIZATION" {
        OwnerKind::Organization {
            legal_name: row
                .get::<_, Option<String>>("legal_name")?
                .unwrap_or_default(),
            registration_number: row.get("registration_number")?,
            legal_representative: row.get("legal_representative")?,
        }
    } else {
        OwnerKind::Individual {
            surname: row.get::<_, Option<String>>("surname")?.unwrap_or_default(),
            given_name: row
                .get::<_, Option<String>>("given_name")?
                .unwrap_or_default(),
            birth_date: row.get("birth_date")?,
        }
    };

    Ok(Owner {
        id: row.get("id")?,
        address: row.get("address")?,
        phone: row.get("phone")?,
        email: row.get("email")?,
        kind,
    })
}

fn period_from_row(row: &Row) -> rusqlite::Result<OwnershipPeriod> {
    Ok(OwnershipPeriod {
        id: row.get("id")?,
        vehicle_id: row.get("vehicle_id")?,
        owner_id: row.get("owner_id")?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
    })
}

const VEHICLE_COLS: &str = "id, plate, make, model, year, color";
const OWNER_COLS: &str = "id, kind, address, phone, email, surname, given_name, \
                          birth_date, legal_name, registration_number, legal_representative";

/// Case-insensitive exact plate lookup. The plate column is unique, so this
/// is zero-or-one by construction.
pub fn find_vehicle_by_plate_exact(conn: &Connection, plate: &str) -> Result<Option<Vehicle>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {VEHICLE_COLS} FROM vehicles WHERE UPPER(plate) = UPPER(?1)"
    ))?;
    let mut rows = stmt.query_map(params![plate], vehicle_from_row)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// Substring match over plate, make and model.
pub fn find_vehicles_by_fields(conn: &Connection, substring: &str) -> Result<Vec<Vehicle>> {
    let pattern = format!("%{}%", substring);
    let mut stmt = conn.prepare(&format!(
        "SELECT {VEHICLE_COLS} FROM vehicles
         WHERE UPPER(plate) LIKE UPPER(?1)
            OR UPPER(make) LIKE UPPER(?1)
            OR UPPER(model) LIKE UPPER(?1)"
    ))?;
    let vehicles = stmt
        .query_map(params![pattern], vehicle_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(vehicles)
}

/// Substring match over the kind-appropriate name fields: surname or given
/// name for individuals, legal name for organizations.
pub fn find_owners_by_fields(conn: &Connection, substring: &str) -> Result<Vec<Owner>> {
    let pattern = format!("%{}%", substring);
    let mut stmt = conn.prepare(&format!(
        "SELECT {OWNER_COLS} FROM owners
         WHERE (kind = 'INDIVIDUAL'
                AND (UPPER(surname) LIKE UPPER(?1) OR UPPER(given_name) LIKE UPPER(?1)))
            OR (kind = 'ORGANIZATION' AND UPPER(legal_name) LIKE UPPER(?1))"
    ))?;
    let owners = stmt
        .query_map(params![pattern], owner_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(owners)
}

/// Ownership periods filtered by vehicle, by owner, or both. At least one
/// filter must be supplied; an unfiltered scan of the history table is not
/// part of the contract.
pub fn get_ownership_periods(
    conn: &Connection,
    vehicle_id: Option<i64>,
    owner_id: Option<i64>,
) -> Result<Vec<OwnershipPeriod>> {
    if vehicle_id.is_none() && owner_id.is_none() {
        return Err(RegistryError::StorageUnavailable(
            "ownership period query requires a vehicle or owner filter".to_string(),
        ));
    }

    let mut stmt = conn.prepare(
        "SELECT id, vehicle_id, owner_id, start_date, end_date
         FROM ownership_history
         WHERE (?1 IS NULL OR vehicle_id = ?1)
           AND (?2 IS NULL OR owner_id = ?2)",
    )?;
    let periods = stmt
        .query_map(params![vehicle_id, owner_id], period_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(periods)
}

pub fn get_vehicle(conn: &Connection, id: i64) -> Result<Option<Vehicle>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {VEHICLE_COLS} FROM vehicles WHERE id = ?1"
    ))?;
    let mut rows = stmt.query_map(params![id], vehicle_from_row)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

pub fn get_owner(conn: &Connection, id: i64) -> Result<Option<Owner>> {
    let mut stmt = conn.prepare(&format!("SELECT {OWNER_COLS} FROM owners WHERE id = ?1"))?;
    let mut rows = stmt.query_map(params![id], owner_from_row)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}
