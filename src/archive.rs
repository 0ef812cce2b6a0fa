//! Denormalized archive of the full ownership history.
//!
//! `rebuild_archive` flattens history × vehicle × owner into the single
//! `main_archive` table, dropping and refilling it in one transaction so a
//! failed run never leaves a half-built archive behind. The table is a
//! read-only export product; the normalized tables stay authoritative.

use anyhow::Result;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::db::{insert_event, Event};

/// One flattened row of `main_archive`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveRow {
    pub history_id: i64,
    pub vehicle_id: i64,
    pub owner_id: i64,
    pub start_date: String,
    pub end_date: Option<String>,

    pub plate: String,
    pub make: String,
    pub model: String,
    pub year: Option<i32>,
    pub color: Option<String>,

    pub owner_kind: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub surname: Option<String>,
    pub given_name: Option<String>,
    pub birth_date: Option<String>,
    pub legal_name: Option<String>,
    pub registration_number: Option<String>,
    pub legal_representative: Option<String>,
}

/// Drop, recreate and refill `main_archive`. Returns the number of rows
/// archived. Safe to run repeatedly.
pub fn rebuild_archive(conn: &mut Connection) -> Result<usize> {
    let tx = conn.transaction()?;

    tx.execute_batch(
        "DROP TABLE IF EXISTS main_archive;
         CREATE TABLE main_archive (
            history_id INTEGER PRIMARY KEY,
            vehicle_id INTEGER NOT NULL,
            owner_id INTEGER NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT,

            plate TEXT NOT NULL,
            make TEXT NOT NULL,
            model TEXT NOT NULL,
            year INTEGER,
            color TEXT,

            owner_kind TEXT NOT NULL,
            address TEXT,
            phone TEXT,
            email TEXT,
            surname TEXT,
            given_name TEXT,
            birth_date TEXT,
            legal_name TEXT,
            registration_number TEXT,
            legal_representative TEXT
         );",
    )?;

    let inserted = tx.execute(
        "INSERT INTO main_archive (
            history_id, vehicle_id, owner_id, start_date, end_date,
            plate, make, model, year, color,
            owner_kind, address, phone, email,
            surname, given_name, birth_date,
            legal_name, registration_number, legal_representative
         )
         SELECT
            h.id, h.vehicle_id, h.owner_id, h.start_date, h.end_date,
            v.plate, v.make, v.model, v.year, v.color,
            o.kind, o.address, o.phone, o.email,
            o.surname, o.given_name, o.birth_date,
            o.legal_name, o.registration_number, o.legal_representative
         FROM ownership_history h
         JOIN vehicles v ON h.vehicle_id = v.id
         JOIN owners o ON h.owner_id = o.id",
        [],
    )?;

    tx.commit()?;

    let batch_id = uuid::Uuid::new_v4().to_string();
    let event = Event::new(
        "archive_rebuilt",
        "archive",
        &batch_id,
        serde_json::json!({ "rows": inserted }),
        "archive_job",
    );
    let _ = insert_event(conn, &event);

    info!(rows = inserted, batch_id = %batch_id, "archive rebuilt");
    Ok(inserted)
}

fn read_archive(conn: &Connection) -> Result<Vec<ArchiveRow>> {
    let mut stmt = conn.prepare(
        "SELECT history_id, vehicle_id, owner_id, start_date, end_date,
                plate, make, model, year, color,
                owner_kind, address, phone, email,
                surname, given_name, birth_date,
                legal_name, registration_number, legal_representative
         FROM main_archive
         ORDER BY history_id",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok(ArchiveRow {
                history_id: row.get(0)?,
                vehicle_id: row.get(1)?,
                owner_id: row.get(2)?,
                start_date: row.get(3)?,
                end_date: row.get(4)?,
                plate: row.get(5)?,
                make: row.get(6)?,
                model: row.get(7)?,
                year: row.get(8)?,
                color: row.get(9)?,
                owner_kind: row.get(10)?,
                address: row.get(11)?,
                phone: row.get(12)?,
                email: row.get(13)?,
                surname: row.get(14)?,
                given_name: row.get(15)?,
                birth_date: row.get(16)?,
                legal_name: row.get(17)?,
                registration_number: row.get(18)?,
                legal_representative: row.get(19)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

/// Write the archive table to CSV. Returns the number of rows written.
/// `rebuild_archive` must have run at least once.
pub fn export_archive_csv(conn: &Connection, path: &Path) -> Result<usize> {
    let rows = read_archive(conn)?;

    let mut writer = csv::Writer::from_path(path)?;
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!(rows = rows.len(), path = %path.display(), "archive exported");
    Ok(rows.len())
}
