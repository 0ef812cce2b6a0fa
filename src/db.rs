use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Open (or create) the registry database with WAL enabled.
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database at {}", path.display()))?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // ==========================================================================
    // Vehicles
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS vehicles (
            id INTEGER PRIMARY KEY,
            plate TEXT NOT NULL UNIQUE,
            make TEXT NOT NULL,
            model TEXT NOT NULL,
            year INTEGER,
            color TEXT
        )",
        [],
    )?;

    // ==========================================================================
    // Owners (individuals and organizations share one table; the kind
    // column says which of the name fields are meaningful)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS owners (
            id INTEGER PRIMARY KEY,
            kind TEXT NOT NULL CHECK (kind IN ('INDIVIDUAL', 'ORGANIZATION')),
            address TEXT,
            phone TEXT,
            email TEXT,
            surname TEXT,
            given_name TEXT,
            birth_date TEXT,
            legal_name TEXT,
            registration_number TEXT,
            legal_representative TEXT
        )",
        [],
    )?;

    // ==========================================================================
    // Ownership history (append-only; closing a period sets end_date)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS ownership_history (
            id INTEGER PRIMARY KEY,
            vehicle_id INTEGER NOT NULL REFERENCES vehicles(id),
            owner_id INTEGER NOT NULL REFERENCES owners(id),
            start_date TEXT NOT NULL,
            end_date TEXT,
            CONSTRAINT check_dates CHECK (end_date IS NULL OR end_date > start_date)
        )",
        [],
    )?;

    // ==========================================================================
    // Dossiers (flat records, unrelated to the vehicle tables)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS dossiers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            number TEXT NOT NULL,
            date TEXT NOT NULL,
            person TEXT NOT NULL,
            subject TEXT NOT NULL,
            reference TEXT,
            start_date TEXT,
            end_date TEXT,
            observation TEXT,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Events (audit trail)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_history_vehicle ON ownership_history(vehicle_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_history_owner ON ownership_history(owner_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_dossiers_created ON dossiers(created_at)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}

/// Insert the sample fixture if the vehicle table is empty.
///
/// Returns true when data was inserted. The fixture is the canonical demo
/// set: three vehicles, three owners, five ownership periods (vehicle 1
/// passed from Jean Dupont to ABC Corp in January 2023), and a handful of
/// dossiers.
pub fn seed_sample_data(conn: &Connection) -> Result<bool> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM vehicles", [], |row| row.get(0))?;
    if count > 0 {
        return Ok(false);
    }

    conn.execute_batch(
        "INSERT INTO vehicles (id, plate, make, model, year, color) VALUES
            (1, 'AB-123-CD', 'Renault', 'Clio', 2020, 'Blue'),
            (2, 'EF-456-GH', 'Peugeot', '308', 2018, 'Grey'),
            (3, 'IJ-789-KL', 'Volkswagen', 'Golf', 2022, 'Black');

         INSERT INTO owners (id, kind, surname, given_name, address, email)
            VALUES (101, 'INDIVIDUAL', 'Dupont', 'Jean', '12 Rue de la Paix, Paris', 'jean.dupont@example.com');
         INSERT INTO owners (id, kind, legal_name, registration_number, address)
            VALUES (102, 'ORGANIZATION', 'ABC Corp', '12345678901234', 'ZI Sud, Marseille');
         INSERT INTO owners (id, kind, surname, given_name, address)
            VALUES (103, 'INDIVIDUAL', 'Martin', 'Sophie', '25 Avenue des Champs, Lyon');

         INSERT INTO ownership_history (id, vehicle_id, owner_id, start_date, end_date) VALUES
            (1001, 1, 101, '2020-05-10', '2023-01-15'),
            (1002, 1, 102, '2023-01-16', NULL),
            (1003, 2, 101, '2019-03-20', '2024-06-01'),
            (1004, 2, 103, '2024-06-02', NULL),
            (1005, 3, 103, '2022-10-01', NULL);

         INSERT INTO dossiers (number, date, person, subject, reference, start_date, end_date, observation) VALUES
            ('D001', '2023-01-15', 'Jean Dupont', 'Information request', 'REF001', '2023-01-10', '2023-01-20', 'Processed.'),
            ('D002', '2023-02-20', 'Marie Curie', 'Product complaint', 'REF002', '2023-02-15', '2023-02-25', 'Awaiting reply.'),
            ('D003', '2023-03-10', 'Pierre Dubois', 'Order follow-up', NULL, '2023-03-05', '2023-03-15', 'Order shipped.'),
            ('D004', '2023-04-01', 'Sophie Martin', 'Quote request', 'REF003', '2023-03-28', '2023-04-05', 'Quote sent.'),
            ('D005', '2023-05-05', 'Jean Dupont', 'New project X', 'PROJX', '2023-05-01', '2023-05-30', 'Meeting planned.');",
    )?;

    Ok(true)
}

/// Audit trail entry. Every mutation outside the core read path (dossier
/// CRUD, archive runs) is recorded as one of these.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

pub fn events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY timestamp DESC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?
                    .with_timezone(&Utc),
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?,
                actor: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(events)
}
