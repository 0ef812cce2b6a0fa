//! Flat dossier records: CRUD plus paginated listing and search.
//!
//! Unrelated to the vehicle tables; a dossier is a single self-contained
//! row. Listing is ordered by creation time, newest first, and search is a
//! plain LIKE over the text fields. Both are paginated, unlike entity
//! search, which returns everything in one pass.

use anyhow::Result;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{insert_event, Event};

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dossier {
    pub id: i64,
    pub number: String,
    pub date: String,
    pub person: String,
    pub subject: String,
    pub reference: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub observation: Option<String>,
    pub created_at: Option<String>,
}

fn dossier_from_row(row: &Row) -> rusqlite::Result<Dossier> {
    Ok(Dossier {
        id: row.get("id")?,
        number: row.get("number")?,
        date: row.get("date")?,
        person: row.get("person")?,
        subject: row.get("subject")?,
        reference: row.get("reference")?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        observation: row.get("observation")?,
        created_at: row.get("created_at")?,
    })
}

/// 1-based page window.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: usize,
    pub per_page: usize,
}

impl PageRequest {
    pub fn new(page: usize) -> Self {
        PageRequest {
            page: page.max(1),
            per_page: DEFAULT_PAGE_SIZE,
        }
    }

    fn offset(&self) -> usize {
        (self.page - 1) * self.per_page
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::new(1)
    }
}

/// One page of results plus the overall count, so callers can render
/// "Page 2/5 (47 dossiers)" without a second query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub items: Vec<Dossier>,
    pub total: i64,
    pub page: usize,
    pub per_page: usize,
}

impl Page {
    pub fn total_pages(&self) -> usize {
        let total = self.total.max(0) as usize;
        std::cmp::max(1, total.div_ceil(self.per_page))
    }
}

const DOSSIER_COLS: &str =
    "id, number, date, person, subject, reference, start_date, end_date, observation, created_at";

pub fn insert_dossier(conn: &Connection, dossier: &Dossier) -> Result<i64> {
    conn.execute(
        "INSERT INTO dossiers (
            number, date, person, subject, reference, start_date, end_date, observation
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            dossier.number,
            dossier.date,
            dossier.person,
            dossier.subject,
            dossier.reference,
            dossier.start_date,
            dossier.end_date,
            dossier.observation,
        ],
    )?;
    let id = conn.last_insert_rowid();

    let event = Event::new(
        "dossier_created",
        "dossier",
        &id.to_string(),
        serde_json::json!({ "number": dossier.number }),
        "dossier_module",
    );
    let _ = insert_event(conn, &event);

    Ok(id)
}

pub fn update_dossier(conn: &Connection, dossier: &Dossier) -> Result<()> {
    conn.execute(
        "UPDATE dossiers SET
            number = ?1, date = ?2, person = ?3, subject = ?4,
            reference = ?5, start_date = ?6, end_date = ?7, observation = ?8
         WHERE id = ?9",
        params![
            dossier.number,
            dossier.date,
            dossier.person,
            dossier.subject,
            dossier.reference,
            dossier.start_date,
            dossier.end_date,
            dossier.observation,
            dossier.id,
        ],
    )?;

    let event = Event::new(
        "dossier_updated",
        "dossier",
        &dossier.id.to_string(),
        serde_json::json!({ "number": dossier.number }),
        "dossier_module",
    );
    let _ = insert_event(conn, &event);

    Ok(())
}

pub fn delete_dossier(conn: &Connection, id: i64) -> Result<()> {
    conn.execute("DELETE FROM dossiers WHERE id = ?1", params![id])?;

    let event = Event::new(
        "dossier_deleted",
        "dossier",
        &id.to_string(),
        serde_json::json!({}),
        "dossier_module",
    );
    let _ = insert_event(conn, &event);

    Ok(())
}

pub fn get_dossier(conn: &Connection, id: i64) -> Result<Option<Dossier>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOSSIER_COLS} FROM dossiers WHERE id = ?1"
    ))?;
    let mut rows = stmt.query_map(params![id], dossier_from_row)?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// All dossiers, newest first, one page at a time.
pub fn list_dossiers(conn: &Connection, request: PageRequest) -> Result<Page> {
    let total: i64 = conn.query_row("SELECT COUNT(*) FROM dossiers", [], |row| row.get(0))?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {DOSSIER_COLS} FROM dossiers
         ORDER BY created_at DESC, id DESC
         LIMIT ?1 OFFSET ?2"
    ))?;
    let items = stmt
        .query_map(
            params![request.per_page as i64, request.offset() as i64],
            dossier_from_row,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Page {
        items,
        total,
        page: request.page,
        per_page: request.per_page,
    })
}

/// LIKE search over number, person, subject, reference, date and start
/// date, paginated. The total for the whole match set rides along on each
/// row via a window function, saving the second COUNT query.
pub fn search_dossiers(conn: &Connection, query: &str, request: PageRequest) -> Result<Page> {
    let query = query.trim();
    if query.is_empty() {
        return list_dossiers(conn, request);
    }

    let pattern = format!("%{}%", query);
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOSSIER_COLS}, COUNT(*) OVER () AS total
         FROM dossiers
         WHERE number LIKE ?1 OR person LIKE ?1 OR subject LIKE ?1
            OR reference LIKE ?1 OR date LIKE ?1 OR start_date LIKE ?1
         ORDER BY created_at DESC, id DESC
         LIMIT ?2 OFFSET ?3"
    ))?;

    let mut total = 0_i64;
    let items = stmt
        .query_map(
            params![pattern, request.per_page as i64, request.offset() as i64],
            |row| {
                let dossier = dossier_from_row(row)?;
                let row_total: i64 = row.get("total")?;
                Ok((dossier, row_total))
            },
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?
        .into_iter()
        .map(|(dossier, row_total)| {
            total = row_total;
            dossier
        })
        .collect();

    Ok(Page {
        items,
        total,
        page: request.page,
        per_page: request.per_page,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{events_for_entity, setup_database};

    fn empty_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn test_dossier(number: &str, person: &str) -> Dossier {
        Dossier {
            id: 0,
            number: number.to_string(),
            date: "2024-01-15".to_string(),
            person: person.to_string(),
            subject: "Test subject".to_string(),
            reference: None,
            start_date: Some("2024-01-10".to_string()),
            end_date: None,
            observation: None,
            created_at: None,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let conn = empty_conn();

        let id = insert_dossier(&conn, &test_dossier("D100", "Jean Dupont")).unwrap();
        let dossier = get_dossier(&conn, id).unwrap().expect("just inserted");
        assert_eq!(dossier.number, "D100");
        assert!(dossier.created_at.is_some());

        // Creation leaves an audit event behind
        let events = events_for_entity(&conn, "dossier", &id.to_string()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "dossier_created");
    }

    #[test]
    fn test_update_and_delete() {
        let conn = empty_conn();
        let id = insert_dossier(&conn, &test_dossier("D100", "Jean Dupont")).unwrap();

        let mut dossier = get_dossier(&conn, id).unwrap().unwrap();
        dossier.subject = "Amended subject".to_string();
        update_dossier(&conn, &dossier).unwrap();
        assert_eq!(
            get_dossier(&conn, id).unwrap().unwrap().subject,
            "Amended subject"
        );

        delete_dossier(&conn, id).unwrap();
        assert!(get_dossier(&conn, id).unwrap().is_none());
    }

    #[test]
    fn test_pagination_window_and_total() {
        let conn = empty_conn();
        for i in 1..=25 {
            insert_dossier(&conn, &test_dossier(&format!("D{i:03}"), "Someone")).unwrap();
        }

        let first = list_dossiers(&conn, PageRequest::new(1)).unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.total, 25);
        assert_eq!(first.total_pages(), 3);
        // Newest first: the last inserted row leads
        assert_eq!(first.items[0].number, "D025");

        let last = list_dossiers(&conn, PageRequest::new(3)).unwrap();
        assert_eq!(last.items.len(), 5);

        let beyond = list_dossiers(&conn, PageRequest::new(4)).unwrap();
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total, 25);
    }

    #[test]
    fn test_search_matches_fields_with_total() {
        let conn = empty_conn();
        for i in 1..=12 {
            insert_dossier(&conn, &test_dossier(&format!("D{i:03}"), "Jean Dupont")).unwrap();
        }
        insert_dossier(&conn, &test_dossier("X001", "Marie Curie")).unwrap();

        let page = search_dossiers(&conn, "Dupont", PageRequest::new(1)).unwrap();
        assert_eq!(page.items.len(), 10);
        assert_eq!(page.total, 12, "window-function total spans all pages");
        assert_eq!(page.total_pages(), 2);

        let page2 = search_dossiers(&conn, "Dupont", PageRequest::new(2)).unwrap();
        assert_eq!(page2.items.len(), 2);
        assert_eq!(page2.total, 12);

        let none = search_dossiers(&conn, "zzz", PageRequest::new(1)).unwrap();
        assert!(none.items.is_empty());
        assert_eq!(none.total, 0);
    }

    #[test]
    fn test_blank_search_falls_back_to_listing() {
        let conn = empty_conn();
        insert_dossier(&conn, &test_dossier("D001", "Jean Dupont")).unwrap();

        let page = search_dossiers(&conn, "   ", PageRequest::default()).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total, 1);
    }
}
