//! Free-text search over vehicles and owners.
//!
//! A query is classified before anything is ranked: a string that equals an
//! existing plate (case-insensitively) is an unambiguous key, so it
//! short-circuits straight to that vehicle instead of going through the
//! broad multi-field match. Everything else fans out over vehicle
//! plate/make/model and owner name fields and comes back as one unified,
//! deterministically ordered list.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::entities::Owner;
use crate::error::Result;
use crate::store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Vehicle,
    Owner,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Vehicle => "Vehicle",
            EntityKind::Owner => "Owner",
        }
    }
}

/// One row of the unified result list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub kind: EntityKind,
    pub id: i64,
    pub label: String,
}

impl SearchHit {
    fn owner(owner: &Owner) -> Self {
        SearchHit {
            kind: EntityKind::Owner,
            id: owner.id,
            label: owner.display_label(),
        }
    }
}

/// Outcome of a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SearchOutcome {
    /// The query was an exact plate: one vehicle, no ranked list. The
    /// caller can open the detail view directly.
    Single(SearchHit),
    /// Broad multi-field results, vehicles before owners. Empty when
    /// nothing matched (or the query was blank).
    Matches(Vec<SearchHit>),
}

impl SearchOutcome {
    pub fn is_empty(&self) -> bool {
        match self {
            SearchOutcome::Single(_) => false,
            SearchOutcome::Matches(hits) => hits.is_empty(),
        }
    }
}

/// Run a search. The query is trimmed first; a blank query returns an empty
/// outcome without touching storage. One storage attempt per step, no
/// retries: a failing connection surfaces as `StorageUnavailable` and the
/// caller decides what to show.
pub fn search(conn: &Connection, query: &str) -> Result<SearchOutcome> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(SearchOutcome::Matches(Vec::new()));
    }

    // Step 1: exact plate short-circuit. The plate is unique, so a hit is
    // unambiguous and the broad match is skipped entirely.
    if let Some(vehicle) = store::find_vehicle_by_plate_exact(conn, query)? {
        return Ok(SearchOutcome::Single(SearchHit {
            kind: EntityKind::Vehicle,
            id: vehicle.id,
            label: vehicle.plate,
        }));
    }

    // Step 2: broad match across both entity kinds.
    let mut vehicle_hits: Vec<SearchHit> = store::find_vehicles_by_fields(conn, query)?
        .into_iter()
        .map(|v| SearchHit {
            kind: EntityKind::Vehicle,
            id: v.id,
            label: v.plate,
        })
        .collect();
    let mut owner_hits: Vec<SearchHit> = store::find_owners_by_fields(conn, query)?
        .iter()
        .map(SearchHit::owner)
        .collect();

    // Ordering is part of the contract: vehicles before owners, each group
    // ascending by case-folded label, entity id as the final tie-break so
    // the order is total. Sorted here rather than in SQL so the guarantee
    // does not depend on the database's collation.
    sort_hits(&mut vehicle_hits);
    sort_hits(&mut owner_hits);

    vehicle_hits.extend(owner_hits);
    Ok(SearchOutcome::Matches(vehicle_hits))
}

fn sort_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        a.label
            .to_lowercase()
            .cmp(&b.label.to_lowercase())
            .then(a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{seed_sample_data, setup_database};

    fn sample_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        seed_sample_data(&conn).unwrap();
        conn
    }

    #[test]
    fn test_blank_query_is_empty_without_storage() {
        // No tables at all: a blank query must not reach the database.
        let conn = Connection::open_in_memory().unwrap();
        let outcome = search(&conn, "   ").unwrap();
        assert_eq!(outcome, SearchOutcome::Matches(Vec::new()));
        assert!(outcome.is_empty());
    }

    #[test]
    fn test_exact_plate_short_circuits() {
        let conn = sample_conn();

        for query in ["AB-123-CD", "ab-123-cd", "  Ab-123-Cd  "] {
            match search(&conn, query).unwrap() {
                SearchOutcome::Single(hit) => {
                    assert_eq!(hit.kind, EntityKind::Vehicle);
                    assert_eq!(hit.id, 1);
                    // Canonical stored casing, not the query's
                    assert_eq!(hit.label, "AB-123-CD");
                }
                SearchOutcome::Matches(_) => {
                    panic!("full plate {query:?} must be a single match")
                }
            }
        }
    }

    #[test]
    fn test_partial_plate_goes_broad() {
        let conn = sample_conn();

        match search(&conn, "AB-123").unwrap() {
            SearchOutcome::Matches(hits) => {
                assert_eq!(hits.len(), 1);
                assert_eq!(hits[0].kind, EntityKind::Vehicle);
                assert_eq!(hits[0].id, 1);
            }
            SearchOutcome::Single(_) => panic!("partial plate is not an exact match"),
        }
    }

    #[test]
    fn test_owner_only_match() {
        let conn = sample_conn();

        // "dup" hits no plate/make/model, only the surname Dupont
        match search(&conn, "dup").unwrap() {
            SearchOutcome::Matches(hits) => {
                assert_eq!(hits.len(), 1);
                assert_eq!(hits[0].kind, EntityKind::Owner);
                assert_eq!(hits[0].id, 101);
                assert_eq!(hits[0].label, "Dupont Jean");
            }
            SearchOutcome::Single(_) => panic!("owner match cannot be a plate hit"),
        }
    }

    #[test]
    fn test_vehicles_before_owners_each_label_sorted() {
        let conn = sample_conn();

        // Broaden the fixture so one query spans both kinds with several
        // rows per kind.
        conn.execute_batch(
            "INSERT INTO vehicles (id, plate, make, model) VALUES
                (10, 'MA-001-RT', 'Martin-Cars', 'Vante'),
                (11, 'MA-002-RT', 'martin-cars', 'Avante');
             INSERT INTO owners (id, kind, legal_name) VALUES
                (201, 'ORGANIZATION', 'martinique logistics');",
        )
        .unwrap();

        let hits = match search(&conn, "mart").unwrap() {
            SearchOutcome::Matches(hits) => hits,
            SearchOutcome::Single(_) => panic!("broad query"),
        };

        let kinds: Vec<EntityKind> = hits.iter().map(|h| h.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EntityKind::Vehicle,
                EntityKind::Vehicle,
                EntityKind::Owner,
                EntityKind::Owner,
            ],
            "vehicles group strictly before owners"
        );

        // Vehicle labels ascending by case-folded plate
        assert_eq!(hits[0].label, "MA-001-RT");
        assert_eq!(hits[1].label, "MA-002-RT");
        // Owner labels ascending: "Martin Sophie" < "martinique logistics"
        assert_eq!(hits[2].id, 103);
        assert_eq!(hits[3].id, 201);
    }

    #[test]
    fn test_no_results_is_empty_matches() {
        let conn = sample_conn();
        let outcome = search(&conn, "xyzzy").unwrap();
        assert!(outcome.is_empty());
    }
}
