//! Display formatting for resolved entities.
//!
//! Detail views are ordered (label, value) pair sequences; rendering them
//! is the presentation layer's job, deciding which dates and labels go in
//! is ours. Calendar dates display as `DD/MM/YYYY`; an open ownership
//! period ends at "present"; a vehicle with no recorded current owner
//! shows the literal "N/A".

use chrono::NaiveDate;
use tracing::warn;

use crate::entities::{Owner, OwnerKind, Vehicle};
use crate::resolver::{OwnershipRecord, VehicleTenure};

pub const NOT_AVAILABLE: &str = "N/A";
pub const PRESENT: &str = "present";

/// `DD/MM/YYYY`.
pub fn display_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn push_if_present(pairs: &mut Vec<(String, String)>, label: &str, value: &Option<String>) {
    if let Some(value) = value {
        if !value.is_empty() {
            pairs.push((label.to_string(), value.clone()));
        }
    }
}

/// Detail pairs for an owner. The Type pair always appears; every other
/// field is omitted entirely when empty rather than shown blank. The field
/// set depends on the kind, matched exhaustively.
pub fn owner_details(owner: &Owner) -> Vec<(String, String)> {
    let mut pairs = vec![("Type".to_string(), owner.kind.as_str().to_string())];

    push_if_present(&mut pairs, "Address", &owner.address);
    push_if_present(&mut pairs, "Phone", &owner.phone);
    push_if_present(&mut pairs, "Email", &owner.email);

    match &owner.kind {
        OwnerKind::Individual {
            surname,
            given_name,
            birth_date,
        } => {
            if !surname.is_empty() {
                pairs.push(("Surname".to_string(), surname.clone()));
            }
            if !given_name.is_empty() {
                pairs.push(("Given name".to_string(), given_name.clone()));
            }
            if let Some(raw) = birth_date {
                // Same row-scoped tolerance as history resolution: a birth
                // date that does not parse is logged and left out.
                match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                    Ok(date) => pairs.push(("Birth date".to_string(), display_date(date))),
                    Err(_) => {
                        warn!(owner_id = owner.id, value = %raw, "omitting unparseable birth date")
                    }
                }
            }
        }
        OwnerKind::Organization {
            legal_name,
            registration_number,
            legal_representative,
        } => {
            if !legal_name.is_empty() {
                pairs.push(("Legal name".to_string(), legal_name.clone()));
            }
            push_if_present(&mut pairs, "Registration number", registration_number);
            push_if_present(&mut pairs, "Legal representative", legal_representative);
        }
    }

    pairs
}

/// Detail pairs for a vehicle. Unlike owner fields these always appear,
/// with "N/A" standing in for anything unrecorded, current owner included.
pub fn vehicle_details(
    vehicle: &Vehicle,
    current: Option<&OwnershipRecord>,
) -> Vec<(String, String)> {
    vec![
        ("Plate".to_string(), vehicle.plate.clone()),
        ("Make".to_string(), vehicle.make.clone()),
        ("Model".to_string(), vehicle.model.clone()),
        (
            "Year".to_string(),
            vehicle
                .year
                .map(|y| y.to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        ),
        (
            "Color".to_string(),
            vehicle
                .color
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        ),
        (
            "Current owner".to_string(),
            current
                .map(|r| r.owner.display_label())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        ),
        (
            "Owner since".to_string(),
            current
                .map(|r| display_date(r.start))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        ),
    ]
}

/// One line of a vehicle's ownership history:
/// "Dupont Jean - from 10/05/2020 to 15/01/2023", with an
/// "(organization)" marker for legal entities and "present" for an open
/// period.
pub fn history_line(record: &OwnershipRecord) -> String {
    let marker = if record.owner.is_organization() {
        " (organization)"
    } else {
        ""
    };
    format!(
        "{}{} - from {} to {}",
        record.owner.display_label(),
        marker,
        display_date(record.start),
        record
            .end
            .map(display_date)
            .unwrap_or_else(|| PRESENT.to_string()),
    )
}

/// One line of an owner's vehicle list:
/// "AB-123-CD - Renault Clio (from 10/05/2020 to present)".
pub fn tenure_line(tenure: &VehicleTenure) -> String {
    format!(
        "{} - {} (from {} to {})",
        tenure.vehicle.plate,
        tenure.vehicle.description(),
        display_date(tenure.start),
        tenure
            .end
            .map(display_date)
            .unwrap_or_else(|| PRESENT.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn full_individual() -> Owner {
        Owner {
            id: 101,
            address: Some("12 Rue de la Paix, Paris".to_string()),
            phone: Some("+33 1 23 45 67 89".to_string()),
            email: Some("jean.dupont@example.com".to_string()),
            kind: OwnerKind::Individual {
                surname: "Dupont".to_string(),
                given_name: "Jean".to_string(),
                birth_date: Some("1980-03-25".to_string()),
            },
        }
    }

    #[test]
    fn test_individual_all_fields() {
        let pairs = owner_details(&full_individual());

        let labels: Vec<&str> = pairs.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Type",
                "Address",
                "Phone",
                "Email",
                "Surname",
                "Given name",
                "Birth date"
            ]
        );
        assert!(pairs.iter().all(|(_, v)| !v.is_empty()));
        assert_eq!(pairs[0].1, "Individual");
        assert_eq!(pairs.last().unwrap().1, "25/03/1980");
    }

    #[test]
    fn test_missing_email_is_omitted_not_blank() {
        let mut owner = full_individual();
        owner.email = None;

        let pairs = owner_details(&owner);
        assert!(pairs.iter().all(|(l, _)| l != "Email"));
    }

    #[test]
    fn test_unparseable_birth_date_is_omitted() {
        let mut owner = full_individual();
        owner.kind = OwnerKind::Individual {
            surname: "Dupont".to_string(),
            given_name: "Jean".to_string(),
            birth_date: Some("25/03/1980".to_string()),
        };

        let pairs = owner_details(&owner);
        assert!(pairs.iter().all(|(l, _)| l != "Birth date"));
        // And the rest of the detail view survives
        assert_eq!(pairs[0].0, "Type");
    }

    #[test]
    fn test_organization_field_set() {
        let owner = Owner {
            id: 102,
            address: Some("ZI Sud, Marseille".to_string()),
            phone: None,
            email: None,
            kind: OwnerKind::Organization {
                legal_name: "ABC Corp".to_string(),
                registration_number: Some("12345678901234".to_string()),
                legal_representative: None,
            },
        };

        let pairs = owner_details(&owner);
        let labels: Vec<&str> = pairs.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Type", "Address", "Legal name", "Registration number"]
        );
        assert_eq!(pairs[0].1, "Organization");
    }

    #[test]
    fn test_vehicle_details_with_current_owner() {
        let vehicle = Vehicle {
            id: 1,
            plate: "AB-123-CD".to_string(),
            make: "Renault".to_string(),
            model: "Clio".to_string(),
            year: Some(2020),
            color: Some("Blue".to_string()),
        };
        let record = OwnershipRecord {
            period_id: 1002,
            owner: Owner {
                id: 102,
                address: None,
                phone: None,
                email: None,
                kind: OwnerKind::Organization {
                    legal_name: "ABC Corp".to_string(),
                    registration_number: None,
                    legal_representative: None,
                },
            },
            start: date("2023-01-16"),
            end: None,
        };

        let pairs = vehicle_details(&vehicle, Some(&record));
        assert_eq!(pairs[0], ("Plate".to_string(), "AB-123-CD".to_string()));
        assert_eq!(pairs[5], ("Current owner".to_string(), "ABC Corp".to_string()));
        assert_eq!(pairs[6], ("Owner since".to_string(), "16/01/2023".to_string()));
    }

    #[test]
    fn test_vehicle_details_without_owner_uses_na() {
        let vehicle = Vehicle {
            id: 9,
            plate: "ZZ-000-ZZ".to_string(),
            make: "Fiat".to_string(),
            model: "Panda".to_string(),
            year: None,
            color: None,
        };

        let pairs = vehicle_details(&vehicle, None);
        assert_eq!(pairs[3].1, NOT_AVAILABLE); // Year
        assert_eq!(pairs[4].1, NOT_AVAILABLE); // Color
        assert_eq!(pairs[5].1, NOT_AVAILABLE); // Current owner
        assert_eq!(pairs[6].1, NOT_AVAILABLE); // Owner since
    }

    #[test]
    fn test_history_line_open_and_closed() {
        let open = OwnershipRecord {
            period_id: 1002,
            owner: Owner {
                id: 102,
                address: None,
                phone: None,
                email: None,
                kind: OwnerKind::Organization {
                    legal_name: "ABC Corp".to_string(),
                    registration_number: None,
                    legal_representative: None,
                },
            },
            start: date("2023-01-16"),
            end: None,
        };
        assert_eq!(
            history_line(&open),
            "ABC Corp (organization) - from 16/01/2023 to present"
        );

        let closed = OwnershipRecord {
            period_id: 1001,
            owner: Owner {
                id: 101,
                address: None,
                phone: None,
                email: None,
                kind: OwnerKind::Individual {
                    surname: "Dupont".to_string(),
                    given_name: "Jean".to_string(),
                    birth_date: None,
                },
            },
            start: date("2020-05-10"),
            end: Some(date("2023-01-15")),
        };
        assert_eq!(
            history_line(&closed),
            "Dupont Jean - from 10/05/2020 to 15/01/2023"
        );
    }

    #[test]
    fn test_tenure_line() {
        let tenure = VehicleTenure {
            period_id: 1003,
            vehicle: Vehicle {
                id: 2,
                plate: "EF-456-GH".to_string(),
                make: "Peugeot".to_string(),
                model: "308".to_string(),
                year: Some(2018),
                color: Some("Grey".to_string()),
            },
            start: date("2019-03-20"),
            end: None,
        };
        assert_eq!(
            tenure_line(&tenure),
            "EF-456-GH - Peugeot 308 (from 20/03/2019 to present)"
        );
    }
}
