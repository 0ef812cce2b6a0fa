use serde::{Deserialize, Serialize};

/// Kind-specific owner fields.
///
/// An Individual never carries a legal name and an Organization never
/// carries a birth date; the enum makes that unrepresentable instead of
/// leaving it to a CHECK constraint on nullable columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OwnerKind {
    Individual {
        surname: String,
        given_name: String,
        /// ISO `YYYY-MM-DD`, parsed only at display time.
        birth_date: Option<String>,
    },
    Organization {
        legal_name: String,
        registration_number: Option<String>,
        legal_representative: Option<String>,
    },
}

impl OwnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerKind::Individual { .. } => "Individual",
            OwnerKind::Organization { .. } => "Organization",
        }
    }

    /// Storage discriminant, as persisted in the `kind` column.
    pub fn tag(&self) -> &'static str {
        match self {
            OwnerKind::Individual { .. } => "INDIVIDUAL",
            OwnerKind::Organization { .. } => "ORGANIZATION",
        }
    }
}

/// A vehicle owner, individual or organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    pub id: i64,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub kind: OwnerKind,
}

impl Owner {
    /// Display label: "Surname GivenName" for individuals, the legal name
    /// for organizations. Search matches the constituent fields, not this
    /// concatenation.
    pub fn display_label(&self) -> String {
        match &self.kind {
            OwnerKind::Individual {
                surname,
                given_name,
                ..
            } => format!("{} {}", surname, given_name),
            OwnerKind::Organization { legal_name, .. } => legal_name.clone(),
        }
    }

    pub fn is_organization(&self) -> bool {
        matches!(self.kind, OwnerKind::Organization { .. })
    }
}
