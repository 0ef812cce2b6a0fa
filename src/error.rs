use thiserror::Error;

/// Error taxonomy for registry operations.
///
/// "Not found" is deliberately absent: an identifier resolving to zero rows
/// is an `Ok(None)` / empty collection, never an error.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Connection or query failure in the storage layer. Fatal to the
    /// current call; callers decide whether to surface or retry (we don't).
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A stored date that is not a valid `YYYY-MM-DD` value. Scoped to a
    /// single history row; list operations log and skip the row.
    #[error("malformed date {value:?} in ownership period {period_id}")]
    MalformedDate { period_id: i64, value: String },
}

/// Raw rusqlite errors never cross the store boundary.
impl From<rusqlite::Error> for RegistryError {
    fn from(err: rusqlite::Error) -> Self {
        RegistryError::StorageUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
