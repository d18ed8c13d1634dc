use diesel::result::Error as DieselError;

/// Error taxonomy for the sharded store.
///
/// Every write failure rolls back inside its own shard before surfacing
/// here; there are no automatic retries.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Connection pool error: {0}")]
    Pool(String),
}

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => Self::NotFound("row not found".to_string()),
            other => Self::Persistence(other.to_string()),
        }
    }
}
