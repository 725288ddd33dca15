#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("no draft store at this location")]
    Missing,
    #[error("draft store is unreadable and was set aside")]
    Corrupt,
    #[error("drafts were written by a newer version (schema {found}, this build reads {supported})")]
    NewerSchema { found: u32, supported: u32 },
    #[error("draft store is in use by another process")]
    DatabaseAlreadyOpen,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("draft could not be encoded or decoded: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("draft store error: {0}")]
    Backend(Box<redb::Error>),
}

impl StorageError {
    /// Whether trying again later may succeed without user action.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::DatabaseAlreadyOpen | StorageError::Io(_))
    }
}

impl From<redb::DatabaseError> for StorageError {
    fn from(value: redb::DatabaseError) -> Self {
        match value {
            redb::DatabaseError::DatabaseAlreadyOpen => Self::DatabaseAlreadyOpen,
            other => Self::Backend(Box::new(other.into())),
        }
    }
}

// Every other redb failure only matters as a message.
macro_rules! backend_error {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for StorageError {
                fn from(value: $ty) -> Self {
                    Self::Backend(Box::new(value.into()))
                }
            }
        )*
    };
}

backend_error!(
    redb::Error,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);
