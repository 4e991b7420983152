use thiserror::Error;

/// Failures surfaced by the record operations.
#[derive(Debug, Error)]
pub enum RecordError {
    /// A unique column already holds the submitted value.
    #[error("duplicate entry: {table}.{column} already exists")]
    DuplicateKey { table: &'static str, column: String },

    #[error("no {table} record with id {id}")]
    NotFound { table: &'static str, id: i64 },

    /// Delete was requested without the confirmation acknowledgment.
    #[error("delete of {table} record {id} requires confirmation")]
    ConfirmationRequired { table: &'static str, id: i64 },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// A pending edit captured for one table was handed to another.
    #[error("pending edit belongs to {found}, not {expected}")]
    TableMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl RecordError {
    /// Stable error code reported over IPC.
    pub fn code(&self) -> &'static str {
        match self {
            RecordError::DuplicateKey { .. } => "duplicate_key",
            RecordError::NotFound { .. } => "not_found",
            RecordError::ConfirmationRequired { .. } => "confirmation_required",
            RecordError::InvalidValue { .. } => "bad_params",
            RecordError::TableMismatch { .. } => "bad_params",
            RecordError::Database(_) => "db_query_failed",
        }
    }

    /// Maps a failed write onto `DuplicateKey` when SQLite reports a unique violation.
    pub(crate) fn from_write(table: &'static str, e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, msg) = &e {
            if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
                // "UNIQUE constraint failed: students.roll_no"
                let column = msg
                    .as_deref()
                    .and_then(|m| m.rsplit_once('.'))
                    .map(|(_, c)| c.trim().to_string())
                    .unwrap_or_default();
                return RecordError::DuplicateKey { table, column };
            }
        }
        RecordError::Database(e)
    }
}

pub type Result<T> = std::result::Result<T, RecordError>;
