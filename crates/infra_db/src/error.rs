//! Database error types
//!
//! This module defines the error types that can occur during database
//! operations and their translation into the domain-facing [`PortError`].

use thiserror::Error;

use core_kernel::PortError;

/// Errors that can occur during database operations
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to establish a database connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Entity not found in database
    #[error("{entity} with id '{id}' not found")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// A stored value could not be mapped to a domain type
    #[error("Row mapping failed: {0}")]
    RowMapping(String),

    /// Migration error
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Generic SQL error
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Creates a not found error for a specific entity type and identifier
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        DatabaseError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// Classifies a raw SQLx error by its constraint class
    pub fn from_sqlx(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = error {
            if let Some(code) = db_err.code() {
                match code.as_ref() {
                    "23505" => return DatabaseError::DuplicateEntry(db_err.to_string()),
                    "23503" => return DatabaseError::ForeignKeyViolation(db_err.to_string()),
                    "23514" => return DatabaseError::ConstraintViolation(db_err.to_string()),
                    _ => {}
                }
            }
        }
        DatabaseError::SqlError(error)
    }
}

impl From<DatabaseError> for PortError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::NotFound { entity, id } => PortError::not_found(entity, id),
            DatabaseError::DuplicateEntry(msg) => PortError::conflict(msg),
            DatabaseError::ConnectionFailed(msg) => PortError::connection(msg),
            DatabaseError::RowMapping(msg) => PortError::transformation(msg),
            DatabaseError::SqlError(sqlx::Error::PoolTimedOut) => {
                PortError::connection("connection pool timed out")
            }
            DatabaseError::SqlError(sqlx::Error::Io(e)) => PortError::connection(e.to_string()),
            other => PortError::internal(other.to_string()),
        }
    }
}

/// Maps a raw SQLx error straight to the port error domain services see
pub(crate) fn port_err(error: sqlx::Error) -> PortError {
    DatabaseError::from_sqlx(error).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_port_not_found() {
        let err: PortError = DatabaseError::not_found("Wallet", "abc").into();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_row_mapping_becomes_transformation() {
        let err: PortError = DatabaseError::RowMapping("bad currency".into()).into();
        assert!(matches!(err, PortError::Transformation { .. }));
    }
}
