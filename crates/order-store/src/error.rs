use common::OrderId;
use domain::StoreError;
use thiserror::Error;

/// Errors raised inside the PostgreSQL repository.
#[derive(Debug, Error)]
pub enum PostgresError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// An update targeted an order that does not exist.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// The row was updated by someone else since it was read.
    #[error("Concurrency conflict for order {order_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        order_id: OrderId,
        expected: i64,
        actual: i64,
    },

    /// A stored value could not be mapped to the domain model.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl From<PostgresError> for StoreError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::NotFound(id) => StoreError::NotFound(id),
            PostgresError::ConcurrencyConflict {
                order_id,
                expected,
                actual,
            } => StoreError::ConcurrencyConflict {
                order_id,
                expected,
                actual,
            },
            PostgresError::Decode(message) => StoreError::Corrupt(message),
            other => StoreError::backend(other),
        }
    }
}

/// Result type for PostgreSQL repository internals.
pub type Result<T> = std::result::Result<T, PostgresError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_errors_surface_as_corrupt_records() {
        let err: StoreError = PostgresError::Decode("bad status 'X'".into()).into();
        assert!(matches!(err, StoreError::Corrupt(ref m) if m == "bad status 'X'"));
    }

    #[test]
    fn conflicts_keep_their_versions() {
        let err: StoreError = PostgresError::ConcurrencyConflict {
            order_id: OrderId::new(5),
            expected: 1,
            actual: 2,
        }
        .into();
        assert!(matches!(
            err,
            StoreError::ConcurrencyConflict { expected: 1, actual: 2, .. }
        ));
    }

    #[test]
    fn database_errors_surface_as_backend() {
        let err: StoreError = PostgresError::Database(sqlx::Error::RowNotFound).into();
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
