use provision_core::error::StoreError;

/// PostgreSQL SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Map a sqlx error onto the store contract's error taxonomy.
///
/// - Unique constraint violations become [`StoreError::UniqueViolation`]
///   carrying the constraint name, so the import engine can take its
///   refetch-and-compare path.
/// - `RowNotFound` becomes [`StoreError::NotFound`].
/// - Everything else is logged and reported as [`StoreError::Backend`].
pub fn classify_store_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::RowNotFound => StoreError::NotFound("Resource not found".to_string()),
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            StoreError::UniqueViolation {
                constraint: db_err.constraint().unwrap_or("unknown").to_string(),
            }
        }
        _ => {
            tracing::error!(error = %err, "Database error");
            StoreError::Backend(err.to_string())
        }
    }
}
