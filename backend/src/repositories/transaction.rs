//! Transaction helpers for multi-statement transitions.

use crate::error::AppError;
use sqlx::postgres::PgTransaction;
use sqlx::PgPool;

/// Begin a new database transaction.
///
/// Dropping the handle without [`commit_transaction`] rolls everything back.
pub async fn begin_transaction(db: &PgPool) -> Result<PgTransaction<'static>, AppError> {
    db.begin()
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))
}

/// Commit a transaction.
pub async fn commit_transaction(tx: PgTransaction<'_>) -> Result<(), AppError> {
    tx.commit()
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))
}
