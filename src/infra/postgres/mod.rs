pub mod audit_repo;
pub mod payment_repo;
pub mod refund_repo;

pub use audit_repo::PgAuditLog;
pub use payment_repo::PgPaymentLedger;
pub use refund_repo::PgRefundLedger;

use crate::domain::error::EngineError;

/// Apply the embedded schema migrations.
pub async fn migrate(pool: &sqlx::PgPool) -> Result<(), EngineError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| EngineError::Storage(sqlx::Error::Migrate(Box::new(e))))
}
