use {
    crate::domain::audit::{AuditLog, NewAuditEntry},
    crate::domain::error::EngineError,
    async_trait::async_trait,
    sqlx::PgPool,
};

/// Postgres-backed audit sink.
#[derive(Clone)]
pub struct PgAuditLog {
    pool: PgPool,
}

impl PgAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLog for PgAuditLog {
    async fn record(&self, entry: &NewAuditEntry) -> Result<(), EngineError> {
        sqlx::query(
            "INSERT INTO audit_log (id, entity_type, entity_id, action, actor, detail) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(entry.id)
        .bind(&entry.entity_type)
        .bind(entry.entity_id)
        .bind(&entry.action)
        .bind(&entry.actor)
        .bind(&entry.detail)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
