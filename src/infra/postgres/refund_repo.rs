use {
    crate::domain::error::EngineError,
    crate::domain::ledger::RefundLedger,
    crate::domain::money::MoneyAmount,
    crate::domain::refund::{NewRefund, Refund, RefundStatus},
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    sqlx::PgPool,
    uuid::Uuid,
};

/// Postgres-backed refund ledger. Append-only; rows are never updated.
#[derive(Clone)]
pub struct PgRefundLedger {
    pool: PgPool,
}

impl PgRefundLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefundLedger for PgRefundLedger {
    async fn append(&self, refund: &NewRefund) -> Result<(), EngineError> {
        sqlx::query(
            "INSERT INTO refunds (id, payment_id, amount, reason, status) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(refund.id())
        .bind(refund.payment_id())
        .bind(refund.amount().cents())
        .bind(refund.reason())
        .bind(refund.status().as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn total_refunded(&self, payment_id: Uuid) -> Result<MoneyAmount, EngineError> {
        // SUM(bigint) comes back as NUMERIC; cast so it decodes as i64.
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(amount), 0)::BIGINT FROM refunds WHERE payment_id = $1",
        )
        .bind(payment_id)
        .fetch_one(&self.pool)
        .await?;

        MoneyAmount::new(total)
    }

    async fn list_for_payment(&self, payment_id: Uuid) -> Result<Vec<Refund>, EngineError> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid, i64, String, String, DateTime<Utc>)>(
            "SELECT id, payment_id, amount, reason, status, created_at \
             FROM refunds WHERE payment_id = $1 ORDER BY created_at",
        )
        .bind(payment_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, payment_id, amount, reason, status, created_at)| {
                Ok(Refund {
                    id,
                    payment_id,
                    amount: MoneyAmount::new(amount)?,
                    reason,
                    status: RefundStatus::try_from(status.as_str())?,
                    created_at,
                })
            })
            .collect()
    }
}
