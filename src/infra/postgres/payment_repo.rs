use {
    crate::domain::error::EngineError,
    crate::domain::id::GatewayRef,
    crate::domain::ledger::PaymentLedger,
    crate::domain::money::{Currency, Money, MoneyAmount},
    crate::domain::payment::{
        NewPayment, Payment, PaymentItem, PaymentItemType, PaymentRecord, PaymentStatus,
    },
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    sqlx::PgPool,
    uuid::Uuid,
};

const PAYMENT_COLUMNS: &str = "id, user_id, amount, currency, status, gateway, gateway_ref, \
     metadata, created_at, paid_at";

type PaymentTuple = (
    Uuid,
    Uuid,
    i64,
    String,
    String,
    String,
    Option<String>,
    serde_json::Value,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

/// Postgres-backed payment ledger.
///
/// Queries use the runtime sqlx API so the crate builds without a live
/// database; `crate::infra::postgres::migrate` applies the schema.
#[derive(Clone)]
pub struct PgPaymentLedger {
    pool: PgPool,
}

impl PgPaymentLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_items(&self, payment_id: Uuid) -> Result<Vec<PaymentItem>, EngineError> {
        let rows = sqlx::query_as::<_, (String, i64, i64)>(
            "SELECT item_type, item_id, amount FROM payment_items WHERE payment_id = $1",
        )
        .bind(payment_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(item_type, item_id, amount)| {
                Ok(PaymentItem {
                    item_type: PaymentItemType::try_from(item_type.as_str())?,
                    item_id,
                    amount: MoneyAmount::new(amount)?,
                })
            })
            .collect()
    }

    async fn hydrate(
        &self,
        tuple: PaymentTuple,
        include_items: bool,
    ) -> Result<Payment, EngineError> {
        let (id, user_id, amount, currency, status, gateway, gateway_ref, metadata, created_at, paid_at) =
            tuple;

        let items = if include_items {
            self.load_items(id).await?
        } else {
            Vec::new()
        };

        Ok(Payment::from_record(PaymentRecord {
            id,
            user_id,
            money: Money::new(MoneyAmount::new(amount)?, Currency::try_from(currency.as_str())?),
            status: PaymentStatus::try_from(status.as_str())?,
            gateway,
            gateway_ref: gateway_ref.map(GatewayRef::new).transpose()?,
            metadata,
            items,
            created_at,
            paid_at,
        }))
    }
}

#[async_trait]
impl PaymentLedger for PgPaymentLedger {
    async fn insert(&self, payment: &NewPayment) -> Result<(), EngineError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO payments \
                 (id, user_id, amount, currency, status, gateway, metadata, paid_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(payment.id())
        .bind(payment.user_id())
        .bind(payment.money().amount().cents())
        .bind(payment.money().currency().as_str())
        .bind(payment.status().as_str())
        .bind(payment.gateway())
        .bind(payment.metadata())
        .bind(payment.paid_at())
        .execute(&mut *tx)
        .await?;

        for item in payment.items() {
            sqlx::query(
                "INSERT INTO payment_items (payment_id, item_type, item_id, amount) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(payment.id())
            .bind(item.item_type.as_str())
            .bind(item.item_id)
            .bind(item.amount.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_by_id(
        &self,
        id: Uuid,
        include_items: bool,
    ) -> Result<Option<Payment>, EngineError> {
        let row = sqlx::query_as::<_, PaymentTuple>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1 AND NOT is_deleted"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(tuple) => Ok(Some(self.hydrate(tuple, include_items).await?)),
            None => Ok(None),
        }
    }

    async fn get_by_gateway_ref(
        &self,
        gateway_ref: &GatewayRef,
    ) -> Result<Option<Payment>, EngineError> {
        let row = sqlx::query_as::<_, PaymentTuple>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE gateway_ref = $1 AND NOT is_deleted"
        ))
        .bind(gateway_ref.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(tuple) => Ok(Some(self.hydrate(tuple, true).await?)),
            None => Ok(None),
        }
    }

    async fn get_user_payments(&self, user_id: Uuid) -> Result<Vec<Payment>, EngineError> {
        let rows = sqlx::query_as::<_, PaymentTuple>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments \
             WHERE user_id = $1 AND NOT is_deleted ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut payments = Vec::with_capacity(rows.len());
        for tuple in rows {
            payments.push(self.hydrate(tuple, true).await?);
        }
        Ok(payments)
    }

    async fn user_has_paid(
        &self,
        user_id: Uuid,
        item_type: PaymentItemType,
        item_id: i64,
    ) -> Result<bool, EngineError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS( \
                 SELECT 1 FROM payments p \
                 JOIN payment_items i ON i.payment_id = p.id \
                 WHERE p.user_id = $1 AND p.status = 'paid' AND NOT p.is_deleted \
                   AND i.item_type = $2 AND i.item_id = $3)",
        )
        .bind(user_id)
        .bind(item_type.as_str())
        .bind(item_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn has_pending_duplicate(
        &self,
        user_id: Uuid,
        item_type: PaymentItemType,
        item_id: i64,
    ) -> Result<bool, EngineError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS( \
                 SELECT 1 FROM payments p \
                 JOIN payment_items i ON i.payment_id = p.id \
                 WHERE p.user_id = $1 AND p.status = 'pending' AND NOT p.is_deleted \
                   AND i.item_type = $2 AND i.item_id = $3)",
        )
        .bind(user_id)
        .bind(item_type.as_str())
        .bind(item_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn attach_gateway_ref(
        &self,
        id: Uuid,
        gateway_ref: &GatewayRef,
    ) -> Result<(), EngineError> {
        // Immutability guard in the WHERE clause; uniqueness is a DB index.
        let result = sqlx::query(
            "UPDATE payments SET gateway_ref = $1 \
             WHERE id = $2 AND gateway_ref IS NULL AND NOT is_deleted",
        )
        .bind(gateway_ref.as_str())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return EngineError::Conflict(format!(
                        "gateway reference {gateway_ref} already in use"
                    ));
                }
            }
            EngineError::Storage(e)
        })?;

        if result.rows_affected() == 0 {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM payments WHERE id = $1 AND NOT is_deleted)",
            )
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

            if exists {
                return Err(EngineError::Conflict(format!(
                    "payment {id} already has a gateway reference"
                )));
            }
            return Err(EngineError::NotFound(format!("payment {id}")));
        }
        Ok(())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<(), EngineError> {
        let result = sqlx::query(
            "UPDATE payments SET status = $1, paid_at = COALESCE($2, paid_at) \
             WHERE id = $3 AND NOT is_deleted",
        )
        .bind(status.as_str())
        .bind(paid_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(EngineError::NotFound(format!("payment {id}")));
        }
        Ok(())
    }

    async fn mark_deleted(&self, id: Uuid) -> Result<(), EngineError> {
        let result = sqlx::query("UPDATE payments SET is_deleted = true WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(EngineError::NotFound(format!("payment {id}")));
        }
        Ok(())
    }
}
