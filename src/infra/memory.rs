use {
    crate::domain::audit::{AuditLog, NewAuditEntry},
    crate::domain::error::EngineError,
    crate::domain::id::GatewayRef,
    crate::domain::ledger::{PaymentLedger, RefundLedger},
    crate::domain::money::MoneyAmount,
    crate::domain::payment::{NewPayment, Payment, PaymentItemType, PaymentRecord, PaymentStatus},
    crate::domain::refund::{NewRefund, Refund, RefundStatus},
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    std::collections::HashMap,
    std::sync::Arc,
    tokio::sync::RwLock,
    uuid::Uuid,
};

#[derive(Debug, Clone)]
struct PaymentRow {
    rec: PaymentRecord,
    deleted: bool,
}

/// In-memory payment ledger for tests and embedded use.
#[derive(Default, Clone)]
pub struct InMemoryPaymentLedger {
    rows: Arc<RwLock<HashMap<Uuid, PaymentRow>>>,
}

impl InMemoryPaymentLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

fn to_payment(row: &PaymentRow, include_items: bool) -> Payment {
    let mut rec = row.rec.clone();
    if !include_items {
        rec.items.clear();
    }
    Payment::from_record(rec)
}

fn contains_item(row: &PaymentRow, item_type: PaymentItemType, item_id: i64) -> bool {
    row.rec
        .items
        .iter()
        .any(|i| i.item_type == item_type && i.item_id == item_id)
}

#[async_trait]
impl PaymentLedger for InMemoryPaymentLedger {
    async fn insert(&self, payment: &NewPayment) -> Result<(), EngineError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&payment.id()) {
            return Err(EngineError::Conflict(format!(
                "payment {} already exists",
                payment.id()
            )));
        }
        rows.insert(
            payment.id(),
            PaymentRow {
                rec: PaymentRecord {
                    id: payment.id(),
                    user_id: payment.user_id(),
                    money: *payment.money(),
                    status: *payment.status(),
                    gateway: payment.gateway().to_string(),
                    gateway_ref: None,
                    metadata: payment.metadata().clone(),
                    items: payment.items().to_vec(),
                    created_at: Utc::now(),
                    paid_at: payment.paid_at(),
                },
                deleted: false,
            },
        );
        Ok(())
    }

    async fn get_by_id(
        &self,
        id: Uuid,
        include_items: bool,
    ) -> Result<Option<Payment>, EngineError> {
        let rows = self.rows.read().await;
        Ok(rows
            .get(&id)
            .filter(|r| !r.deleted)
            .map(|r| to_payment(r, include_items)))
    }

    async fn get_by_gateway_ref(
        &self,
        gateway_ref: &GatewayRef,
    ) -> Result<Option<Payment>, EngineError> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|r| !r.deleted)
            .find(|r| r.rec.gateway_ref.as_ref() == Some(gateway_ref))
            .map(|r| to_payment(r, true)))
    }

    async fn get_user_payments(&self, user_id: Uuid) -> Result<Vec<Payment>, EngineError> {
        let rows = self.rows.read().await;
        let mut found: Vec<&PaymentRow> = rows
            .values()
            .filter(|r| !r.deleted && r.rec.user_id == user_id)
            .collect();
        found.sort_by(|a, b| b.rec.created_at.cmp(&a.rec.created_at));
        Ok(found.into_iter().map(|r| to_payment(r, true)).collect())
    }

    async fn user_has_paid(
        &self,
        user_id: Uuid,
        item_type: PaymentItemType,
        item_id: i64,
    ) -> Result<bool, EngineError> {
        let rows = self.rows.read().await;
        Ok(rows.values().any(|r| {
            !r.deleted
                && r.rec.user_id == user_id
                && r.rec.status == PaymentStatus::Paid
                && contains_item(r, item_type, item_id)
        }))
    }

    async fn has_pending_duplicate(
        &self,
        user_id: Uuid,
        item_type: PaymentItemType,
        item_id: i64,
    ) -> Result<bool, EngineError> {
        let rows = self.rows.read().await;
        Ok(rows.values().any(|r| {
            !r.deleted
                && r.rec.user_id == user_id
                && r.rec.status == PaymentStatus::Pending
                && contains_item(r, item_type, item_id)
        }))
    }

    async fn attach_gateway_ref(
        &self,
        id: Uuid,
        gateway_ref: &GatewayRef,
    ) -> Result<(), EngineError> {
        let mut rows = self.rows.write().await;
        let taken = rows
            .values()
            .any(|r| r.rec.gateway_ref.as_ref() == Some(gateway_ref));
        if taken {
            return Err(EngineError::Conflict(format!(
                "gateway reference {gateway_ref} already in use"
            )));
        }
        let row = rows
            .get_mut(&id)
            .filter(|r| !r.deleted)
            .ok_or_else(|| EngineError::NotFound(format!("payment {id}")))?;
        if row.rec.gateway_ref.is_some() {
            return Err(EngineError::Conflict(format!(
                "payment {id} already has a gateway reference"
            )));
        }
        row.rec.gateway_ref = Some(gateway_ref.clone());
        Ok(())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<(), EngineError> {
        let mut rows = self.rows.write().await;
        let row = rows
            .get_mut(&id)
            .filter(|r| !r.deleted)
            .ok_or_else(|| EngineError::NotFound(format!("payment {id}")))?;
        row.rec.status = status;
        if paid_at.is_some() {
            row.rec.paid_at = paid_at;
        }
        Ok(())
    }

    async fn mark_deleted(&self, id: Uuid) -> Result<(), EngineError> {
        let mut rows = self.rows.write().await;
        let row = rows
            .get_mut(&id)
            .ok_or_else(|| EngineError::NotFound(format!("payment {id}")))?;
        row.deleted = true;
        Ok(())
    }
}

/// In-memory refund ledger. Append-only, like its durable counterpart.
#[derive(Default, Clone)]
pub struct InMemoryRefundLedger {
    rows: Arc<RwLock<Vec<Refund>>>,
}

impl InMemoryRefundLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefundLedger for InMemoryRefundLedger {
    async fn append(&self, refund: &NewRefund) -> Result<(), EngineError> {
        let mut rows = self.rows.write().await;
        rows.push(Refund {
            id: refund.id(),
            payment_id: refund.payment_id(),
            amount: refund.amount(),
            reason: refund.reason().to_string(),
            status: RefundStatus::Completed,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn total_refunded(&self, payment_id: Uuid) -> Result<MoneyAmount, EngineError> {
        let rows = self.rows.read().await;
        let mut total = MoneyAmount::ZERO;
        for r in rows.iter().filter(|r| r.payment_id == payment_id) {
            total = total.checked_add(r.amount).ok_or_else(|| {
                EngineError::Validation("refund total exceeds storage capacity".into())
            })?;
        }
        Ok(total)
    }

    async fn list_for_payment(&self, payment_id: Uuid) -> Result<Vec<Refund>, EngineError> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|r| r.payment_id == payment_id)
            .cloned()
            .collect())
    }
}

/// In-memory audit sink. Entries are inspectable for assertions.
#[derive(Default, Clone)]
pub struct InMemoryAuditLog {
    entries: Arc<RwLock<Vec<NewAuditEntry>>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries_for(&self, entity_id: Uuid) -> Vec<NewAuditEntry> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| e.entity_id == entity_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn record(&self, entry: &NewAuditEntry) -> Result<(), EngineError> {
        let mut entries = self.entries.write().await;
        entries.push(entry.clone());
        Ok(())
    }
}
