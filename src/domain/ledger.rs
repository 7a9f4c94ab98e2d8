use {
    super::error::EngineError,
    super::id::GatewayRef,
    super::money::MoneyAmount,
    super::payment::{NewPayment, Payment, PaymentItemType, PaymentStatus},
    super::refund::{NewRefund, Refund},
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    uuid::Uuid,
};

/// Durable store of payments and their items. Soft-deleted payments are
/// invisible to every method here. Each call commits durably on return.
#[async_trait]
pub trait PaymentLedger: Send + Sync {
    async fn insert(&self, payment: &NewPayment) -> Result<(), EngineError>;

    async fn get_by_id(&self, id: Uuid, include_items: bool)
    -> Result<Option<Payment>, EngineError>;

    async fn get_by_gateway_ref(
        &self,
        gateway_ref: &GatewayRef,
    ) -> Result<Option<Payment>, EngineError>;

    /// Newest first. A fresh query each call.
    async fn get_user_payments(&self, user_id: Uuid) -> Result<Vec<Payment>, EngineError>;

    /// True iff a non-deleted Paid payment contains a matching item.
    async fn user_has_paid(
        &self,
        user_id: Uuid,
        item_type: PaymentItemType,
        item_id: i64,
    ) -> Result<bool, EngineError>;

    /// True iff a non-deleted Pending payment contains a matching item.
    async fn has_pending_duplicate(
        &self,
        user_id: Uuid,
        item_type: PaymentItemType,
        item_id: i64,
    ) -> Result<bool, EngineError>;

    /// Attaches the gateway-assigned reference. Fails with `Conflict` if the
    /// payment already has one or the reference is already taken.
    async fn attach_gateway_ref(
        &self,
        id: Uuid,
        gateway_ref: &GatewayRef,
    ) -> Result<(), EngineError>;

    async fn update_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<(), EngineError>;

    /// Administrative soft-delete. Rows stay on disk but drop out of
    /// every query above.
    async fn mark_deleted(&self, id: Uuid) -> Result<(), EngineError>;
}

/// Append-only store of refunds.
#[async_trait]
pub trait RefundLedger: Send + Sync {
    async fn append(&self, refund: &NewRefund) -> Result<(), EngineError>;

    async fn total_refunded(&self, payment_id: Uuid) -> Result<MoneyAmount, EngineError>;

    async fn list_for_payment(&self, payment_id: Uuid) -> Result<Vec<Refund>, EngineError>;
}
