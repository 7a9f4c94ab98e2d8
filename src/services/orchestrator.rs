use {
    super::dispatcher::{DispatchOutcome, ItemDispatcher},
    super::locks::PaymentLocks,
    crate::domain::audit::AuditLog,
    crate::domain::error::EngineError,
    crate::domain::gateway::{ChargeStatus, InitiateRequest, PaymentGateway},
    crate::domain::id::GatewayRef,
    crate::domain::identity::UserDirectory,
    crate::domain::ledger::{PaymentLedger, RefundLedger},
    crate::domain::money::{Money, MoneyAmount},
    crate::domain::payment::{
        NewPayment, NewPaymentParams, Payment, PaymentItem, PaymentItemType, PaymentStatus,
    },
    crate::domain::refund::NewRefund,
    chrono::Utc,
    std::sync::Arc,
    uuid::Uuid,
};

const ACTOR: &str = "engine";

/// Merchant-side reference sent to the gateway at initiation.
/// Deterministic so a crashed checkout can be re-derived from the payment row.
pub fn merchant_reference(payment_id: Uuid) -> String {
    format!("pay-{payment_id}")
}

#[derive(Debug, Clone)]
pub struct CheckoutItem {
    pub item_type: PaymentItemType,
    pub item_id: i64,
    pub amount: MoneyAmount,
    /// Shown on the gateway's checkout page; not persisted.
    pub display_name: String,
}

#[derive(Debug, Clone)]
pub struct StartPaymentRequest {
    pub user_id: Uuid,
    pub user_email: String,
    pub user_name: String,
    pub money: Money,
    pub items: Vec<CheckoutItem>,
    pub return_url: String,
    pub callback_url: String,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct StartedPayment {
    pub payment_id: Uuid,
    pub gateway_ref: GatewayRef,
    pub redirect_url: String,
}

/// Direct-grant path: payment confirmed out-of-band, no gateway.
#[derive(Debug, Clone)]
pub struct CreatePaymentRequest {
    pub user_id: Uuid,
    pub money: Money,
    pub items: Vec<PaymentItem>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct RefundRequest {
    pub payment_id: Uuid,
    pub amount: MoneyAmount,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct RefundOutcome {
    pub refund_id: Uuid,
    pub remaining: MoneyAmount,
    pub payment_status: PaymentStatus,
}

/// What a reconciliation pass against the gateway concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Gateway agrees with the ledger — no write.
    Unchanged(PaymentStatus),
    /// Ledger advanced to match the gateway.
    Updated {
        from: PaymentStatus,
        to: PaymentStatus,
    },
    /// Gateway reported a state the ledger cannot move to — logged, no write.
    Anomaly {
        local: PaymentStatus,
        reported: PaymentStatus,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FulfillmentReport {
    pub fulfilled: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Core service: composes the ledgers, the gateway and the fulfillment
/// dispatcher into the payment lifecycle. Money-safety rule throughout:
/// the gateway is consulted before the ledger is written, and a gateway
/// failure leaves the ledger untouched.
pub struct PaymentOrchestrator {
    payments: Arc<dyn PaymentLedger>,
    refunds: Arc<dyn RefundLedger>,
    gateway: Arc<dyn PaymentGateway>,
    users: Arc<dyn UserDirectory>,
    audit: Arc<dyn AuditLog>,
    dispatcher: ItemDispatcher,
    locks: PaymentLocks,
}

impl PaymentOrchestrator {
    pub fn new(
        payments: Arc<dyn PaymentLedger>,
        refunds: Arc<dyn RefundLedger>,
        gateway: Arc<dyn PaymentGateway>,
        users: Arc<dyn UserDirectory>,
        audit: Arc<dyn AuditLog>,
        dispatcher: ItemDispatcher,
    ) -> Self {
        Self {
            payments,
            refunds,
            gateway,
            users,
            audit,
            dispatcher,
            locks: PaymentLocks::new(),
        }
    }

    /// Opens a checkout: persists a Pending payment, then asks the gateway
    /// to initiate the charge. The payment row is written first and is NOT
    /// rolled back on gateway failure — a "checkout started but gateway
    /// rejected" row is a valid diagnostic record, and
    /// `verify_payment_status` is the recovery path for everything after it.
    pub async fn start_payment(
        &self,
        req: StartPaymentRequest,
    ) -> Result<StartedPayment, EngineError> {
        if !self.users.user_exists(req.user_id).await? {
            return Err(EngineError::Validation(format!(
                "unknown user: {}",
                req.user_id
            )));
        }

        let items: Vec<PaymentItem> = req
            .items
            .iter()
            .map(|i| PaymentItem {
                item_type: i.item_type,
                item_id: i.item_id,
                amount: i.amount,
            })
            .collect();

        let payment = NewPayment::pending(NewPaymentParams {
            user_id: req.user_id,
            money: req.money,
            gateway: self.gateway.name().to_string(),
            metadata: req.metadata,
            items,
        })?;
        self.payments.insert(&payment).await?;
        self.audit.record(&payment.audit_entry(ACTOR, "created")).await?;

        let initiate = InitiateRequest {
            user_email: req.user_email,
            user_name: req.user_name,
            money: req.money,
            reference: merchant_reference(payment.id()),
            return_url: req.return_url,
            callback_url: req.callback_url,
            item_names: req.items.into_iter().map(|i| i.display_name).collect(),
        };

        let response = match self.gateway.initiate(&initiate).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(
                    payment_id = %payment.id(),
                    error = %e,
                    "gateway initiation failed, payment left pending without reference"
                );
                return Err(EngineError::Gateway(format!(
                    "initiation failed for payment {}: {e}",
                    payment.id()
                )));
            }
        };

        self.payments
            .attach_gateway_ref(payment.id(), &response.gateway_ref)
            .await?;

        Ok(StartedPayment {
            payment_id: payment.id(),
            gateway_ref: response.gateway_ref,
            redirect_url: response.redirect_url,
        })
    }

    /// Administrative path: record a payment already confirmed out-of-band.
    pub async fn create_paid_payment(
        &self,
        req: CreatePaymentRequest,
    ) -> Result<Uuid, EngineError> {
        if !self.users.user_exists(req.user_id).await? {
            return Err(EngineError::Validation(format!(
                "unknown user: {}",
                req.user_id
            )));
        }

        let payment = NewPayment::paid(NewPaymentParams {
            user_id: req.user_id,
            money: req.money,
            gateway: "manual".to_string(),
            metadata: req.metadata,
            items: req.items,
        })?;
        self.payments.insert(&payment).await?;
        self.audit.record(&payment.audit_entry(ACTOR, "created")).await?;

        Ok(payment.id())
    }

    /// Reconciliation: re-read gateway truth and fold it into the ledger.
    /// Idempotent — an unchanged gateway status produces no write. The
    /// recovery mechanism for crashes mid-checkout and lost callbacks.
    pub async fn verify_payment_status(
        &self,
        gateway_ref: &GatewayRef,
    ) -> Result<VerifyOutcome, EngineError> {
        let payment = self
            .payments
            .get_by_gateway_ref(gateway_ref)
            .await?
            .ok_or_else(|| {
                EngineError::NotFound(format!("no payment for gateway reference {gateway_ref}"))
            })?;

        let _guard = self.locks.acquire(payment.id()).await;
        // Re-read under the lock; a concurrent transition may have landed.
        let mut payment = self.load(payment.id(), false).await?;

        let reported = match self.gateway.check_status(gateway_ref).await? {
            ChargeStatus::Pending => PaymentStatus::Pending,
            ChargeStatus::Paid => PaymentStatus::Paid,
            ChargeStatus::Failed => PaymentStatus::Failed,
        };

        let local = *payment.status();
        if reported == local {
            return Ok(VerifyOutcome::Unchanged(local));
        }

        if !local.can_transition_to(&reported) {
            tracing::warn!(
                payment_id = %payment.id(),
                local = %local,
                reported = %reported,
                "gateway reported a status the ledger cannot move to"
            );
            return Ok(VerifyOutcome::Anomaly { local, reported });
        }

        payment.transition_status(reported)?;
        self.payments
            .update_status(payment.id(), reported, payment.paid_at())
            .await?;
        self.record_status_change(&payment, local, reported).await?;

        Ok(VerifyOutcome::Updated {
            from: local,
            to: reported,
        })
    }

    /// Fulfillment: hand every line item to its handler. Requires the money
    /// to be confirmed received. Per-item failures are logged and tallied,
    /// never aborting the rest — a bad line item is an internal error, not a
    /// reason to claw back a completed charge.
    pub async fn link_payment_to_items(
        &self,
        payment_id: Uuid,
    ) -> Result<FulfillmentReport, EngineError> {
        let payment = self.load(payment_id, true).await?;

        if *payment.status() != PaymentStatus::Paid {
            return Err(EngineError::Conflict(format!(
                "cannot fulfill payment {payment_id} in status {}",
                payment.status()
            )));
        }

        let mut report = FulfillmentReport::default();
        for item in payment.items() {
            match self.dispatcher.dispatch(payment.user_id(), item).await {
                DispatchOutcome::Fulfilled => report.fulfilled += 1,
                DispatchOutcome::Skipped => report.skipped += 1,
                DispatchOutcome::Failed(reason) => {
                    tracing::error!(
                        payment_id = %payment_id,
                        item_type = %item.item_type,
                        item_id = item.item_id,
                        %reason,
                        "fulfillment failed for item, continuing with the rest"
                    );
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Returns money against a Paid payment. Serialized per payment so two
    /// concurrent refunds cannot both spend the same remaining balance.
    pub async fn refund(&self, req: RefundRequest) -> Result<RefundOutcome, EngineError> {
        let _guard = self.locks.acquire(req.payment_id).await;

        let payment = self.load(req.payment_id, false).await?;

        // Refunded payments fall through to the balance check below and are
        // rejected there with remaining = 0; states where no money was ever
        // collected are a plain business-rule conflict.
        match payment.status() {
            PaymentStatus::Paid | PaymentStatus::Refunded => {}
            other => {
                return Err(EngineError::Conflict(format!(
                    "cannot refund payment {} in status {other}",
                    req.payment_id
                )));
            }
        }

        let refunded = self.refunds.total_refunded(req.payment_id).await?;
        let remaining = payment
            .money()
            .amount()
            .checked_sub(refunded)
            .unwrap_or(MoneyAmount::ZERO);

        if req.amount.is_zero() || req.amount > remaining {
            return Err(EngineError::Validation(format!(
                "refund amount {} out of range, remaining refundable: {remaining}",
                req.amount
            )));
        }

        let Some(gateway_ref) = payment.gateway_ref() else {
            return Err(EngineError::Conflict(format!(
                "payment {} has no gateway reference to refund through",
                req.payment_id
            )));
        };

        // Gateway first: on failure the ledger stays untouched. Once this
        // call is dispatched the refund is in flight, outcome unknown, so
        // it is never retried blindly.
        self.gateway.refund(gateway_ref, req.amount).await?;

        let refund = NewRefund::new(req.payment_id, req.amount, req.reason)?;
        self.refunds.append(&refund).await?;
        self.audit.record(&refund.audit_entry(ACTOR)).await?;

        let new_total = refunded.checked_add(req.amount).ok_or_else(|| {
            EngineError::Validation("refund total exceeds storage capacity".into())
        })?;
        let remaining = payment
            .money()
            .amount()
            .checked_sub(new_total)
            .unwrap_or(MoneyAmount::ZERO);

        let mut status = *payment.status();
        if new_total == payment.money().amount() {
            let mut payment = payment;
            payment.transition_status(PaymentStatus::Refunded)?;
            self.payments
                .update_status(req.payment_id, PaymentStatus::Refunded, None)
                .await?;
            self.record_status_change(&payment, PaymentStatus::Paid, PaymentStatus::Refunded)
                .await?;
            status = PaymentStatus::Refunded;
        }

        Ok(RefundOutcome {
            refund_id: refund.id(),
            remaining,
            payment_status: status,
        })
    }

    /// Abandons a checkout that never completed. Only Pending payments
    /// can be cancelled.
    pub async fn cancel_pending_payment(&self, payment_id: Uuid) -> Result<(), EngineError> {
        let _guard = self.locks.acquire(payment_id).await;

        let mut payment = self.load(payment_id, false).await?;

        if *payment.status() != PaymentStatus::Pending {
            return Err(EngineError::Conflict(format!(
                "cannot cancel payment {payment_id} in status {}",
                payment.status()
            )));
        }

        payment.transition_status(PaymentStatus::Cancelled)?;
        self.payments
            .update_status(payment_id, PaymentStatus::Cancelled, None)
            .await?;
        self.record_status_change(&payment, PaymentStatus::Pending, PaymentStatus::Cancelled)
            .await?;
        Ok(())
    }

    /// Access gate used by unrelated features.
    pub async fn has_user_paid_for(
        &self,
        user_id: Uuid,
        item_type: PaymentItemType,
        item_id: i64,
    ) -> Result<bool, EngineError> {
        self.payments.user_has_paid(user_id, item_type, item_id).await
    }

    /// Upstream duplicate-checkout guard.
    pub async fn has_pending_duplicate(
        &self,
        user_id: Uuid,
        item_type: PaymentItemType,
        item_id: i64,
    ) -> Result<bool, EngineError> {
        self.payments
            .has_pending_duplicate(user_id, item_type, item_id)
            .await
    }

    pub async fn payment_details(&self, payment_id: Uuid) -> Result<Payment, EngineError> {
        self.load(payment_id, true).await
    }

    pub async fn user_payments(&self, user_id: Uuid) -> Result<Vec<Payment>, EngineError> {
        self.payments.get_user_payments(user_id).await
    }

    pub async fn refunds_for_payment(
        &self,
        payment_id: Uuid,
    ) -> Result<Vec<crate::domain::refund::Refund>, EngineError> {
        self.refunds.list_for_payment(payment_id).await
    }

    async fn load(&self, payment_id: Uuid, include_items: bool) -> Result<Payment, EngineError> {
        self.payments
            .get_by_id(payment_id, include_items)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("payment {payment_id}")))
    }

    async fn record_status_change(
        &self,
        payment: &Payment,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<(), EngineError> {
        self.audit
            .record(&crate::domain::audit::NewAuditEntry {
                id: Uuid::now_v7(),
                entity_type: "payment".to_string(),
                entity_id: payment.id(),
                action: "status_changed".to_string(),
                actor: ACTOR.to_string(),
                detail: serde_json::json!({
                    "old_status": from.as_str(),
                    "new_status": to.as_str(),
                    "at": Utc::now(),
                }),
            })
            .await
    }
}
