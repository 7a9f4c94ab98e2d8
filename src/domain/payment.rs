use {
    super::audit::NewAuditEntry,
    super::error::EngineError,
    super::id::GatewayRef,
    super::money::{Money, MoneyAmount},
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Cancelled,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    /// Lifecycle edges. Failed, Cancelled and Refunded are terminal;
    /// there is no backward edge anywhere.
    pub fn can_transition_to(&self, next: &PaymentStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Paid)
                | (Self::Pending, Self::Cancelled)
                | (Self::Pending, Self::Failed)
                | (Self::Paid, Self::Refunded)
                | (Self::Paid, Self::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Cancelled | Self::Refunded)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = EngineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            other => Err(EngineError::Validation(format!(
                "unknown payment status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentItemType {
    Course,
    Program,
}

impl PaymentItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Course => "course",
            Self::Program => "program",
        }
    }
}

impl fmt::Display for PaymentItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for PaymentItemType {
    type Error = EngineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "course" => Ok(Self::Course),
            "program" => Ok(Self::Program),
            other => Err(EngineError::Validation(format!(
                "unknown payment item type: {other}"
            ))),
        }
    }
}

/// One purchasable unit inside a payment. Immutable once the payment exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentItem {
    pub item_type: PaymentItemType,
    pub item_id: i64,
    pub amount: MoneyAmount,
}

/// Full payment record as stored (for reads and ledger construction).
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub money: Money,
    pub status: PaymentStatus,
    pub gateway: String,
    pub gateway_ref: Option<GatewayRef>,
    pub metadata: serde_json::Value,
    pub items: Vec<PaymentItem>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// One attempt to collect money from a user. Status only moves through
/// `transition_status`, which enforces the lifecycle edges.
#[derive(Debug, Clone, Serialize)]
pub struct Payment {
    id: Uuid,
    user_id: Uuid,
    money: Money,
    status: PaymentStatus,
    gateway: String,
    gateway_ref: Option<GatewayRef>,
    metadata: serde_json::Value,
    items: Vec<PaymentItem>,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
}

impl Payment {
    pub fn from_record(rec: PaymentRecord) -> Self {
        Self {
            id: rec.id,
            user_id: rec.user_id,
            money: rec.money,
            status: rec.status,
            gateway: rec.gateway,
            gateway_ref: rec.gateway_ref,
            metadata: rec.metadata,
            items: rec.items,
            created_at: rec.created_at,
            paid_at: rec.paid_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn money(&self) -> &Money {
        &self.money
    }

    pub fn status(&self) -> &PaymentStatus {
        &self.status
    }

    pub fn gateway(&self) -> &str {
        &self.gateway
    }

    pub fn gateway_ref(&self) -> Option<&GatewayRef> {
        self.gateway_ref.as_ref()
    }

    pub fn metadata(&self) -> &serde_json::Value {
        &self.metadata
    }

    pub fn items(&self) -> &[PaymentItem] {
        &self.items
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn transition_status(&mut self, next: PaymentStatus) -> Result<(), EngineError> {
        if !self.status.can_transition_to(&next) {
            return Err(EngineError::Conflict(format!(
                "invalid status transition: {} -> {}",
                self.status, next
            )));
        }
        if next == PaymentStatus::Paid {
            self.paid_at = Some(Utc::now());
        }
        self.status = next;
        Ok(())
    }
}

/// For INSERT — id generated in Rust via Uuid::now_v7().
#[derive(Debug, Clone)]
pub struct NewPayment {
    id: Uuid,
    user_id: Uuid,
    money: Money,
    status: PaymentStatus,
    gateway: String,
    metadata: serde_json::Value,
    items: Vec<PaymentItem>,
    paid_at: Option<DateTime<Utc>>,
}

pub struct NewPaymentParams {
    pub user_id: Uuid,
    pub money: Money,
    pub gateway: String,
    pub metadata: serde_json::Value,
    pub items: Vec<PaymentItem>,
}

impl NewPayment {
    /// Checkout path: the payment starts Pending; the gateway reference
    /// arrives later, after initiation succeeds.
    pub fn pending(params: NewPaymentParams) -> Result<Self, EngineError> {
        Self::build(params, PaymentStatus::Pending, None)
    }

    /// Direct-grant path: payment confirmed out-of-band, no gateway involved.
    pub fn paid(params: NewPaymentParams) -> Result<Self, EngineError> {
        Self::build(params, PaymentStatus::Paid, Some(Utc::now()))
    }

    fn build(
        params: NewPaymentParams,
        status: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> Result<Self, EngineError> {
        if params.money.amount().is_zero() {
            return Err(EngineError::Validation(
                "payment amount must be positive".into(),
            ));
        }
        Ok(Self {
            id: Uuid::now_v7(),
            user_id: params.user_id,
            money: params.money,
            status,
            gateway: params.gateway,
            metadata: params.metadata,
            items: params.items,
            paid_at,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn money(&self) -> &Money {
        &self.money
    }

    pub fn status(&self) -> &PaymentStatus {
        &self.status
    }

    pub fn gateway(&self) -> &str {
        &self.gateway
    }

    pub fn metadata(&self) -> &serde_json::Value {
        &self.metadata
    }

    pub fn items(&self) -> &[PaymentItem] {
        &self.items
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn audit_entry(&self, actor: &str, action: &str) -> NewAuditEntry {
        NewAuditEntry {
            id: Uuid::now_v7(),
            entity_type: "payment".to_string(),
            entity_id: self.id,
            action: action.to_string(),
            actor: actor.to_string(),
            detail: serde_json::json!({
                "amount": self.money.amount().cents(),
                "currency": self.money.currency().as_str(),
                "status": self.status.as_str(),
                "gateway": self.gateway,
            }),
        }
    }
}
