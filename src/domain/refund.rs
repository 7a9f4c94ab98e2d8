use {
    super::audit::NewAuditEntry,
    super::error::EngineError,
    super::money::MoneyAmount,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Completed,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for RefundStatus {
    type Error = EngineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "completed" => Ok(Self::Completed),
            other => Err(EngineError::Validation(format!(
                "unknown refund status: {other}"
            ))),
        }
    }
}

/// One money-return event. Append-only; never mutated after creation.
#[derive(Debug, Clone, Serialize)]
pub struct Refund {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub amount: MoneyAmount,
    pub reason: String,
    pub status: RefundStatus,
    pub created_at: DateTime<Utc>,
}

/// For INSERT — only written after the gateway has confirmed the refund.
#[derive(Debug, Clone)]
pub struct NewRefund {
    id: Uuid,
    payment_id: Uuid,
    amount: MoneyAmount,
    reason: String,
    status: RefundStatus,
}

impl NewRefund {
    pub fn new(payment_id: Uuid, amount: MoneyAmount, reason: String) -> Result<Self, EngineError> {
        if amount.is_zero() {
            return Err(EngineError::Validation(
                "refund amount must be positive".into(),
            ));
        }
        Ok(Self {
            id: Uuid::now_v7(),
            payment_id,
            amount,
            reason,
            status: RefundStatus::Completed,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn payment_id(&self) -> Uuid {
        self.payment_id
    }

    pub fn amount(&self) -> MoneyAmount {
        self.amount
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn status(&self) -> &RefundStatus {
        &self.status
    }

    pub fn audit_entry(&self, actor: &str) -> NewAuditEntry {
        NewAuditEntry {
            id: Uuid::now_v7(),
            entity_type: "refund".to_string(),
            entity_id: self.payment_id,
            action: "refunded".to_string(),
            actor: actor.to_string(),
            detail: serde_json::json!({
                "refund_id": self.id,
                "amount": self.amount.cents(),
                "reason": self.reason,
            }),
        }
    }
}
