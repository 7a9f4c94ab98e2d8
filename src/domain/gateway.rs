use {
    super::error::EngineError,
    super::id::GatewayRef,
    super::money::{Money, MoneyAmount},
    async_trait::async_trait,
};

/// What the orchestrator sends when opening a charge with the provider.
#[derive(Debug, Clone)]
pub struct InitiateRequest {
    pub user_email: String,
    pub user_name: String,
    pub money: Money,
    /// Merchant-side reference, derived deterministically from the payment id.
    pub reference: String,
    pub return_url: String,
    pub callback_url: String,
    pub item_names: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct InitiateResponse {
    pub gateway_ref: GatewayRef,
    pub redirect_url: String,
}

/// Charge state as the provider reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeStatus {
    Pending,
    Paid,
    Failed,
}

/// Contract to the external payment provider. Every call is blocking
/// network I/O to a third party: treat each one as fallible, and assume
/// nothing about delivery once a call has been dispatched.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Stable provider label stored on each payment.
    fn name(&self) -> &str;

    async fn initiate(&self, req: &InitiateRequest) -> Result<InitiateResponse, EngineError>;

    async fn check_status(&self, gateway_ref: &GatewayRef) -> Result<ChargeStatus, EngineError>;

    async fn refund(
        &self,
        gateway_ref: &GatewayRef,
        amount: MoneyAmount,
    ) -> Result<(), EngineError>;
}
