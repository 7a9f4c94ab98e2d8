#![allow(dead_code)]

use async_trait::async_trait;
use payflow::domain::error::EngineError;
use payflow::domain::fulfillment::FulfillmentHandler;
use payflow::domain::gateway::{
    ChargeStatus, InitiateRequest, InitiateResponse, PaymentGateway,
};
use payflow::domain::id::GatewayRef;
use payflow::domain::identity::UserDirectory;
use payflow::domain::money::{Currency, Money, MoneyAmount};
use payflow::domain::payment::{PaymentItemType, PaymentStatus};
use payflow::infra::memory::{InMemoryAuditLog, InMemoryPaymentLedger, InMemoryRefundLedger};
use payflow::services::dispatcher::ItemDispatcher;
use payflow::services::orchestrator::{
    CheckoutItem, PaymentOrchestrator, StartPaymentRequest,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use tokio::sync::Mutex;
use uuid::Uuid;

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt().with_test_writer().init();
    });
}

pub fn money(cents: i64) -> Money {
    Money::new(MoneyAmount::new(cents).unwrap(), Currency::Usd)
}

pub fn amount(cents: i64) -> MoneyAmount {
    MoneyAmount::new(cents).unwrap()
}

// ── Mock gateway ───────────────────────────────────────────────────────────

/// Scriptable gateway: flip the failure switches, set the reported status,
/// and count the calls that actually reached the provider.
pub struct MockGateway {
    pub fail_initiate: std::sync::atomic::AtomicBool,
    pub fail_refund: std::sync::atomic::AtomicBool,
    pub reported_status: Mutex<ChargeStatus>,
    pub initiate_calls: AtomicUsize,
    pub refund_calls: AtomicUsize,
    counter: AtomicUsize,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self {
            fail_initiate: std::sync::atomic::AtomicBool::new(false),
            fail_refund: std::sync::atomic::AtomicBool::new(false),
            reported_status: Mutex::new(ChargeStatus::Pending),
            initiate_calls: AtomicUsize::new(0),
            refund_calls: AtomicUsize::new(0),
            counter: AtomicUsize::new(0),
        }
    }
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_initiate() -> Self {
        let gw = Self::default();
        gw.fail_initiate.store(true, Ordering::SeqCst);
        gw
    }

    pub async fn report(&self, status: ChargeStatus) {
        *self.reported_status.lock().await = status;
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    fn name(&self) -> &str {
        "mock"
    }

    async fn initiate(&self, _req: &InitiateRequest) -> Result<InitiateResponse, EngineError> {
        self.initiate_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_initiate.load(Ordering::SeqCst) {
            return Err(EngineError::Gateway("provider rejected charge".into()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(InitiateResponse {
            gateway_ref: GatewayRef::new(format!("gw_{n}")).unwrap(),
            redirect_url: format!("https://gateway.test/checkout/gw_{n}"),
        })
    }

    async fn check_status(&self, _gateway_ref: &GatewayRef) -> Result<ChargeStatus, EngineError> {
        Ok(*self.reported_status.lock().await)
    }

    async fn refund(
        &self,
        _gateway_ref: &GatewayRef,
        _amount: MoneyAmount,
    ) -> Result<(), EngineError> {
        self.refund_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_refund.load(Ordering::SeqCst) {
            return Err(EngineError::Gateway("provider rejected refund".into()));
        }
        Ok(())
    }
}

// ── Identity / fulfillment stubs ───────────────────────────────────────────

pub struct KnownUsers(pub Vec<Uuid>);

#[async_trait]
impl UserDirectory for KnownUsers {
    async fn user_exists(&self, user_id: Uuid) -> Result<bool, EngineError> {
        Ok(self.0.contains(&user_id))
    }
}

/// Records every fulfillment call; optionally fails them all.
#[derive(Default)]
pub struct RecordingHandler {
    pub calls: Mutex<Vec<(Uuid, i64)>>,
    pub fail: std::sync::atomic::AtomicBool,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let h = Self::default();
        h.fail.store(true, Ordering::SeqCst);
        h
    }
}

#[async_trait]
impl FulfillmentHandler for RecordingHandler {
    async fn fulfill(&self, user_id: Uuid, item_id: i64) -> Result<(), EngineError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EngineError::Gateway("enrollment service down".into()));
        }
        self.calls.lock().await.push((user_id, item_id));
        Ok(())
    }
}

// ── Engine fixture ─────────────────────────────────────────────────────────

pub struct Fixture {
    pub orchestrator: PaymentOrchestrator,
    pub payments: Arc<InMemoryPaymentLedger>,
    pub refunds: Arc<InMemoryRefundLedger>,
    pub gateway: Arc<MockGateway>,
    pub audit: Arc<InMemoryAuditLog>,
    pub user_id: Uuid,
}

pub fn fixture_with(gateway: MockGateway, dispatcher: ItemDispatcher) -> Fixture {
    init_tracing();
    let payments = Arc::new(InMemoryPaymentLedger::new());
    let refunds = Arc::new(InMemoryRefundLedger::new());
    let gateway = Arc::new(gateway);
    let audit = Arc::new(InMemoryAuditLog::new());
    let user_id = Uuid::now_v7();
    let users = Arc::new(KnownUsers(vec![user_id]));

    let orchestrator = PaymentOrchestrator::new(
        payments.clone(),
        refunds.clone(),
        gateway.clone(),
        users,
        audit.clone(),
        dispatcher,
    );

    Fixture {
        orchestrator,
        payments,
        refunds,
        gateway,
        audit,
        user_id,
    }
}

pub fn fixture() -> Fixture {
    fixture_with(MockGateway::new(), ItemDispatcher::new())
}

pub fn course_item(item_id: i64, cents: i64) -> CheckoutItem {
    CheckoutItem {
        item_type: PaymentItemType::Course,
        item_id,
        amount: amount(cents),
        display_name: format!("Course #{item_id}"),
    }
}

pub fn start_request(fx: &Fixture, cents: i64, items: Vec<CheckoutItem>) -> StartPaymentRequest {
    StartPaymentRequest {
        user_id: fx.user_id,
        user_email: "user@example.com".into(),
        user_name: "Test User".into(),
        money: money(cents),
        items,
        return_url: "https://app.test/return".into(),
        callback_url: "https://app.test/callback".into(),
        metadata: serde_json::json!({}),
    }
}

/// Drives a payment from checkout to Paid: start, report paid, verify.
pub async fn paid_payment(fx: &Fixture, cents: i64, items: Vec<CheckoutItem>) -> Uuid {
    let started = fx
        .orchestrator
        .start_payment(start_request(fx, cents, items))
        .await
        .expect("start_payment failed");
    fx.gateway.report(ChargeStatus::Paid).await;
    fx.orchestrator
        .verify_payment_status(&started.gateway_ref)
        .await
        .expect("verify failed");

    let payment = fx
        .orchestrator
        .payment_details(started.payment_id)
        .await
        .unwrap();
    assert_eq!(*payment.status(), PaymentStatus::Paid);
    started.payment_id
}
