//! Payment lifecycle and reconciliation engine.
//!
//! Creates payment intents, delegates charge/refund execution to an
//! external gateway behind the [`domain::gateway::PaymentGateway`] seam,
//! reconciles ledger state against gateway-reported truth, and triggers
//! one-time fulfillment once a payment is confirmed paid.

pub mod domain;
pub mod infra;
pub mod services;

pub use domain::error::{EngineError, ErrorKind};
pub use services::orchestrator::PaymentOrchestrator;
