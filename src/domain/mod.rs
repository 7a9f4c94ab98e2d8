pub mod audit;
pub mod error;
pub mod fulfillment;
pub mod gateway;
pub mod id;
pub mod identity;
pub mod ledger;
pub mod money;
pub mod payment;
pub mod refund;
