use {super::error::EngineError, async_trait::async_trait, uuid::Uuid};

/// Grants the purchased benefit for one item type — e.g. enroll the user
/// in a program. Owned by the enrollment domain; the engine only calls it.
#[async_trait]
pub trait FulfillmentHandler: Send + Sync {
    async fn fulfill(&self, user_id: Uuid, item_id: i64) -> Result<(), EngineError>;
}
