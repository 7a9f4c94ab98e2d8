use {super::error::EngineError, async_trait::async_trait, uuid::Uuid};

/// Identity-domain lookup the engine needs before taking money.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn user_exists(&self, user_id: Uuid) -> Result<bool, EngineError>;
}
