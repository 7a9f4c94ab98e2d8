use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::error::EngineError;

/// Reference the gateway assigns to a charge at initiation time.
/// Unique across all payments; immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GatewayRef(String);

impl GatewayRef {
    pub fn new(raw: impl Into<String>) -> Result<Self, EngineError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(EngineError::Validation(
                "gateway reference must not be empty".into(),
            ));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}
