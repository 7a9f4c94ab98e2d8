use {
    crate::domain::fulfillment::FulfillmentHandler,
    crate::domain::payment::{PaymentItem, PaymentItemType},
    std::collections::HashMap,
    std::sync::Arc,
    uuid::Uuid,
};

#[derive(Debug)]
pub enum DispatchOutcome {
    Fulfilled,
    /// No handler registered for the item type — logged, not fatal.
    Skipped,
    Failed(String),
}

/// Maps item types to fulfillment actions. New item types are added by
/// registering a handler, not by touching the orchestrator.
#[derive(Default, Clone)]
pub struct ItemDispatcher {
    handlers: HashMap<PaymentItemType, Arc<dyn FulfillmentHandler>>,
}

impl ItemDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        mut self,
        item_type: PaymentItemType,
        handler: Arc<dyn FulfillmentHandler>,
    ) -> Self {
        self.handlers.insert(item_type, handler);
        self
    }

    pub async fn dispatch(&self, user_id: Uuid, item: &PaymentItem) -> DispatchOutcome {
        let Some(handler) = self.handlers.get(&item.item_type) else {
            tracing::warn!(
                item_type = %item.item_type,
                item_id = item.item_id,
                "no fulfillment handler registered, skipping item"
            );
            return DispatchOutcome::Skipped;
        };

        match handler.fulfill(user_id, item.item_id).await {
            Ok(()) => DispatchOutcome::Fulfilled,
            Err(e) => DispatchOutcome::Failed(e.to_string()),
        }
    }
}
