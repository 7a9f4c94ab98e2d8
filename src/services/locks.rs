use {
    std::collections::HashMap,
    std::sync::Arc,
    tokio::sync::{Mutex, OwnedMutexGuard},
    uuid::Uuid,
};

/// Per-payment serialization for read-check-write sequences (refund,
/// status transitions, cancel). Two concurrent refunds that both read the
/// same remaining balance could otherwise both pass the balance check.
///
/// In-process equivalent of an advisory lock keyed by payment id.
#[derive(Default, Clone)]
pub struct PaymentLocks {
    cells: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl PaymentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for one payment. Holding the returned guard
    /// serializes every other `acquire` for the same id.
    pub async fn acquire(&self, payment_id: Uuid) -> OwnedMutexGuard<()> {
        let cell = {
            let mut cells = self.cells.lock().await;
            // Drop cells nobody is holding or waiting on.
            cells.retain(|_, c| Arc::strong_count(c) > 1);
            Arc::clone(cells.entry(payment_id).or_default())
        };
        cell.lock_owned().await
    }
}
