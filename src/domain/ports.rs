use super::batch::TransferBatch;
use super::receipt::{ReceiptTarget, TransferReceipt};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Persistence port for transfer batches and their owned details.
///
/// Batches are keyed by `out_batch_no`; provider-id lookups must be
/// supported for reconciling updates that only carry provider ids. A batch
/// is stored with its details as one aggregate, and deleting a batch must
/// also delete its receipts (cascade is the implementor's duty).
#[async_trait]
pub trait BatchStore: Send + Sync {
    async fn store(&self, batch: TransferBatch) -> Result<()>;
    async fn get(&self, out_batch_no: &str) -> Result<Option<TransferBatch>>;
    async fn get_by_provider_batch_id(&self, batch_id: &str) -> Result<Option<TransferBatch>>;
    async fn get_by_provider_detail_id(&self, detail_id: &str) -> Result<Option<TransferBatch>>;
    async fn get_all(&self) -> Result<Vec<TransferBatch>>;
}

/// Persistence port for electronic receipts, keyed by `apply_no`.
#[async_trait]
pub trait ReceiptStore: Send + Sync {
    async fn store(&self, receipt: TransferReceipt) -> Result<()>;
    async fn get(&self, apply_no: &str) -> Result<Option<TransferReceipt>>;
    /// The still-Generating receipt for a target/type pair, if any.
    async fn find_in_flight(
        &self,
        target: &ReceiptTarget,
        receipt_type: &str,
    ) -> Result<Option<TransferReceipt>>;
    async fn get_all(&self) -> Result<Vec<TransferReceipt>>;
}

/// Time source for expiry evaluation. Injected so expiry logic stays
/// testable; ambient system time is only read inside implementations.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type BatchStoreRef = Arc<dyn BatchStore>;
pub type ReceiptStoreRef = Arc<dyn ReceiptStore>;
pub type ClockRef = Arc<dyn Clock>;
