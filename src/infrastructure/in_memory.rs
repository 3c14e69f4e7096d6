use crate::domain::batch::TransferBatch;
use crate::domain::ports::{BatchStore, ReceiptStore};
use crate::domain::receipt::{ReceiptTarget, TransferReceipt};
use crate::domain::status::ReceiptStatus;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for transfer batches.
///
/// Uses `Arc<RwLock<HashMap>>` to allow shared concurrent access, with
/// secondary indexes from provider-assigned ids to `out_batch_no`. Ideal for
/// tests and replay runs where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryBatchStore {
    inner: Arc<RwLock<BatchMaps>>,
}

#[derive(Default)]
struct BatchMaps {
    batches: HashMap<String, TransferBatch>,
    by_batch_id: HashMap<String, String>,
    by_detail_id: HashMap<String, String>,
}

impl InMemoryBatchStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BatchStore for InMemoryBatchStore {
    async fn store(&self, batch: TransferBatch) -> Result<()> {
        let mut maps = self.inner.write().await;
        if let Some(id) = &batch.batch_id {
            maps.by_batch_id.insert(id.clone(), batch.out_batch_no.clone());
        }
        for detail in &batch.details {
            if let Some(id) = &detail.detail_id {
                maps.by_detail_id.insert(id.clone(), batch.out_batch_no.clone());
            }
        }
        maps.batches.insert(batch.out_batch_no.clone(), batch);
        Ok(())
    }

    async fn get(&self, out_batch_no: &str) -> Result<Option<TransferBatch>> {
        let maps = self.inner.read().await;
        Ok(maps.batches.get(out_batch_no).cloned())
    }

    async fn get_by_provider_batch_id(&self, batch_id: &str) -> Result<Option<TransferBatch>> {
        let maps = self.inner.read().await;
        Ok(maps
            .by_batch_id
            .get(batch_id)
            .and_then(|no| maps.batches.get(no))
            .cloned())
    }

    async fn get_by_provider_detail_id(&self, detail_id: &str) -> Result<Option<TransferBatch>> {
        let maps = self.inner.read().await;
        Ok(maps
            .by_detail_id
            .get(detail_id)
            .and_then(|no| maps.batches.get(no))
            .cloned())
    }

    async fn get_all(&self) -> Result<Vec<TransferBatch>> {
        let maps = self.inner.read().await;
        Ok(maps.batches.values().cloned().collect())
    }
}

/// A thread-safe in-memory store for receipts, keyed by `apply_no`.
#[derive(Default, Clone)]
pub struct InMemoryReceiptStore {
    receipts: Arc<RwLock<HashMap<String, TransferReceipt>>>,
}

impl InMemoryReceiptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReceiptStore for InMemoryReceiptStore {
    async fn store(&self, receipt: TransferReceipt) -> Result<()> {
        let mut receipts = self.receipts.write().await;
        receipts.insert(receipt.apply_no.clone(), receipt);
        Ok(())
    }

    async fn get(&self, apply_no: &str) -> Result<Option<TransferReceipt>> {
        let receipts = self.receipts.read().await;
        Ok(receipts.get(apply_no).cloned())
    }

    async fn find_in_flight(
        &self,
        target: &ReceiptTarget,
        receipt_type: &str,
    ) -> Result<Option<TransferReceipt>> {
        let receipts = self.receipts.read().await;
        Ok(receipts
            .values()
            .find(|r| {
                r.status == ReceiptStatus::Generating
                    && r.target == *target
                    && r.receipt_type == receipt_type
            })
            .cloned())
    }

    async fn get_all(&self) -> Result<Vec<TransferReceipt>> {
        let receipts = self.receipts.read().await;
        Ok(receipts.values().cloned().collect())
    }
}
