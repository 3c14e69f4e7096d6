use crate::domain::batch::{DetailSpec, TransferBatch};
use crate::domain::ports::{BatchStore, BatchStoreRef};
use crate::error::{PayoutError, Result};

/// Everything needed to submit a new batch.
#[derive(Debug, Clone)]
pub struct CreateBatchRequest {
    pub out_batch_no: String,
    pub batch_name: String,
    pub remark: Option<String>,
    pub details: Vec<DetailSpec>,
}

/// Batch creation and closure on top of a [`crate::domain::ports::BatchStore`].
///
/// Creation-time invariants live in the aggregate constructor; this service
/// adds the store-level uniqueness check and persists the result.
pub struct BatchService {
    batches: BatchStoreRef,
}

impl BatchService {
    pub fn new(batches: BatchStoreRef) -> Self {
        Self { batches }
    }

    pub async fn create_batch(&self, request: CreateBatchRequest) -> Result<TransferBatch> {
        if self.batches.get(&request.out_batch_no).await?.is_some() {
            return Err(PayoutError::ValidationError(format!(
                "batch {} already exists",
                request.out_batch_no
            )));
        }
        let batch = TransferBatch::create(
            request.out_batch_no,
            request.batch_name,
            request.remark,
            request.details,
        )?;
        self.batches.store(batch.clone()).await?;
        Ok(batch)
    }

    pub async fn close_batch(&self, out_batch_no: &str) -> Result<TransferBatch> {
        let mut batch = self
            .batches
            .get(out_batch_no)
            .await?
            .ok_or_else(|| PayoutError::NotFound(format!("batch {out_batch_no}")))?;
        batch.close()?;
        self.batches.store(batch.clone()).await?;
        Ok(batch)
    }

    pub async fn get_batch(&self, out_batch_no: &str) -> Result<Option<TransferBatch>> {
        self.batches.get(out_batch_no).await
    }

    /// All batches, sorted by `out_batch_no` for deterministic reporting.
    pub async fn list_batches(&self) -> Result<Vec<TransferBatch>> {
        let mut batches = self.batches.get_all().await?;
        batches.sort_by(|a, b| a.out_batch_no.cmp(&b.out_batch_no));
        Ok(batches)
    }
}
