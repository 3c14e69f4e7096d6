use crate::application::locks::KeyedLocks;
use crate::domain::ports::{BatchStore, BatchStoreRef, Clock, ClockRef, ReceiptStore, ReceiptStoreRef};
use crate::domain::receipt::{GenerationOutcome, ReceiptTarget, TransferReceipt};
use crate::error::{PayoutError, Result};
use uuid::Uuid;

/// One record of the receipt generation feed.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub apply_no: String,
    pub outcome: GenerationOutcome,
    /// Raw provider response, stored on the receipt for audit.
    pub raw_response: Option<serde_json::Value>,
}

/// Manages the apply -> generate -> available/failed -> expired/downloaded
/// path, independently of the transfer lifecycle.
pub struct ReceiptManager {
    batches: BatchStoreRef,
    receipts: ReceiptStoreRef,
    clock: ClockRef,
    locks: KeyedLocks,
}

impl ReceiptManager {
    pub fn new(batches: BatchStoreRef, receipts: ReceiptStoreRef, clock: ClockRef) -> Self {
        Self {
            batches,
            receipts,
            clock,
            locks: KeyedLocks::new(),
        }
    }

    /// Creates a new Generating receipt with a fresh `apply_no`.
    ///
    /// Rejects applications whose referenced batch/detail does not exist and
    /// applications while another receipt for the same target/type pair is
    /// still Generating. The duplicate check and the insert run under a lock
    /// keyed on that pair.
    pub async fn apply_for_receipt(
        &self,
        target: ReceiptTarget,
        receipt_type: &str,
    ) -> Result<TransferReceipt> {
        self.validate_target(&target).await?;

        let lock_key = format!("{target}:{receipt_type}");
        let _guard = self.locks.acquire(&lock_key).await;

        if let Some(in_flight) = self.receipts.find_in_flight(&target, receipt_type).await? {
            return Err(PayoutError::ValidationError(format!(
                "receipt application {} for {target} is still generating",
                in_flight.apply_no
            )));
        }

        let receipt = TransferReceipt::new(
            Uuid::new_v4().to_string(),
            target,
            receipt_type,
            self.clock.now(),
        );
        self.receipts.store(receipt.clone()).await?;
        Ok(receipt)
    }

    /// Applies one generation-feed record: `Generating -> Available` or
    /// `Generating -> Failed`. Duplicate result delivery surfaces as
    /// `InvalidTransition`.
    pub async fn record_generation_result(
        &self,
        result: GenerationResult,
    ) -> Result<TransferReceipt> {
        let mut receipt = self
            .receipts
            .get(&result.apply_no)
            .await?
            .ok_or_else(|| PayoutError::NotFound(format!("receipt {}", result.apply_no)))?;

        receipt.record_outcome(result.outcome, self.clock.now())?;
        receipt.raw_response = result.raw_response;
        self.receipts.store(receipt.clone()).await?;
        Ok(receipt)
    }

    pub async fn mark_downloaded(&self, apply_no: &str) -> Result<TransferReceipt> {
        let mut receipt = self
            .receipts
            .get(apply_no)
            .await?
            .ok_or_else(|| PayoutError::NotFound(format!("receipt {apply_no}")))?;
        receipt.mark_downloaded()?;
        self.receipts.store(receipt.clone()).await?;
        Ok(receipt)
    }

    /// Expiry sweep for the scheduled collaborator: moves every receipt
    /// whose expiry has passed (per the injected clock) to Expired and
    /// returns their `apply_no`s.
    pub async fn expire_due(&self) -> Result<Vec<String>> {
        let now = self.clock.now();
        let mut expired = Vec::new();
        for mut receipt in self.receipts.get_all().await? {
            if receipt.expire(now)? {
                expired.push(receipt.apply_no.clone());
                self.receipts.store(receipt).await?;
            }
        }
        Ok(expired)
    }

    pub async fn get_receipt(&self, apply_no: &str) -> Result<Option<TransferReceipt>> {
        self.receipts.get(apply_no).await
    }

    async fn validate_target(&self, target: &ReceiptTarget) -> Result<()> {
        let batch = self
            .batches
            .get(target.out_batch_no())
            .await?
            .ok_or_else(|| {
                PayoutError::ValidationError(format!(
                    "receipt target {target} references an unknown batch"
                ))
            })?;
        if let ReceiptTarget::Detail { out_detail_no, .. } = target
            && batch.detail(out_detail_no).is_none()
        {
            return Err(PayoutError::ValidationError(format!(
                "receipt target {target} references an unknown detail"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::batch::{DetailSpec, TransferBatch};
    use crate::domain::receipt::FileMeta;
    use crate::domain::status::ReceiptStatus;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::in_memory::{InMemoryBatchStore, InMemoryReceiptStore};
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Arc;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn detail_target() -> ReceiptTarget {
        ReceiptTarget::Detail {
            out_batch_no: "B1".to_string(),
            out_detail_no: "D1".to_string(),
        }
    }

    fn available(expire: DateTime<Utc>) -> GenerationOutcome {
        GenerationOutcome::Available {
            download_url: "https://receipts.example/r1".to_string(),
            hash_value: "sha256:abc".to_string(),
            file_meta: FileMeta::default(),
            expire_time: expire,
        }
    }

    async fn manager(clock: Arc<FixedClock>) -> ReceiptManager {
        let batches: BatchStoreRef = Arc::new(InMemoryBatchStore::new());
        let batch = TransferBatch::create(
            "B1",
            "payroll",
            None,
            vec![DetailSpec {
                out_detail_no: "D1".to_string(),
                amount: 1000,
                recipient: "openid-1".to_string(),
                remark: None,
            }],
        )
        .unwrap();
        batches.store(batch).await.unwrap();
        ReceiptManager::new(batches, Arc::new(InMemoryReceiptStore::new()), clock)
    }

    #[tokio::test]
    async fn test_apply_creates_generating_receipt() {
        let manager = manager(Arc::new(FixedClock::new(t(0)))).await;
        let receipt = manager
            .apply_for_receipt(detail_target(), "TRANSFER_DETAIL")
            .await
            .unwrap();
        assert_eq!(receipt.status, ReceiptStatus::Generating);
        assert_eq!(receipt.applied_at, t(0));
        assert!(!receipt.apply_no.is_empty());
    }

    #[tokio::test]
    async fn test_apply_rejects_unknown_target() {
        let manager = manager(Arc::new(FixedClock::new(t(0)))).await;

        let unknown_batch = ReceiptTarget::Batch {
            out_batch_no: "B9".to_string(),
        };
        assert!(matches!(
            manager.apply_for_receipt(unknown_batch, "BATCH").await,
            Err(PayoutError::ValidationError(_))
        ));

        let unknown_detail = ReceiptTarget::Detail {
            out_batch_no: "B1".to_string(),
            out_detail_no: "D9".to_string(),
        };
        assert!(matches!(
            manager.apply_for_receipt(unknown_detail, "DETAIL").await,
            Err(PayoutError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_apply_rejects_in_flight_duplicate() {
        let manager = manager(Arc::new(FixedClock::new(t(0)))).await;
        manager
            .apply_for_receipt(detail_target(), "TRANSFER_DETAIL")
            .await
            .unwrap();

        assert!(matches!(
            manager
                .apply_for_receipt(detail_target(), "TRANSFER_DETAIL")
                .await,
            Err(PayoutError::ValidationError(_))
        ));

        // A different type for the same target is an independent application.
        assert!(
            manager
                .apply_for_receipt(detail_target(), "OTHER_TYPE")
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_reapply_allowed_after_failure() {
        let manager = manager(Arc::new(FixedClock::new(t(0)))).await;
        let first = manager
            .apply_for_receipt(detail_target(), "TRANSFER_DETAIL")
            .await
            .unwrap();
        let failed = manager
            .record_generation_result(GenerationResult {
                apply_no: first.apply_no.clone(),
                outcome: GenerationOutcome::Failed {
                    reason: "SYSTEM_ERROR".to_string(),
                },
                raw_response: None,
            })
            .await
            .unwrap();
        assert!(failed.needs_reapply());

        // A fresh application creates a new record, never resurrects.
        let second = manager
            .apply_for_receipt(detail_target(), "TRANSFER_DETAIL")
            .await
            .unwrap();
        assert_ne!(second.apply_no, first.apply_no);
        assert_eq!(second.status, ReceiptStatus::Generating);
    }

    #[tokio::test]
    async fn test_generation_result_and_audit_blob() {
        let manager = manager(Arc::new(FixedClock::new(t(5)))).await;
        let receipt = manager
            .apply_for_receipt(detail_target(), "TRANSFER_DETAIL")
            .await
            .unwrap();

        let raw = serde_json::json!({"signature_no": "SN123"});
        let updated = manager
            .record_generation_result(GenerationResult {
                apply_no: receipt.apply_no.clone(),
                outcome: available(t(100)),
                raw_response: Some(raw.clone()),
            })
            .await
            .unwrap();
        assert_eq!(updated.status, ReceiptStatus::Available);
        assert_eq!(updated.generated_at, Some(t(5)));
        assert_eq!(updated.raw_response, Some(raw));

        // Second delivery of the same result is rejected.
        assert!(matches!(
            manager
                .record_generation_result(GenerationResult {
                    apply_no: receipt.apply_no.clone(),
                    outcome: available(t(100)),
                    raw_response: None,
                })
                .await,
            Err(PayoutError::InvalidTransition { .. })
        ));

        assert!(matches!(
            manager
                .record_generation_result(GenerationResult {
                    apply_no: "missing".to_string(),
                    outcome: available(t(100)),
                    raw_response: None,
                })
                .await,
            Err(PayoutError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_download_and_expiry_sweep() {
        let clock = Arc::new(FixedClock::new(t(0)));
        let manager = manager(clock.clone()).await;
        let receipt = manager
            .apply_for_receipt(detail_target(), "TRANSFER_DETAIL")
            .await
            .unwrap();

        // Cannot download while generating.
        assert!(matches!(
            manager.mark_downloaded(&receipt.apply_no).await,
            Err(PayoutError::InvalidTransition { .. })
        ));

        manager
            .record_generation_result(GenerationResult {
                apply_no: receipt.apply_no.clone(),
                outcome: available(t(100)),
                raw_response: None,
            })
            .await
            .unwrap();
        manager.mark_downloaded(&receipt.apply_no).await.unwrap();

        // Nothing due yet.
        assert!(manager.expire_due().await.unwrap().is_empty());

        clock.set(t(100));
        let expired = manager.expire_due().await.unwrap();
        assert_eq!(expired, vec![receipt.apply_no.clone()]);

        let stored = manager.get_receipt(&receipt.apply_no).await.unwrap().unwrap();
        assert_eq!(stored.status, ReceiptStatus::Expired);
        assert!(stored.needs_reapply());

        // Sweep is idempotent.
        assert!(manager.expire_due().await.unwrap().is_empty());
    }
}
